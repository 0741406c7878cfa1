//! Error types for target sessions and checker state.

use std::path::PathBuf;
use thiserror::Error;
use veighty_isa::IsaError;
use veighty_synth::SynthError;

/// Errors raised while talking to a target or keeping checker state.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {address} timed out after {timeout_ms}ms")]
    ConnectTimeout { address: String, timeout_ms: u64 },

    #[error("timed out waiting for {context}")]
    Timeout { context: String },

    #[error("connection closed while reading {context}")]
    Disconnected { context: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error(transparent)]
    Isa(#[from] IsaError),

    #[error("failed to access state file {path}: {source}")]
    State {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed state file {path}: {source}")]
    StateFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no unused key found after {attempts} attempts")]
    KeysExhausted { attempts: usize },
}

impl SessionError {
    /// The target could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            SessionError::Connect { .. } | SessionError::ConnectTimeout { .. }
        )
    }

    /// The target stopped answering during an exchange.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            SessionError::Timeout { .. } | SessionError::Disconnected { .. }
        )
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
