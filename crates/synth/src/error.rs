//! Error types for program synthesis and reference execution.

use std::path::PathBuf;
use thiserror::Error;
use veighty_isa::{IsaError, OpCode};

/// Errors raised while generating programs.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error(transparent)]
    Isa(#[from] IsaError),

    #[error("string value {0:?} contains a byte the VM cannot carry")]
    UnrepresentableString(String),

    #[error("operand precondition violated: {0}")]
    Precondition(String),

    #[error("no program below the transport cap after {attempts} attempts")]
    Oversized { attempts: u32 },

    #[error("word corpus is empty")]
    EmptyCorpus,

    #[error("failed to read word list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}

/// Result type for synthesis operations.
pub type SynthResult<T> = Result<T, SynthError>;

/// Errors raised by the reference simulator. Each one corresponds to a
/// state in which the VM asserts and stops.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("stack underflow executing {op} at {at}")]
    StackUnderflow { op: OpCode, at: usize },

    #[error("stack overflow executing {op} at {at}")]
    StackOverflow { op: OpCode, at: usize },

    #[error("{op} at {at} expected {expected} on top of the stack")]
    TypeMismatch {
        op: OpCode,
        at: usize,
        expected: &'static str,
    },

    #[error("division by zero at {at}")]
    DivisionByZero { at: usize },

    #[error("{op} at {at} left the 63-bit word domain")]
    WordOverflow { op: OpCode, at: usize },

    #[error("operand of {op} at {at} runs past the end of the program")]
    TruncatedOperand { op: OpCode, at: usize },

    #[error("{op} at {at} found no input")]
    InputExhausted { op: OpCode, at: usize },

    #[error("invalid file name {0:?}")]
    InvalidFileName(String),

    #[error("file {0:?} not found")]
    FileNotFound(String),

    #[error("refusing to write an empty file")]
    EmptyWrite,

    #[error("program of {len} bytes exceeds the cap of {cap}")]
    ProgramTooLarge { len: usize, cap: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
