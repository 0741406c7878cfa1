//! Veighty Configuration Module
//!
//! This module provides the limits and configuration types shared by the
//! program synthesizer, the session driver and the command-line tool.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Maximum encoded program size accepted by the target (exclusive).
pub const TRANSPORT_CAP: usize = 4096;
/// Maximum number of instructions the target executes per program.
pub const MAX_EXECUTED_INSTRUCTIONS: usize = 4096;
/// Largest string operand a single push can carry.
pub const MAX_STRING_OPERAND: usize = 255;
/// Width of the integer word domain. The top bit of a 64-bit slot is
/// reserved by the target to tag string references.
pub const WORD_BITS: u32 = 63;
/// Largest integer value inside the word domain.
pub const MAX_WORD: u64 = (1u64 << WORD_BITS) - 1;

/// Default service port of the target.
pub const DEFAULT_PORT: u16 = 7777;
/// Default timeout for every read from the target.
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 5_000;
/// Default timeout for establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
/// Number of placed pairs remembered in the state file.
pub const SAVED_PAIRS_LIMIT: usize = 10;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// How the target turns a comparison result into the flag tested by
/// `jz`/`jnz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlagPolarity {
    /// The flag holds the comparison result: true is non-zero.
    #[default]
    Direct,
    /// The flag holds the negated comparison result: true is zero.
    Inverted,
}

impl FlagPolarity {
    /// Flag value stored after a comparison that evaluated to `holds`.
    pub fn flag_for(self, holds: bool) -> bool {
        match self {
            FlagPolarity::Direct => holds,
            FlagPolarity::Inverted => !holds,
        }
    }
}

impl fmt::Display for FlagPolarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagPolarity::Direct => write!(f, "direct"),
            FlagPolarity::Inverted => write!(f, "inverted"),
        }
    }
}

impl FromStr for FlagPolarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(FlagPolarity::Direct),
            "inverted" | "inverse" => Ok(FlagPolarity::Inverted),
            _ => Err(format!("Unknown flag polarity: {}", s)),
        }
    }
}

/// Target service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
        }
    }
}

impl TargetConfig {
    /// `host:port` string used to connect.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Instruction set configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IsaConfig {
    /// Opcode definition shared with the target. The bundled copy is used
    /// when unset.
    pub definition: Option<PathBuf>,
}

/// Program synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Seed for reproducible programs. Entropy is used when unset.
    pub seed: Option<u64>,
    pub compare_flag: FlagPolarity,
    /// How many times padding may nest generated blocks.
    pub padding_depth: u8,
    /// Chance, in percent, that padding is built from block encodings
    /// instead of filler letters.
    pub block_padding_percent: u8,
    /// Attempts before an oversized program is reported as an error.
    pub max_attempts: u32,
    pub min_splices: usize,
    pub max_splices: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: None,
            compare_flag: FlagPolarity::Direct,
            padding_depth: 1,
            block_padding_percent: 66,
            max_attempts: 16,
            min_splices: 1,
            max_splices: 20,
        }
    }
}

/// Word corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Newline separated word list. The bundled list is used when unset.
    pub word_list: Option<PathBuf>,
    pub min_word_len: usize,
    pub max_word_len: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            word_list: None,
            min_word_len: 6,
            max_word_len: 50,
        }
    }
}

/// Checker state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("veighty-state.json"),
        }
    }
}

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Main checker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub target: TargetConfig,
    pub isa: IsaConfig,
    pub synth: SynthConfig,
    pub corpus: CorpusConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
}

impl CheckerConfig {
    /// Loads a TOML configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Loads the file when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        let synth = &self.synth;
        if synth.min_splices > synth.max_splices {
            return Err(ConfigError::Invalid(format!(
                "synth.min_splices ({}) exceeds synth.max_splices ({})",
                synth.min_splices, synth.max_splices
            )));
        }
        if synth.block_padding_percent > 100 {
            return Err(ConfigError::Invalid(
                "synth.block_padding_percent must be at most 100".to_string(),
            ));
        }
        if synth.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "synth.max_attempts must be at least 1".to_string(),
            ));
        }
        let corpus = &self.corpus;
        if corpus.min_word_len == 0 || corpus.min_word_len > corpus.max_word_len {
            return Err(ConfigError::Invalid(format!(
                "corpus word length bounds {}..={} are empty",
                corpus.min_word_len, corpus.max_word_len
            )));
        }
        if corpus.max_word_len > MAX_STRING_OPERAND {
            return Err(ConfigError::Invalid(format!(
                "corpus.max_word_len exceeds the {} byte string operand limit",
                MAX_STRING_OPERAND
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_domain_constants() {
        assert_eq!(MAX_WORD, 0x7fff_ffff_ffff_ffff);
        assert_eq!(TRANSPORT_CAP, 4096);
    }

    #[test]
    fn test_flag_polarity() {
        assert!(FlagPolarity::Direct.flag_for(true));
        assert!(!FlagPolarity::Inverted.flag_for(true));
        assert_eq!("Inverted".parse::<FlagPolarity>(), Ok(FlagPolarity::Inverted));
        assert!("sideways".parse::<FlagPolarity>().is_err());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = CheckerConfig::from_toml("").unwrap();
        assert_eq!(config.target.port, DEFAULT_PORT);
        assert_eq!(config.synth.compare_flag, FlagPolarity::Direct);
        assert_eq!(config.corpus.min_word_len, 6);
    }

    #[test]
    fn test_partial_toml() {
        let config = CheckerConfig::from_toml(
            r#"
            [target]
            host = "10.66.1.2"

            [synth]
            seed = 42
            compare_flag = "inverted"
            "#,
        )
        .unwrap();
        assert_eq!(config.target.address(), "10.66.1.2:7777");
        assert_eq!(config.synth.seed, Some(42));
        assert_eq!(config.synth.compare_flag, FlagPolarity::Inverted);
        assert_eq!(config.synth.max_splices, 20);
    }

    #[test]
    fn test_invalid_splice_bounds() {
        let result = CheckerConfig::from_toml(
            r#"
            [synth]
            min_splices = 5
            max_splices = 2
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[target\nport = 1").unwrap();
        match CheckerConfig::load(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CheckerConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.state.path, PathBuf::from("veighty-state.json"));
    }

    #[test]
    fn test_config_serializes() {
        let json = serde_json::to_value(CheckerConfig::default()).unwrap();
        assert_eq!(json["synth"]["compare_flag"], "direct");
    }
}
