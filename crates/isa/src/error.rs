use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the opcode table or encoding instructions.
#[derive(Error, Debug)]
pub enum IsaError {
    #[error("string operand of {len} bytes exceeds the {max} byte limit")]
    StringTooLong { len: usize, max: usize },

    #[error("integer {value:#x} is outside the {bits}-bit word domain")]
    IntegerOutOfDomain { value: u64, bits: u32 },

    #[error("jump target {target} does not fit in a 16-bit operand")]
    JumpTargetOutOfRange { target: usize },

    #[error("program of {len} bytes reaches the {cap} byte transport cap")]
    ProgramTooLarge { len: usize, cap: usize },

    #[error("opcode {opcode} takes {expected} operand, got {actual}")]
    OperandMismatch {
        opcode: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid interactive input: {0}")]
    InvalidInput(String),

    #[error("opcode definition contains no FOREACH_INSTRUCTION list")]
    MissingDefinition,

    #[error("opcode definition names unknown mnemonic '{0}'")]
    UnknownMnemonic(String),

    #[error("opcode definition names '{0}' more than once")]
    DuplicateMnemonic(String),

    #[error("opcode definition is missing mnemonics: {}", .0.join(", "))]
    MissingMnemonics(Vec<String>),

    #[error("opcode definition has {0} entries, more than a byte can address")]
    TooManyOpcodes(usize),

    #[error("failed to read opcode definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for ISA operations
pub type IsaResult<T> = Result<T, IsaError>;
