//! Operand encoding information for VM opcodes.

use std::fmt;

/// Describes the bytes that follow an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandEncoding {
    /// The opcode stands alone.
    None,
    /// An 8-byte little-endian integer.
    Int64,
    /// A 1-byte length followed by that many bytes.
    ShortBytes,
    /// A 2-byte little-endian absolute byte offset into the program.
    JumpTarget,
}

impl OperandEncoding {
    /// Gets the fixed size of the operand, zero when the size is carried by
    /// a prefix or there is no operand.
    pub fn size(&self) -> usize {
        match self {
            OperandEncoding::None | OperandEncoding::ShortBytes => 0,
            OperandEncoding::Int64 => 8,
            OperandEncoding::JumpTarget => 2,
        }
    }

    /// Gets the size of the length prefix, zero for fixed-size operands.
    pub fn size_prefix(&self) -> usize {
        match self {
            OperandEncoding::ShortBytes => 1,
            _ => 0,
        }
    }

    /// Checks if the operand has a fixed size.
    pub fn has_fixed_size(&self) -> bool {
        self.size() > 0
    }

    /// Checks if the operand has a size prefix.
    pub fn has_size_prefix(&self) -> bool {
        self.size_prefix() > 0
    }

    /// Encoded payload length for an operand carrying `data_len` bytes of
    /// variable data. Fixed encodings ignore `data_len`.
    pub fn payload_len(&self, data_len: usize) -> usize {
        if self.has_size_prefix() {
            self.size_prefix() + data_len
        } else {
            self.size()
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            OperandEncoding::None => "no",
            OperandEncoding::Int64 => "an integer",
            OperandEncoding::ShortBytes => "a string",
            OperandEncoding::JumpTarget => "a jump target",
        }
    }
}

impl fmt::Display for OperandEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
