//! Opcode identities of the veighty-machinery VM.
//!
//! An [`OpCode`] names an instruction and fixes its operand encoding. The byte
//! that represents it on the wire is not part of the identity: it comes from
//! the opcode definition shared with the VM and lives in
//! [`OpcodeTable`](crate::definition::OpcodeTable).

mod operand_encoding;

pub use operand_encoding::OperandEncoding;

use std::fmt;
use std::str::FromStr;

/// Instruction identities known to the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
    Nop,
    Push,
    Pop,
    Read,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Itostr,
    Jmp,
    Lt,
    Gt,
    Eq,
    Jnz,
    Jz,
    Inc,
    Dec,
    Shl,
    Shr,
    Cpy,
    Swap,
    Pushs,
    Pops,
    Reads,
    Strcat,
    Strlen,
    Strtoi,
    Strcmp,
    Instr,
    Writefile,
    Readfile,
    Halt,
}

impl OpCode {
    /// Number of known opcodes.
    pub const COUNT: usize = 33;

    /// Every known opcode.
    pub const ALL: [OpCode; OpCode::COUNT] = [
        OpCode::Nop,
        OpCode::Push,
        OpCode::Pop,
        OpCode::Read,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Mod,
        OpCode::Itostr,
        OpCode::Jmp,
        OpCode::Lt,
        OpCode::Gt,
        OpCode::Eq,
        OpCode::Jnz,
        OpCode::Jz,
        OpCode::Inc,
        OpCode::Dec,
        OpCode::Shl,
        OpCode::Shr,
        OpCode::Cpy,
        OpCode::Swap,
        OpCode::Pushs,
        OpCode::Pops,
        OpCode::Reads,
        OpCode::Strcat,
        OpCode::Strlen,
        OpCode::Strtoi,
        OpCode::Strcmp,
        OpCode::Instr,
        OpCode::Writefile,
        OpCode::Readfile,
        OpCode::Halt,
    ];

    /// Lowercase mnemonic as written in the opcode definition.
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Nop => "nop",
            OpCode::Push => "push",
            OpCode::Pop => "pop",
            OpCode::Read => "read",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Mod => "mod",
            OpCode::Itostr => "itostr",
            OpCode::Jmp => "jmp",
            OpCode::Lt => "lt",
            OpCode::Gt => "gt",
            OpCode::Eq => "eq",
            OpCode::Jnz => "jnz",
            OpCode::Jz => "jz",
            OpCode::Inc => "inc",
            OpCode::Dec => "dec",
            OpCode::Shl => "shl",
            OpCode::Shr => "shr",
            OpCode::Cpy => "cpy",
            OpCode::Swap => "swap",
            OpCode::Pushs => "pushs",
            OpCode::Pops => "pops",
            OpCode::Reads => "reads",
            OpCode::Strcat => "strcat",
            OpCode::Strlen => "strlen",
            OpCode::Strtoi => "strtoi",
            OpCode::Strcmp => "strcmp",
            OpCode::Instr => "instr",
            OpCode::Writefile => "writefile",
            OpCode::Readfile => "readfile",
            OpCode::Halt => "halt",
        }
    }

    /// Operand carried after the opcode byte.
    pub const fn operand(&self) -> OperandEncoding {
        match self {
            OpCode::Push => OperandEncoding::Int64,
            OpCode::Pushs => OperandEncoding::ShortBytes,
            OpCode::Jmp | OpCode::Jz | OpCode::Jnz => OperandEncoding::JumpTarget,
            _ => OperandEncoding::None,
        }
    }

    /// Whether the opcode may transfer control.
    pub const fn is_jump(&self) -> bool {
        matches!(self, OpCode::Jmp | OpCode::Jz | OpCode::Jnz)
    }

    /// Whether the opcode sets the comparison flag.
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            OpCode::Lt | OpCode::Gt | OpCode::Eq | OpCode::Strcmp | OpCode::Instr
        )
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic().to_uppercase())
    }
}

impl FromStr for OpCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        OpCode::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic() == lowered)
            .ok_or_else(|| format!("Unknown mnemonic: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_is_in_index_order() {
        for (position, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(op.index(), position);
        }
    }

    #[test]
    fn test_mnemonics_unique() {
        let names: HashSet<_> = OpCode::ALL.iter().map(|op| op.mnemonic()).collect();
        assert_eq!(names.len(), OpCode::COUNT);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("STRCAT".parse::<OpCode>(), Ok(OpCode::Strcat));
        assert_eq!(" jz ".parse::<OpCode>(), Ok(OpCode::Jz));
        assert!("pushd".parse::<OpCode>().is_err());
    }

    #[test]
    fn test_operands() {
        assert_eq!(OpCode::Push.operand(), OperandEncoding::Int64);
        assert_eq!(OpCode::Read.operand(), OperandEncoding::None);
        assert_eq!(OpCode::Pushs.operand(), OperandEncoding::ShortBytes);
        assert_eq!(OpCode::Jnz.operand(), OperandEncoding::JumpTarget);
        assert!(OpCode::Instr.is_comparison());
        assert!(!OpCode::Strlen.is_comparison());
    }
}
