//! Instruction module for the veighty-machinery VM.
//!
//! An instruction is the unit the driver walks: its encoded bytes go into the
//! program blob, its interactive input is sent once execution reaches it, and
//! its expected output must appear on the response stream before anything
//! that follows it is checked.

use crate::op_code::OpCode;
use std::fmt;

/// What an instruction's bytes represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    /// A decodable opcode followed by its operand.
    Op(OpCode),
    /// Unreachable bytes that only occupy space for jump arithmetic.
    Filler,
}

/// One encoded instruction with its interaction expectations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    kind: InstructionKind,
    bytes: Vec<u8>,
    input: Option<Vec<u8>>,
    output: Option<Vec<u8>>,
}

impl Instruction {
    /// Creates an instruction from its opcode and fully encoded bytes
    /// (opcode byte included).
    pub(crate) fn encoded(op: OpCode, bytes: Vec<u8>) -> Self {
        Self {
            kind: InstructionKind::Op(op),
            bytes,
            input: None,
            output: None,
        }
    }

    /// Creates an unreachable filler region.
    pub fn filler(bytes: Vec<u8>) -> Self {
        Self {
            kind: InstructionKind::Filler,
            bytes,
            input: None,
            output: None,
        }
    }

    /// Attaches bytes sent to the VM when execution reaches this instruction.
    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Attaches the line the VM must print for this instruction, without
    /// the trailing newline.
    pub fn with_output(mut self, output: impl Into<Vec<u8>>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Drops interaction expectations, used when the instruction is embedded
    /// in a region that never executes.
    pub fn without_interaction(mut self) -> Self {
        self.input = None;
        self.output = None;
        self
    }

    pub fn kind(&self) -> InstructionKind {
        self.kind
    }

    /// Opcode of the instruction, `None` for filler.
    pub fn op(&self) -> Option<OpCode> {
        match self.kind {
            InstructionKind::Op(op) => Some(op),
            InstructionKind::Filler => None,
        }
    }

    /// Encoded bytes as they appear in the program.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Operand bytes following the opcode byte.
    pub fn payload(&self) -> &[u8] {
        match self.kind {
            InstructionKind::Op(_) => &self.bytes[1..],
            InstructionKind::Filler => &[],
        }
    }

    /// Contribution of this instruction to jump offsets.
    pub fn encoded_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn input(&self) -> Option<&[u8]> {
        self.input.as_deref()
    }

    pub fn expected_output(&self) -> Option<&[u8]> {
        self.output.as_deref()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            InstructionKind::Op(op) => {
                write!(f, "{}", op)?;
                if !self.payload().is_empty() {
                    write!(f, " {}", hex::encode(self.payload()))?;
                }
            }
            InstructionKind::Filler => write!(f, "FILLER[{}]", self.bytes.len())?,
        }
        if let Some(input) = &self.input {
            write!(f, " <- {:?}", String::from_utf8_lossy(input))?;
        }
        if let Some(output) = &self.output {
            write!(f, " -> {:?}", String::from_utf8_lossy(output))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filler() {
        let filler = Instruction::filler(b"abc".to_vec());
        assert_eq!(filler.op(), None);
        assert_eq!(filler.encoded_len(), 3);
        assert!(filler.payload().is_empty());
        assert_eq!(filler.to_string(), "FILLER[3]");
    }

    #[test]
    fn test_display_with_expectations() {
        let ins = Instruction::encoded(OpCode::Pop, vec![2]).with_output("0xc");
        assert_eq!(ins.to_string(), "POP -> \"0xc\"");
        let ins = Instruction::encoded(OpCode::Pushs, vec![22, 1, b'a']);
        assert_eq!(ins.to_string(), "PUSHS 0161");
    }

    #[test]
    fn test_without_interaction() {
        let ins = Instruction::encoded(OpCode::Read, vec![3])
            .with_input(vec![1; 8])
            .with_output("x")
            .without_interaction();
        assert_eq!(ins.input(), None);
        assert_eq!(ins.expected_output(), None);
    }
}
