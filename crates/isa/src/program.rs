//! Program module for the veighty-machinery VM.

use crate::error::{IsaError, IsaResult};
use crate::instruction::Instruction;
use std::fmt;
use veighty_config::TRANSPORT_CAP;

/// An ordered instruction sequence ready to be transmitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Wraps an instruction sequence without checking the transport cap.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Wraps an instruction sequence, refusing programs the target would
    /// reject.
    pub fn checked(instructions: Vec<Instruction>) -> IsaResult<Self> {
        let program = Self::new(instructions);
        program.ensure_within_cap()?;
        Ok(program)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.instructions.iter().map(Instruction::encoded_len).sum()
    }

    /// Fails when the program reaches the transport cap.
    pub fn ensure_within_cap(&self) -> IsaResult<()> {
        let len = self.encoded_len();
        if len >= TRANSPORT_CAP || self.len() >= TRANSPORT_CAP {
            return Err(IsaError::ProgramTooLarge {
                len,
                cap: TRANSPORT_CAP,
            });
        }
        Ok(())
    }

    /// Concatenated instruction bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        for instruction in &self.instructions {
            bytes.extend_from_slice(instruction.bytes());
        }
        bytes
    }

    /// Length line sent ahead of the payload.
    pub fn wire_header(&self) -> Vec<u8> {
        format!("{}\n", self.encoded_len()).into_bytes()
    }

    /// Length line followed by the payload.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = self.wire_header();
        wire.extend_from_slice(&self.encode());
        wire
    }

    /// Expected output lines in program order, newline excluded.
    pub fn expected_outputs(&self) -> impl Iterator<Item = &[u8]> {
        self.instructions
            .iter()
            .filter_map(Instruction::expected_output)
    }

    /// Byte stream a conforming VM prints, newlines included.
    pub fn expected_stream(&self) -> Vec<u8> {
        let mut stream = Vec::new();
        for line in self.expected_outputs() {
            stream.extend_from_slice(line);
            stream.push(b'\n');
        }
        stream
    }

    /// All interactive input in the order it is sent.
    pub fn input_stream(&self) -> Vec<u8> {
        let mut stream = Vec::new();
        for input in self.instructions.iter().filter_map(Instruction::input) {
            stream.extend_from_slice(input);
        }
        stream
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut offset = 0;
        for instruction in &self.instructions {
            writeln!(f, "{:04}: {}", offset, instruction)?;
            offset += instruction.encoded_len();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_program() {
        let program = Program::default();
        assert!(program.is_empty());
        assert_eq!(program.encoded_len(), 0);
        assert_eq!(program.to_wire(), b"0\n".to_vec());
    }

    #[test]
    fn test_cap_is_exclusive() {
        let below = Program::new(vec![Instruction::filler(vec![b'a'; TRANSPORT_CAP - 1])]);
        assert!(below.ensure_within_cap().is_ok());
        let at = Program::new(vec![Instruction::filler(vec![b'a'; TRANSPORT_CAP])]);
        assert!(matches!(
            at.ensure_within_cap(),
            Err(IsaError::ProgramTooLarge { len: 4096, cap: 4096 })
        ));
        assert!(Program::checked(at.into_instructions()).is_err());
    }

    #[test]
    fn test_streams() {
        let program = Program::new(vec![
            Instruction::filler(vec![1]).with_input(vec![9, 9]),
            Instruction::filler(vec![2]).with_output("0x1"),
            Instruction::filler(vec![3]),
            Instruction::filler(vec![4]).with_output("abc"),
        ]);
        assert_eq!(program.encode(), vec![1, 2, 3, 4]);
        assert_eq!(program.expected_stream(), b"0x1\nabc\n".to_vec());
        assert_eq!(program.input_stream(), vec![9, 9]);
        assert_eq!(program.to_wire(), b"4\n\x01\x02\x03\x04".to_vec());
    }
}
