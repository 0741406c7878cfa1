//! Instruction builder module for the veighty-machinery VM.
//!
//! This module provides a way to construct encoded instructions against a
//! loaded opcode table.

use crate::definition::OpcodeTable;
use crate::encoding::{encode_int, encode_jump, encode_string};
use crate::error::{IsaError, IsaResult};
use crate::instruction::Instruction;
use crate::op_code::{OpCode, OperandEncoding};

/// Longest line the VM accepts for `reads`, newline excluded.
pub const MAX_LINE_INPUT: usize = 4094;

/// Helps construct encoded instructions.
#[derive(Debug, Clone, Copy)]
pub struct InstructionBuilder<'a> {
    table: &'a OpcodeTable,
}

impl<'a> InstructionBuilder<'a> {
    /// Creates a new builder over `table`.
    pub fn new(table: &'a OpcodeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'a OpcodeTable {
        self.table
    }

    /// Emits an opcode without operand.
    pub fn emit(&self, op: OpCode) -> IsaResult<Instruction> {
        self.expect_operand(op, OperandEncoding::None)?;
        Ok(Instruction::encoded(op, vec![self.table.byte(op)]))
    }

    /// Emits `push` with an immediate integer.
    pub fn emit_push_int(&self, value: u64) -> IsaResult<Instruction> {
        let mut bytes = vec![self.table.byte(OpCode::Push)];
        bytes.extend_from_slice(&encode_int(value)?);
        Ok(Instruction::encoded(OpCode::Push, bytes))
    }

    /// Emits `read` and attaches the 8 raw bytes the VM will consume.
    pub fn emit_read_int(&self, value: u64) -> IsaResult<Instruction> {
        let input = encode_int(value)?;
        Ok(self.emit(OpCode::Read)?.with_input(input.to_vec()))
    }

    /// Emits `pushs` with an immediate string.
    pub fn emit_push_string(&self, data: &[u8]) -> IsaResult<Instruction> {
        let mut bytes = vec![self.table.byte(OpCode::Pushs)];
        bytes.extend_from_slice(&encode_string(data)?);
        Ok(Instruction::encoded(OpCode::Pushs, bytes))
    }

    /// Emits `reads` and attaches the line the VM will consume.
    pub fn emit_read_string(&self, data: &[u8]) -> IsaResult<Instruction> {
        if data.is_empty() {
            return Err(IsaError::InvalidInput("line input must not be empty".into()));
        }
        if data.len() > MAX_LINE_INPUT {
            return Err(IsaError::InvalidInput(format!(
                "line input of {} bytes exceeds {}",
                data.len(),
                MAX_LINE_INPUT
            )));
        }
        if data.iter().any(|b| *b == b'\n' || *b == 0) {
            return Err(IsaError::InvalidInput(
                "line input must not contain newline or NUL bytes".into(),
            ));
        }
        let mut line = data.to_vec();
        line.push(b'\n');
        Ok(self.emit(OpCode::Reads)?.with_input(line))
    }

    /// Emits a jump to an absolute byte offset.
    pub fn emit_jump(&self, op: OpCode, target: usize) -> IsaResult<Instruction> {
        self.expect_operand(op, OperandEncoding::JumpTarget)?;
        let mut bytes = vec![self.table.byte(op)];
        bytes.extend_from_slice(&encode_jump(target)?);
        Ok(Instruction::encoded(op, bytes))
    }

    /// Encoded size of `op` carrying `data_len` bytes of variable data.
    pub fn encoded_len(op: OpCode, data_len: usize) -> usize {
        1 + op.operand().payload_len(data_len)
    }

    fn expect_operand(&self, op: OpCode, expected: OperandEncoding) -> IsaResult<()> {
        if op.operand() != expected {
            return Err(IsaError::OperandMismatch {
                opcode: op.mnemonic(),
                expected: op.operand().describe(),
                actual: expected.describe(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OpcodeTable {
        OpcodeTable::bundled().unwrap()
    }

    #[test]
    fn test_emit_plain() {
        let table = table();
        let builder = InstructionBuilder::new(&table);
        let ins = builder.emit(OpCode::Add).unwrap();
        assert_eq!(ins.bytes(), &[4]);
        assert_eq!(ins.op(), Some(OpCode::Add));
    }

    #[test]
    fn test_emit_rejects_operand_opcodes() {
        let table = table();
        let builder = InstructionBuilder::new(&table);
        assert!(matches!(
            builder.emit(OpCode::Push),
            Err(IsaError::OperandMismatch { opcode: "push", .. })
        ));
        assert!(builder.emit_jump(OpCode::Add, 3).is_err());
    }

    #[test]
    fn test_push_int() {
        let table = table();
        let builder = InstructionBuilder::new(&table);
        let ins = builder.emit_push_int(7).unwrap();
        assert_eq!(ins.bytes(), &[1, 7, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ins.encoded_len(), InstructionBuilder::encoded_len(OpCode::Push, 0));
    }

    #[test]
    fn test_read_int_carries_input() {
        let table = table();
        let builder = InstructionBuilder::new(&table);
        let ins = builder.emit_read_int(0x0102).unwrap();
        assert_eq!(ins.bytes(), &[3]);
        assert_eq!(ins.input(), Some(&[2, 1, 0, 0, 0, 0, 0, 0][..]));
    }

    #[test]
    fn test_strings() {
        let table = table();
        let builder = InstructionBuilder::new(&table);
        let push = builder.emit_push_string(b"cd").unwrap();
        assert_eq!(push.bytes(), &[22, 2, b'c', b'd']);
        assert_eq!(push.encoded_len(), InstructionBuilder::encoded_len(OpCode::Pushs, 2));

        let read = builder.emit_read_string(b"cd").unwrap();
        assert_eq!(read.bytes(), &[24]);
        assert_eq!(read.input(), Some(&b"cd\n"[..]));

        assert!(builder.emit_read_string(b"").is_err());
        assert!(builder.emit_read_string(b"a\nb").is_err());
        assert!(builder.emit_push_string(&[b'a'; 256]).is_err());
    }

    #[test]
    fn test_jump() {
        let table = table();
        let builder = InstructionBuilder::new(&table);
        let ins = builder.emit_jump(OpCode::Jz, 300).unwrap();
        assert_eq!(ins.bytes(), &[15, 0x2c, 0x01]);
        assert_eq!(ins.encoded_len(), 3);
    }
}
