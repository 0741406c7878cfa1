//! Generated instruction sequences.

use veighty_isa::{Instruction, Program};

/// A self-contained instruction sequence. Its expected outputs travel on the
/// instructions themselves, so splicing blocks preserves the output order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    instructions: Vec<Instruction>,
}

impl Block {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn append(&mut self, other: Block) {
        self.instructions.extend(other.instructions);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.instructions.iter().map(Instruction::encoded_len).sum()
    }

    pub fn encode(&self) -> Vec<u8> {
        self.instructions
            .iter()
            .flat_map(|ins| ins.bytes().iter().copied())
            .collect()
    }

    /// Declared output lines, newline excluded.
    pub fn expected_outputs(&self) -> impl Iterator<Item = &[u8]> {
        self.instructions.iter().filter_map(Instruction::expected_output)
    }
}

impl From<Vec<Instruction>> for Block {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

impl From<Block> for Program {
    fn from(block: Block) -> Self {
        Program::new(block.instructions)
    }
}
