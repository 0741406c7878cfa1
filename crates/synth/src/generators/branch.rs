//! Branch-block generators.
//!
//! A branch block ends in a jump whose absolute target depends on where the
//! block starts, so these generators take the cumulative byte length of the
//! program so far. Conditional branches fold their comparison at generation
//! time: the operands are concrete, so whether the jump is taken is known
//! before anything is sent.

use super::basic::random_basic;
use super::operands::{push_int, push_string};
use crate::block::Block;
use crate::context::GenContext;
use crate::error::{SynthError, SynthResult};
use crate::padding::pad;
use crate::simulator::contains;
use veighty_isa::{Instruction, InstructionBuilder, OpCode};

/// Largest distance a branch jumps over.
pub const MAX_JUMP_OFFSET: usize = 30;

/// Comparison evaluated ahead of a conditional jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    Greater,
    Equal,
    StrEqual,
    Substring,
}

impl Comparison {
    pub const ALL: [Comparison; 5] = [
        Comparison::Less,
        Comparison::Greater,
        Comparison::Equal,
        Comparison::StrEqual,
        Comparison::Substring,
    ];

    pub fn opcode(self) -> OpCode {
        match self {
            Comparison::Less => OpCode::Lt,
            Comparison::Greater => OpCode::Gt,
            Comparison::Equal => OpCode::Eq,
            Comparison::StrEqual => OpCode::Strcmp,
            Comparison::Substring => OpCode::Instr,
        }
    }
}

/// A branch block together with the decisions made while folding it.
#[derive(Debug, Clone)]
pub struct BranchBlock {
    pub block: Block,
    /// `None` for an unconditional jump.
    pub comparison: Option<Comparison>,
    /// Whether the comparison held for the drawn operands.
    pub holds: bool,
    pub jump: OpCode,
    pub taken: bool,
    /// Byte offset right after the jump instruction.
    pub jump_end: usize,
    pub offset: usize,
    pub target: usize,
}

/// Named branch-block generator.
#[derive(Debug, Clone, Copy)]
pub struct BranchGenerator {
    pub name: &'static str,
    pub generate: fn(&mut GenContext<'_>, usize) -> SynthResult<BranchBlock>,
}

pub const BRANCH_BLOCKS: &[BranchGenerator] = &[
    BranchGenerator { name: "jmp", generate: jmp },
    BranchGenerator { name: "lt", generate: lt },
    BranchGenerator { name: "gt", generate: gt },
    BranchGenerator { name: "eq", generate: eq },
    BranchGenerator { name: "strcmp", generate: strcmp },
    BranchGenerator { name: "instr", generate: instr },
];

pub fn branch_generator(name: &str) -> Option<&'static BranchGenerator> {
    BRANCH_BLOCKS.iter().find(|g| g.name == name)
}

/// Draws one branch block starting at byte `position`.
pub fn random_branch(ctx: &mut GenContext<'_>, position: usize) -> SynthResult<BranchBlock> {
    let generator = &BRANCH_BLOCKS[ctx.range(0, BRANCH_BLOCKS.len() - 1)];
    tracing::debug!(generator = generator.name, position, "branch block");
    (generator.generate)(ctx, position)
}

/// Unconditional jump over unreachable padding.
pub fn jmp(ctx: &mut GenContext<'_>, position: usize) -> SynthResult<BranchBlock> {
    let offset = ctx.range(1, MAX_JUMP_OFFSET);
    let jump_end = position + InstructionBuilder::encoded_len(OpCode::Jmp, 0);
    let target = jump_end + offset;
    let mut block = Block::new(vec![ctx.builder().emit_jump(OpCode::Jmp, target)?]);
    block.push(pad_region(ctx, offset)?);
    Ok(BranchBlock {
        block,
        comparison: None,
        holds: true,
        jump: OpCode::Jmp,
        taken: true,
        jump_end,
        offset,
        target,
    })
}

fn lt(ctx: &mut GenContext<'_>, position: usize) -> SynthResult<BranchBlock> {
    compare(ctx, position, Comparison::Less)
}

fn gt(ctx: &mut GenContext<'_>, position: usize) -> SynthResult<BranchBlock> {
    compare(ctx, position, Comparison::Greater)
}

fn eq(ctx: &mut GenContext<'_>, position: usize) -> SynthResult<BranchBlock> {
    compare(ctx, position, Comparison::Equal)
}

fn strcmp(ctx: &mut GenContext<'_>, position: usize) -> SynthResult<BranchBlock> {
    compare(ctx, position, Comparison::StrEqual)
}

fn instr(ctx: &mut GenContext<'_>, position: usize) -> SynthResult<BranchBlock> {
    compare(ctx, position, Comparison::Substring)
}

/// Concrete operands of a comparison. `v1` ends up on top of the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operands {
    Int { v1: u64, v2: u64 },
    Str { v1: Vec<u8>, v2: Vec<u8> },
}

impl Comparison {
    /// Whether the comparison holds for `operands`, as the target computes it.
    pub fn evaluate(self, operands: &Operands) -> SynthResult<bool> {
        match (self, operands) {
            (Comparison::Less, Operands::Int { v1, v2 }) => Ok(v1 < v2),
            (Comparison::Greater, Operands::Int { v1, v2 }) => Ok(v1 > v2),
            (Comparison::Equal, Operands::Int { v1, v2 }) => Ok(v1 == v2),
            (Comparison::StrEqual, Operands::Str { v1, v2 }) => Ok(v1 == v2),
            (Comparison::Substring, Operands::Str { v1, v2 }) => Ok(contains(v1, v2)),
            (comparison, operands) => Err(SynthError::Precondition(format!(
                "{comparison:?} cannot compare {operands:?}"
            ))),
        }
    }
}

/// Draws operands and a jump variant, then builds the branch.
pub fn compare(ctx: &mut GenContext<'_>, position: usize, comparison: Comparison) -> SynthResult<BranchBlock> {
    let operands = draw_operands(ctx, comparison);
    let jump = if ctx.coin() { OpCode::Jz } else { OpCode::Jnz };
    compare_with(ctx, position, comparison, operands, jump)
}

/// Pushes `operands`, compares them and jumps with `jump`. A taken jump
/// skips padding; otherwise control falls through into a fresh basic block
/// whose outputs are expected.
pub fn compare_with(
    ctx: &mut GenContext<'_>,
    position: usize,
    comparison: Comparison,
    operands: Operands,
    jump: OpCode,
) -> SynthResult<BranchBlock> {
    let holds = comparison.evaluate(&operands)?;
    let offset = ctx.range(1, MAX_JUMP_OFFSET);

    let mut instructions = Vec::new();
    match &operands {
        Operands::Int { v1, v2 } => {
            instructions.push(push_int(ctx, *v2)?);
            instructions.push(push_int(ctx, *v1)?);
        }
        Operands::Str { v1, v2 } => {
            instructions.extend(push_string(ctx, v2)?);
            instructions.extend(push_string(ctx, v1)?);
        }
    }
    instructions.push(ctx.builder().emit(comparison.opcode())?);

    let jump_start = position + instructions.iter().map(Instruction::encoded_len).sum::<usize>();
    let jump_end = jump_start + InstructionBuilder::encoded_len(jump, 0);
    let target = jump_end + offset;
    instructions.push(ctx.builder().emit_jump(jump, target)?);

    let flag = ctx.polarity().flag_for(holds);
    let taken = match jump {
        OpCode::Jz => !flag,
        OpCode::Jnz => flag,
        other => {
            return Err(SynthError::Precondition(format!(
                "{other} is not a conditional jump"
            )))
        }
    };
    tracing::trace!(?comparison, holds, flag, %jump, taken, target, "folded branch");

    let mut block = Block::new(instructions);
    if taken {
        block.push(pad_region(ctx, offset)?);
    } else {
        block.append(random_basic(ctx)?);
    }
    Ok(BranchBlock {
        block,
        comparison: Some(comparison),
        holds,
        jump,
        taken,
        jump_end,
        offset,
        target,
    })
}

/// Operands for `comparison` under its domain rules: equality operands
/// coincide half of the time, substring operands contain each other half of
/// the time.
fn draw_operands(ctx: &mut GenContext<'_>, comparison: Comparison) -> Operands {
    match comparison {
        Comparison::Less | Comparison::Greater => Operands::Int {
            v1: ctx.bits(5, 60),
            v2: ctx.bits(5, 60),
        },
        Comparison::Equal => {
            let v1 = ctx.bits(5, 60);
            let v2 = if ctx.coin() { v1 } else { ctx.bits(5, 60) };
            Operands::Int { v1, v2 }
        }
        Comparison::StrEqual => {
            let v1 = ctx.word();
            let v2 = if ctx.coin() { v1.clone() } else { ctx.word() };
            Operands::Str { v1, v2 }
        }
        Comparison::Substring => {
            let mut v1 = ctx.word();
            let v2 = ctx.word();
            if ctx.coin() {
                let tail = v1.split_off(v1.len() / 2);
                v1.extend_from_slice(&v2);
                v1.extend(tail);
            }
            Operands::Str { v1, v2 }
        }
    }
}

/// Padding as a single filler instruction so it never contributes outputs.
fn pad_region(ctx: &mut GenContext<'_>, len: usize) -> SynthResult<Instruction> {
    let depth = ctx.padding_depth();
    Ok(Instruction::filler(pad(ctx, len, depth)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use veighty_config::{FlagPolarity, SynthConfig};
    use veighty_isa::OpcodeTable;

    #[test]
    fn test_jmp_target_arithmetic() {
        let table = OpcodeTable::bundled().unwrap();
        let corpus = Corpus::bundled().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = GenContext::new(&table, &corpus, &SynthConfig::default(), &mut rng);
        for position in [0, 17, 300] {
            let branch = jmp(&mut ctx, position).unwrap();
            assert_eq!(branch.jump_end, position + 3);
            assert_eq!(branch.target, position + 3 + branch.offset);
            assert!((1..=MAX_JUMP_OFFSET).contains(&branch.offset));
            assert_eq!(branch.block.encoded_len(), 3 + branch.offset);
            assert_eq!(branch.block.expected_outputs().count(), 0);
        }
    }

    #[test]
    fn test_taken_branch_lands_after_padding() {
        let table = OpcodeTable::bundled().unwrap();
        let corpus = Corpus::bundled().unwrap();
        for polarity in [FlagPolarity::Direct, FlagPolarity::Inverted] {
            let settings = SynthConfig {
                compare_flag: polarity,
                ..SynthConfig::default()
            };
            let mut rng = StdRng::seed_from_u64(9);
            let mut ctx = GenContext::new(&table, &corpus, &settings, &mut rng);
            for comparison in Comparison::ALL {
                for _ in 0..20 {
                    let branch = compare(&mut ctx, 40, comparison).unwrap();
                    let flag = polarity.flag_for(branch.holds);
                    assert_eq!(branch.taken, (branch.jump == OpCode::Jnz) == flag);
                    if branch.taken {
                        assert_eq!(40 + branch.block.encoded_len(), branch.target);
                        assert_eq!(branch.block.expected_outputs().count(), 0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_evaluate_rejects_mixed_domains() {
        let ints = Operands::Int { v1: 1, v2: 2 };
        assert!(Comparison::Less.evaluate(&ints).unwrap());
        assert!(Comparison::StrEqual.evaluate(&ints).is_err());
        let strs = Operands::Str {
            v1: b"haystack".to_vec(),
            v2: b"st".to_vec(),
        };
        assert!(Comparison::Substring.evaluate(&strs).unwrap());
        assert!(Comparison::Greater.evaluate(&strs).is_err());
    }

    #[test]
    fn test_registry() {
        assert_eq!(BRANCH_BLOCKS.len(), 6);
        assert!(branch_generator("instr").is_some());
        assert!(branch_generator("add").is_none());
    }
}
