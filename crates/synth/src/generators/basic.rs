//! Basic-block generators.
//!
//! Every generator draws fresh operands, emits a sequence that leaves the
//! stack as it found it and declares the line printed by each `pop`/`pops`.
//! Operand domains are enforced while drawing, so no block can make the
//! target fault.

use super::operands::{push_int, push_string};
use crate::block::Block;
use crate::context::GenContext;
use crate::error::{SynthError, SynthResult};
use veighty_config::MAX_WORD;
use veighty_isa::{format_hex, Instruction, OpCode};

/// Named basic-block generator.
#[derive(Debug, Clone, Copy)]
pub struct BasicGenerator {
    pub name: &'static str,
    pub generate: fn(&mut GenContext<'_>) -> SynthResult<Block>,
}

/// Every basic block the synthesizer draws from.
pub const BASIC_BLOCKS: &[BasicGenerator] = &[
    BasicGenerator { name: "nop", generate: nop },
    BasicGenerator { name: "push_pop", generate: push_pop },
    BasicGenerator { name: "read", generate: read },
    BasicGenerator { name: "add", generate: add },
    BasicGenerator { name: "sub", generate: sub },
    BasicGenerator { name: "mul", generate: mul },
    BasicGenerator { name: "div", generate: div },
    BasicGenerator { name: "mod", generate: modulo },
    BasicGenerator { name: "itostr", generate: itostr },
    BasicGenerator { name: "inc", generate: inc },
    BasicGenerator { name: "dec", generate: dec },
    BasicGenerator { name: "shl", generate: shl },
    BasicGenerator { name: "shr", generate: shr },
    BasicGenerator { name: "cpy", generate: cpy },
    BasicGenerator { name: "swap", generate: swap },
    BasicGenerator { name: "pushs_pops", generate: pushs_pops },
    BasicGenerator { name: "reads", generate: reads },
    BasicGenerator { name: "strcat", generate: strcat },
    BasicGenerator { name: "strlen", generate: strlen },
    BasicGenerator { name: "strtoi", generate: strtoi },
];

/// Looks up a generator by name.
pub fn basic_generator(name: &str) -> Option<&'static BasicGenerator> {
    BASIC_BLOCKS.iter().find(|g| g.name == name)
}

/// Draws one basic block from a uniformly chosen generator.
pub fn random_basic(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let generator = &BASIC_BLOCKS[ctx.range(0, BASIC_BLOCKS.len() - 1)];
    tracing::debug!(generator = generator.name, "basic block");
    (generator.generate)(ctx)
}

/// Increment and decrement repeat counts.
const MAX_REPEAT: usize = 15;

/// Shift repeat counts.
const MAX_SHIFT: u32 = 10;

/// Decrement operands below this are lifted by it.
const DEC_FLOOR: u64 = 100;

fn pop_int(ctx: &GenContext<'_>, value: u64) -> SynthResult<Instruction> {
    Ok(ctx.builder().emit(OpCode::Pop)?.with_output(format_hex(value)))
}

fn pop_str(ctx: &GenContext<'_>, value: &[u8]) -> SynthResult<Instruction> {
    Ok(ctx.builder().emit(OpCode::Pops)?.with_output(value))
}

fn op(ctx: &GenContext<'_>, op: OpCode) -> SynthResult<Instruction> {
    Ok(ctx.builder().emit(op)?)
}

/// Two integers of the given width, the larger one first.
fn ordered_pair(ctx: &mut GenContext<'_>, max_bits: u32) -> (u64, u64) {
    let v1 = ctx.bits(5, max_bits);
    let v2 = ctx.bits(5, max_bits);
    if v1 < v2 {
        (v2, v1)
    } else {
        (v1, v2)
    }
}

/// Pushes `v2` then `v1`, applies `op` and pops `expected`.
fn binary(ctx: &mut GenContext<'_>, v1: u64, v2: u64, code: OpCode, expected: u64) -> SynthResult<Block> {
    let mut block = Block::default();
    block.push(push_int(ctx, v2)?);
    block.push(push_int(ctx, v1)?);
    block.push(op(ctx, code)?);
    block.push(pop_int(ctx, expected)?);
    Ok(block)
}

/// Pushes `value`, applies `code` `times` times and pops `expected`.
fn repeated(ctx: &mut GenContext<'_>, value: u64, code: OpCode, times: usize, expected: u64) -> SynthResult<Block> {
    let mut block = Block::default();
    block.push(push_int(ctx, value)?);
    for _ in 0..times {
        block.push(op(ctx, code)?);
    }
    block.push(pop_int(ctx, expected)?);
    Ok(block)
}

fn nop(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    Ok(Block::new(vec![op(ctx, OpCode::Nop)?]))
}

fn push_pop(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let value = ctx.bits(5, 63);
    let push = ctx.builder().emit_push_int(value)?;
    Ok(Block::new(vec![push, pop_int(ctx, value)?]))
}

fn read(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let value = ctx.bits(5, 63);
    let read = ctx.builder().emit_read_int(value)?;
    Ok(Block::new(vec![read, pop_int(ctx, value)?]))
}

fn add(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let v1 = ctx.bits(5, 60);
    let v2 = ctx.bits(5, 60);
    add_block(ctx, v1, v2)
}

/// Addition block for fixed operands.
pub fn add_block(ctx: &mut GenContext<'_>, v1: u64, v2: u64) -> SynthResult<Block> {
    let sum = v1
        .checked_add(v2)
        .filter(|sum| *sum <= MAX_WORD)
        .ok_or_else(|| SynthError::Precondition(format!("{v1} + {v2} leaves the word domain")))?;
    binary(ctx, v1, v2, OpCode::Add, sum)
}

fn sub(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let (v1, v2) = ordered_pair(ctx, 60);
    sub_block(ctx, v1, v2)
}

/// Subtraction block for fixed operands, `v1 >= v2`.
pub fn sub_block(ctx: &mut GenContext<'_>, v1: u64, v2: u64) -> SynthResult<Block> {
    let difference = v1
        .checked_sub(v2)
        .ok_or_else(|| SynthError::Precondition(format!("{v1} - {v2} would underflow")))?;
    binary(ctx, v1, v2, OpCode::Sub, difference)
}

fn mul(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let v1 = ctx.bits(5, 30);
    let v2 = ctx.bits(5, 30);
    binary(ctx, v1, v2, OpCode::Mul, v1 * v2)
}

/// Divisor pair with `v1 >= v2` and `v2` at least one.
fn divisor_pair(ctx: &mut GenContext<'_>) -> (u64, u64) {
    let (v1, v2) = ordered_pair(ctx, 30);
    (v1, v2.max(1))
}

fn div(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let (v1, v2) = divisor_pair(ctx);
    binary(ctx, v1, v2, OpCode::Div, v1 / v2)
}

fn modulo(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let (v1, v2) = divisor_pair(ctx);
    binary(ctx, v1, v2, OpCode::Mod, v1 % v2)
}

fn itostr(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let value = ctx.bits(5, 60);
    let mut block = Block::default();
    block.push(push_int(ctx, value)?);
    block.push(op(ctx, OpCode::Itostr)?);
    block.push(pop_str(ctx, value.to_string().as_bytes())?);
    Ok(block)
}

fn inc(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let value = ctx.bits(5, 62);
    let times = ctx.range(1, MAX_REPEAT);
    repeated(ctx, value, OpCode::Inc, times, value + times as u64)
}

fn dec(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let mut value = ctx.bits(5, 62);
    if value < DEC_FLOOR {
        value += DEC_FLOOR;
    }
    let times = ctx.range(1, MAX_REPEAT);
    let expected = value.checked_sub(times as u64).ok_or_else(|| {
        SynthError::Precondition(format!("decrement of {value} by {times} would underflow"))
    })?;
    repeated(ctx, value, OpCode::Dec, times, expected)
}

fn shl(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let shift = ctx.range(1, MAX_SHIFT as usize) as u32;
    let value = ctx.bits(5, 62 - shift);
    repeated(ctx, value, OpCode::Shl, shift as usize, value << shift)
}

fn shr(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let shift = ctx.range(1, MAX_SHIFT as usize) as u32;
    let value = ctx.bits(5, 62);
    repeated(ctx, value, OpCode::Shr, shift as usize, value >> shift)
}

fn cpy(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let mut block = Block::default();
    if ctx.coin() {
        let value = ctx.bits(5, 62);
        block.push(push_int(ctx, value)?);
        block.push(op(ctx, OpCode::Cpy)?);
        block.push(pop_int(ctx, value)?);
        block.push(pop_int(ctx, value)?);
    } else {
        let value = ctx.word();
        block.append(push_string(ctx, &value)?.into());
        block.push(op(ctx, OpCode::Cpy)?);
        block.push(pop_str(ctx, &value)?);
        block.push(pop_str(ctx, &value)?);
    }
    Ok(block)
}

fn swap(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let mut block = Block::default();
    if ctx.coin() {
        let v1 = ctx.bits(5, 62);
        let v2 = ctx.bits(5, 62);
        block.push(push_int(ctx, v2)?);
        block.push(push_int(ctx, v1)?);
        block.push(op(ctx, OpCode::Swap)?);
        block.push(pop_int(ctx, v2)?);
        block.push(pop_int(ctx, v1)?);
    } else {
        let v1 = ctx.word();
        let v2 = ctx.word();
        block.append(push_string(ctx, &v2)?.into());
        block.append(push_string(ctx, &v1)?.into());
        block.push(op(ctx, OpCode::Swap)?);
        block.push(pop_str(ctx, &v2)?);
        block.push(pop_str(ctx, &v1)?);
    }
    Ok(block)
}

fn pushs_pops(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let value = ctx.word();
    let push = ctx.builder().emit_push_string(&value)?;
    Ok(Block::new(vec![push, pop_str(ctx, &value)?]))
}

fn reads(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let value = ctx.word();
    let read = ctx.builder().emit_read_string(&value)?;
    Ok(Block::new(vec![read, pop_str(ctx, &value)?]))
}

fn strcat(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let first = ctx.word();
    let second = ctx.word();
    strcat_block(ctx, first, second)
}

/// Concatenation block printing `first` followed by `second`.
pub fn strcat_block(ctx: &mut GenContext<'_>, first: Vec<u8>, second: Vec<u8>) -> SynthResult<Block> {
    let mut block = Block::default();
    block.append(push_string(ctx, &second)?.into());
    block.append(push_string(ctx, &first)?.into());
    block.push(op(ctx, OpCode::Strcat)?);
    let joined = [first, second].concat();
    block.push(pop_str(ctx, &joined)?);
    Ok(block)
}

fn strlen(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let value = ctx.word();
    let mut block = Block::default();
    block.append(push_string(ctx, &value)?.into());
    block.push(op(ctx, OpCode::Strlen)?);
    block.push(pop_int(ctx, value.len() as u64)?);
    Ok(block)
}

fn strtoi(ctx: &mut GenContext<'_>) -> SynthResult<Block> {
    let value = ctx.bits(5, 62);
    let mut block = Block::default();
    block.append(push_string(ctx, value.to_string().as_bytes())?.into());
    block.push(op(ctx, OpCode::Strtoi)?);
    block.push(pop_int(ctx, value)?);
    Ok(block)
}
