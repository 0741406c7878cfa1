//! Instructions that place a known value on the stack.
//!
//! Integers go through `push` or `read`, strings through `pushs` or `reads`,
//! chosen at random so both paths of the target get exercised.

use crate::context::GenContext;
use crate::error::{SynthError, SynthResult};
use veighty_config::MAX_STRING_OPERAND;
use veighty_isa::{Instruction, InstructionBuilder, OpCode};

/// Pushes `value` either as an immediate or as deferred input.
pub fn push_int(ctx: &mut GenContext<'_>, value: u64) -> SynthResult<Instruction> {
    let builder = ctx.builder();
    let instruction = if ctx.coin() {
        builder.emit_push_int(value)?
    } else {
        builder.emit_read_int(value)?
    };
    Ok(instruction)
}

/// Pushes `value` either as an immediate or as an input line. Values longer
/// than one string operand are pushed in halves and concatenated.
pub fn push_string(ctx: &mut GenContext<'_>, value: &[u8]) -> SynthResult<Vec<Instruction>> {
    ensure_carryable(value)?;
    if value.len() > MAX_STRING_OPERAND {
        let (first, second) = value.split_at(value.len() / 2);
        let mut instructions = push_string(ctx, second)?;
        instructions.extend(push_string(ctx, first)?);
        instructions.push(ctx.builder().emit(OpCode::Strcat)?);
        return Ok(instructions);
    }
    let builder = ctx.builder();
    let instruction = if value.is_empty() || ctx.coin() {
        builder.emit_push_string(value)?
    } else {
        builder.emit_read_string(value)?
    };
    Ok(vec![instruction])
}

/// Pushes `value` with `pushs` only, splitting as [`push_string`] does.
pub fn immediate_string(builder: InstructionBuilder<'_>, value: &[u8]) -> SynthResult<Vec<Instruction>> {
    ensure_carryable(value)?;
    if value.len() > MAX_STRING_OPERAND {
        let (first, second) = value.split_at(value.len() / 2);
        let mut instructions = immediate_string(builder, second)?;
        instructions.extend(immediate_string(builder, first)?);
        instructions.push(builder.emit(OpCode::Strcat)?);
        return Ok(instructions);
    }
    Ok(vec![builder.emit_push_string(value)?])
}

/// The target stores strings NUL-terminated and prints them one per line.
pub fn ensure_carryable(value: &[u8]) -> SynthResult<()> {
    if value.iter().any(|b| *b == 0 || *b == b'\n') {
        return Err(SynthError::UnrepresentableString(
            String::from_utf8_lossy(value).into_owned(),
        ));
    }
    Ok(())
}
