//! Programs that store and retrieve a key/value pair through the target's
//! file instructions.
//!
//! Keys and values above a short threshold are pushed in two halves and
//! joined on the target, so they never cross the wire in one piece.

use crate::error::{SynthError, SynthResult};
use crate::generators::operands::{ensure_carryable, immediate_string};
use crate::simulator::check_file_name;
use veighty_isa::protocol::FILE_WRITTEN;
use veighty_isa::{Instruction, InstructionBuilder, OpCode, Program};

/// Values longer than this are pushed in halves.
pub const VALUE_SPLIT_THRESHOLD: usize = 10;

/// Keys longer than this are pushed in halves.
pub const KEY_SPLIT_THRESHOLD: usize = 8;

/// Writes `value` under `key`; the target confirms with one line.
pub fn place_pair(builder: InstructionBuilder<'_>, key: &[u8], value: &[u8]) -> SynthResult<Program> {
    validate_key(key)?;
    ensure_carryable(value)?;
    if value.is_empty() {
        return Err(SynthError::Precondition("stored value must not be empty".into()));
    }
    let mut instructions = split_push(builder, value, VALUE_SPLIT_THRESHOLD)?;
    instructions.extend(split_push(builder, key, KEY_SPLIT_THRESHOLD)?);
    instructions.push(builder.emit(OpCode::Writefile)?.with_output(FILE_WRITTEN));
    Ok(Program::checked(instructions)?)
}

/// Reads the value stored under `key` and prints it. The printed line is
/// not declared: the caller collects whatever follows the program.
pub fn fetch_pair(builder: InstructionBuilder<'_>, key: &[u8]) -> SynthResult<Program> {
    validate_key(key)?;
    let mut instructions = split_push(builder, key, KEY_SPLIT_THRESHOLD)?;
    instructions.push(builder.emit(OpCode::Readfile)?);
    instructions.push(builder.emit(OpCode::Pops)?);
    Ok(Program::checked(instructions)?)
}

/// Keys name files on the target.
pub fn validate_key(key: &[u8]) -> SynthResult<()> {
    check_file_name(key).map_err(|_| SynthError::InvalidKey(String::from_utf8_lossy(key).into_owned()))
}

fn split_push(builder: InstructionBuilder<'_>, data: &[u8], threshold: usize) -> SynthResult<Vec<Instruction>> {
    if data.len() <= threshold {
        return immediate_string(builder, data);
    }
    let (first, second) = data.split_at(data.len() / 2);
    let mut instructions = immediate_string(builder, second)?;
    instructions.extend(immediate_string(builder, first)?);
    instructions.push(builder.emit(OpCode::Strcat)?);
    Ok(instructions)
}
