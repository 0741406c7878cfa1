//! Unreachable byte regions skipped by taken jumps.

use crate::context::GenContext;
use crate::error::SynthResult;
use crate::generators::basic::random_basic;
use crate::generators::branch::random_branch;

/// Block draws attempted before topping up with filler.
const MAX_PADDING_DRAWS: usize = 10;

/// Share of embedded blocks that are branch blocks while nesting is allowed.
const BRANCH_PADDING_PERCENT: u8 = 25;

/// How a padding region is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingMode {
    /// Random lowercase letters.
    Filler,
    /// Encodings of complete blocks, trimmed or topped up to length.
    Blocks,
}

/// Returns exactly `len` bytes, picking the mode at random. `depth` bounds
/// how deep branch blocks may nest inside the region.
pub fn pad(ctx: &mut GenContext<'_>, len: usize, depth: u8) -> SynthResult<Vec<u8>> {
    let mode = if ctx.chance(ctx.block_padding_percent()) {
        PaddingMode::Blocks
    } else {
        PaddingMode::Filler
    };
    pad_with(ctx, len, mode, depth)
}

/// Returns exactly `len` bytes filled according to `mode`.
pub fn pad_with(ctx: &mut GenContext<'_>, len: usize, mode: PaddingMode, depth: u8) -> SynthResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(len);
    if mode == PaddingMode::Blocks {
        for _ in 0..MAX_PADDING_DRAWS {
            if bytes.len() >= len {
                break;
            }
            let block = if depth > 0 && ctx.chance(BRANCH_PADDING_PERCENT) {
                ctx.with_padding_depth(depth - 1, |ctx| random_branch(ctx, 0))?
                    .block
            } else {
                random_basic(ctx)?
            };
            bytes.extend(block.encode());
        }
    }
    if bytes.len() < len {
        let filler = ctx.letters(len - bytes.len());
        bytes.extend(filler);
    }
    bytes.truncate(len);
    tracing::trace!(len, ?mode, depth, "padding");
    Ok(bytes)
}
