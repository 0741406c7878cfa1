//! Whole-program composition.

use crate::block::Block;
use crate::context::GenContext;
use crate::corpus::Corpus;
use crate::error::{SynthError, SynthResult};
use crate::generators::basic::random_basic;
use crate::generators::branch::random_branch;
use rand::{Rng, RngCore};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use veighty_config::SynthConfig;
use veighty_isa::{Instruction, IsaError, OpcodeTable, Program};

/// Basic blocks a program starts with.
const LEADING_BLOCKS: usize = 3;

/// Basic blocks appended after a branch block.
const TRAILING_BLOCKS: usize = 2;

/// Program shapes the composer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramShape {
    /// Basic blocks only, spliced into each other.
    Linear,
    /// Basic blocks around one branch block.
    Branching,
}

impl fmt::Display for ProgramShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramShape::Linear => write!(f, "linear"),
            ProgramShape::Branching => write!(f, "branching"),
        }
    }
}

impl FromStr for ProgramShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(ProgramShape::Linear),
            "branching" | "branch" => Ok(ProgramShape::Branching),
            other => Err(format!("unknown program shape: {other}")),
        }
    }
}

/// Composes random self-verifying programs.
#[derive(Debug, Clone)]
pub struct Synthesizer<'a> {
    table: &'a OpcodeTable,
    corpus: &'a Corpus,
    settings: SynthConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(table: &'a OpcodeTable, corpus: &'a Corpus, settings: SynthConfig) -> Self {
        Self {
            table,
            corpus,
            settings,
        }
    }

    pub fn table(&self) -> &'a OpcodeTable {
        self.table
    }

    pub fn corpus(&self) -> &'a Corpus {
        self.corpus
    }

    pub fn settings(&self) -> &SynthConfig {
        &self.settings
    }

    /// Generator context drawing from `rng`.
    pub fn context<'r>(&'r self, rng: &'r mut dyn RngCore) -> GenContext<'r> {
        GenContext::new(self.table, self.corpus, &self.settings, rng)
    }

    /// Picks a shape uniformly and generates a program of it.
    pub fn random_program(&self, rng: &mut dyn RngCore) -> SynthResult<(ProgramShape, Program)> {
        let shape = if rng.gen_bool(0.5) {
            ProgramShape::Linear
        } else {
            ProgramShape::Branching
        };
        Ok((shape, self.generate(shape, rng)?))
    }

    /// Generates a program of `shape`, retrying while the result would reach
    /// the transport cap.
    pub fn generate(&self, shape: ProgramShape, rng: &mut dyn RngCore) -> SynthResult<Program> {
        let attempts = self.settings.max_attempts.max(1);
        for attempt in 1..=attempts {
            let mut ctx = self.context(&mut *rng);
            let instructions = match shape {
                ProgramShape::Linear => {
                    compose_linear(&mut ctx, self.settings.min_splices, self.settings.max_splices)?
                }
                ProgramShape::Branching => compose_branching(&mut ctx)?,
            };
            match Program::checked(instructions) {
                Ok(program) => {
                    debug!(
                        %shape,
                        attempt,
                        bytes = program.encoded_len(),
                        instructions = program.len(),
                        outputs = program.expected_outputs().count(),
                        "composed program"
                    );
                    return Ok(program);
                }
                Err(IsaError::ProgramTooLarge { len, cap }) => {
                    warn!(%shape, attempt, len, cap, "program reached the transport cap, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(SynthError::Oversized { attempts })
    }

    pub fn linear(&self, rng: &mut dyn RngCore) -> SynthResult<Program> {
        self.generate(ProgramShape::Linear, rng)
    }

    pub fn branching(&self, rng: &mut dyn RngCore) -> SynthResult<Program> {
        self.generate(ProgramShape::Branching, rng)
    }
}

/// Three basic blocks, then between `min_splices` and `max_splices` more
/// blocks inserted at interior instruction positions. Blocks leave the stack
/// as they found it, so inserting one between any two instructions keeps
/// every declared output valid and in order.
pub fn compose_linear(
    ctx: &mut GenContext<'_>,
    min_splices: usize,
    max_splices: usize,
) -> SynthResult<Vec<Instruction>> {
    let mut instructions = Vec::new();
    for _ in 0..LEADING_BLOCKS {
        instructions.extend(random_basic(ctx)?.into_instructions());
    }
    let splices = ctx.range(min_splices, max_splices.max(min_splices));
    for _ in 0..splices {
        let block = random_basic(ctx)?;
        let at = ctx.range(1, instructions.len().saturating_sub(1).max(1));
        instructions.splice(at..at, block.into_instructions());
    }
    Ok(instructions)
}

/// Three basic blocks, one branch block placed at their combined length,
/// then two more basic blocks.
pub fn compose_branching(ctx: &mut GenContext<'_>) -> SynthResult<Vec<Instruction>> {
    let mut block = Block::default();
    for _ in 0..LEADING_BLOCKS {
        block.append(random_basic(ctx)?);
    }
    let branch = random_branch(ctx, block.encoded_len())?;
    block.append(branch.block);
    for _ in 0..TRAILING_BLOCKS {
        block.append(random_basic(ctx)?);
    }
    Ok(block.into_instructions())
}
