//! # Veighty Checker
//!
//! Correctness checker for the veighty-machinery stack VM. It generates
//! random bytecode programs whose output is known ahead of execution, runs
//! them against a target service and reports any divergence.
//!
//! ## Architecture
//!
//! - [`config`]: limits, flag polarity and the TOML configuration.
//! - [`isa`]: opcode table, operand encoding, instructions and programs.
//! - [`synth`]: block generators, padding, the composer and a reference
//!   simulator used to cross-check the generators.
//! - [`session`]: the async target driver, persistent state and service
//!   checks.
//!
//! ## Quick Start
//!
//! ```rust
//! use veighty_checker::prelude::*;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = OpcodeTable::bundled()?;
//! let corpus = Corpus::bundled()?;
//! let synth = Synthesizer::new(&table, &corpus, SynthConfig::default());
//! let program = synth.generate(ProgramShape::Linear, &mut StdRng::seed_from_u64(7))?;
//!
//! let mut sim = Simulator::new(&table, FlagPolarity::Direct);
//! let output = sim.run(&program.encode(), &program.input_stream())?;
//! assert_eq!(output, program.expected_stream());
//! # Ok(())
//! # }
//! ```

pub use veighty_config as config;
pub use veighty_isa as isa;
pub use veighty_session as session;
pub use veighty_synth as synth;

/// Commonly used types.
pub mod prelude {
    pub use crate::config::{CheckerConfig, FlagPolarity, SynthConfig};
    pub use crate::isa::{Instruction, InstructionBuilder, OpCode, OpcodeTable, Program};
    pub use crate::session::{CheckResult, Checker, Session, StateStore};
    pub use crate::synth::{Block, Corpus, GenContext, ProgramShape, Simulator, Synthesizer};
}
