//! # Veighty Synth
//!
//! Random program synthesis for the veighty-machinery VM. Every generated
//! program carries the exact output a conforming VM prints for it, computed
//! while the program is built: operands are drawn concretely, arithmetic is
//! folded and branch conditions are decided before emission.
//!
//! ## Example
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use veighty_config::SynthConfig;
//! use veighty_isa::OpcodeTable;
//! use veighty_synth::{Corpus, ProgramShape, Synthesizer};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = OpcodeTable::bundled()?;
//! let corpus = Corpus::bundled()?;
//! let synth = Synthesizer::new(&table, &corpus, SynthConfig::default());
//! let program = synth.generate(ProgramShape::Branching, &mut StdRng::seed_from_u64(1))?;
//! assert!(program.encoded_len() < 4096);
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod composer;
pub mod context;
pub mod corpus;
pub mod error;
pub mod generators;
pub mod padding;
pub mod simulator;
pub mod storage;

pub use block::Block;
pub use composer::{ProgramShape, Synthesizer};
pub use context::GenContext;
pub use corpus::{decoy, Corpus};
pub use error::{SimError, SimResult, SynthError, SynthResult};
pub use padding::{pad, pad_with, PaddingMode};
pub use simulator::{HaltReason, RunSummary, Simulator, StackValue};
pub use storage::{fetch_pair, place_pair};
