use clap::{Parser, Subcommand};
use std::path::PathBuf;
use veighty_config::{CheckerConfig, FlagPolarity};
use veighty_synth::ProgramShape;

/// Command-line arguments for veighty
#[derive(Parser, Debug, Clone)]
#[command(
    name = "veighty",
    version = env!("CARGO_PKG_VERSION"),
    about = "Self-verifying program generator and service checker for veighty-machinery"
)]
pub struct CliArgs {
    /// Specifies the config file
    #[arg(short = 'c', long = "config", value_name = "FILE", default_value = "veighty.toml")]
    pub config: PathBuf,

    /// Target host
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Target port
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Seed for program generation
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Flag polarity of comparison instructions (direct, inverted)
    #[arg(long = "compare-flag", value_name = "POLARITY")]
    pub compare_flag: Option<FlagPolarity>,

    /// Opcode definition header
    #[arg(long = "isa", value_name = "FILE")]
    pub isa: Option<PathBuf>,

    /// Checker state file
    #[arg(long = "state", value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long = "json-logs")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate one program and print it
    Generate {
        /// linear or branching; random when omitted
        #[arg(long, value_name = "SHAPE")]
        shape: Option<ProgramShape>,

        /// Print bytecode, input and expected outputs as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run generated programs through the reference simulator
    Simulate {
        #[arg(long, value_name = "SHAPE")]
        shape: Option<ProgramShape>,

        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Run random programs against the target
    Test {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Store a flag on the target
    PlaceFlag { flag: String },
    /// Read a flag back from the target
    CheckFlag { flag: String },
    /// Random programs plus storage round trips
    CheckService,
}

impl CliArgs {
    /// Applies flags on top of file configuration.
    pub fn apply_overrides(&self, config: &mut CheckerConfig) {
        if let Some(host) = &self.host {
            config.target.host = host.clone();
        }
        if let Some(port) = self.port {
            config.target.port = port;
        }
        if let Some(seed) = self.seed {
            config.synth.seed = Some(seed);
        }
        if let Some(polarity) = self.compare_flag {
            config.synth.compare_flag = polarity;
        }
        if let Some(isa) = &self.isa {
            config.isa.definition = Some(isa.clone());
        }
        if let Some(state) = &self.state {
            config.state.path = state.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}
