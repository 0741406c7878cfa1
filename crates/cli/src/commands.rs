//! Subcommand implementations.

use crate::args::Command;
use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};
use veighty_config::CheckerConfig;
use veighty_isa::{OpcodeTable, Program};
use veighty_session::{CheckResult, Checker};
use veighty_synth::{Corpus, ProgramShape, Simulator, Synthesizer};

/// Printable form of a generated program.
#[derive(Debug, Serialize)]
pub struct ProgramReport {
    pub shape: String,
    pub length: usize,
    pub bytecode: String,
    pub input: String,
    pub expected: Vec<String>,
}

impl ProgramReport {
    pub fn new(shape: ProgramShape, program: &Program) -> Self {
        Self {
            shape: shape.to_string(),
            length: program.encoded_len(),
            bytecode: hex::encode(program.encode()),
            input: hex::encode(program.input_stream()),
            expected: program
                .expected_outputs()
                .map(|line| String::from_utf8_lossy(line).into_owned())
                .collect(),
        }
    }
}

/// Runs `command` and returns the process exit code.
pub async fn run(command: &Command, config: &CheckerConfig) -> Result<i32> {
    match command {
        Command::Generate { shape, json } => generate(config, *shape, *json),
        Command::Simulate { shape, count } => simulate(config, *shape, *count),
        Command::Test { count } => run_tests(config, *count).await,
        Command::PlaceFlag { flag } => {
            let mut checker = Checker::from_config(config).context("failed to set up checker")?;
            report(checker.place_flag(flag).await?)
        }
        Command::CheckFlag { flag } => {
            let mut checker = Checker::from_config(config).context("failed to set up checker")?;
            report(checker.check_flag(flag).await?)
        }
        Command::CheckService => {
            let mut checker = Checker::from_config(config).context("failed to set up checker")?;
            report(checker.check_service().await?)
        }
    }
}

fn load_inputs(config: &CheckerConfig) -> Result<(OpcodeTable, Corpus)> {
    let table = OpcodeTable::load_or_bundled(config.isa.definition.as_deref())
        .context("failed to load opcode definition")?;
    let corpus = Corpus::from_config(&config.corpus).context("failed to load word list")?;
    Ok((table, corpus))
}

fn rng_for(config: &CheckerConfig) -> StdRng {
    match config.synth.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn draw(
    synth: &Synthesizer<'_>,
    shape: Option<ProgramShape>,
    rng: &mut dyn RngCore,
) -> Result<(ProgramShape, Program)> {
    let drawn = match shape {
        Some(shape) => (shape, synth.generate(shape, rng)?),
        None => synth.random_program(rng)?,
    };
    Ok(drawn)
}

fn generate(config: &CheckerConfig, shape: Option<ProgramShape>, json: bool) -> Result<i32> {
    let (table, corpus) = load_inputs(config)?;
    let synth = Synthesizer::new(&table, &corpus, config.synth.clone());
    let mut rng = rng_for(config);
    let (shape, program) = draw(&synth, shape, &mut rng)?;

    if json {
        let report = ProgramReport::new(shape, &program);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("# {} program, {} bytes", shape, program.encoded_len());
        println!("{}", program);
        println!("{}", hex::encode(program.encode()));
    }
    Ok(0)
}

fn simulate(config: &CheckerConfig, shape: Option<ProgramShape>, count: usize) -> Result<i32> {
    let (table, corpus) = load_inputs(config)?;
    let synth = Synthesizer::new(&table, &corpus, config.synth.clone());
    let mut rng = rng_for(config);
    let mut failures = 0usize;

    for index in 0..count {
        let (shape, program) = draw(&synth, shape, &mut rng)?;
        let mut sim = Simulator::new(&table, config.synth.compare_flag);
        let verdict = sim
            .run(&program.encode(), &program.input_stream())
            .map(|output| output == program.expected_stream());
        match verdict {
            Ok(true) => info!(index, %shape, "simulation matched"),
            Ok(false) => {
                failures += 1;
                warn!(index, %shape, "simulation diverged\n{}", program);
            }
            Err(e) => {
                failures += 1;
                warn!(index, %shape, "simulation fault: {}\n{}", e, program);
            }
        }
    }

    println!("{}/{} programs matched", count - failures, count);
    Ok(if failures == 0 { 0 } else { 1 })
}

async fn run_tests(config: &CheckerConfig, count: usize) -> Result<i32> {
    report(random_programs(config, count).await?)
}

/// Runs `count` random programs, stopping at the first failure. An
/// unreachable target is reported as down like the other checks.
async fn random_programs(config: &CheckerConfig, count: usize) -> Result<CheckResult> {
    if count == 0 {
        bail!("count must be at least 1");
    }
    let mut checker = Checker::from_config(config).context("failed to set up checker")?;
    for index in 0..count {
        match checker.random_test().await {
            Ok(true) => {}
            Ok(false) => {
                println!("program {} failed", index);
                return Ok(CheckResult::Faulty);
            }
            Err(e) if e.is_unreachable() => {
                warn!("Target unreachable: {}", e);
                return Ok(CheckResult::Down);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(CheckResult::Ok)
}

fn report(result: CheckResult) -> Result<i32> {
    println!("{}", result);
    Ok(if result.is_ok() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veighty_isa::InstructionBuilder;
    use veighty_isa::OpCode;

    #[test]
    fn test_program_report() {
        let table = OpcodeTable::bundled().unwrap();
        let builder = InstructionBuilder::new(&table);
        let program = Program::new(vec![
            builder.emit_push_int(12).unwrap(),
            builder.emit(OpCode::Pop).unwrap().with_output("0xc"),
        ]);
        let report = ProgramReport::new(ProgramShape::Linear, &program);
        assert_eq!(report.length, 10);
        assert_eq!(report.bytecode.len(), 20);
        assert_eq!(report.expected, vec!["0xc".to_string()]);
        assert!(report.input.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_target_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = CheckerConfig::default();
        config.target.port = port;
        config.target.connect_timeout_ms = 500;
        config.state.path = dir.path().join("state.json");
        assert_eq!(random_programs(&config, 3).await.unwrap(), CheckResult::Down);
        assert!(random_programs(&config, 0).await.is_err());
    }

    #[test]
    fn test_generate_and_simulate_with_seed() {
        let mut config = CheckerConfig::default();
        config.synth.seed = Some(42);
        assert_eq!(generate(&config, Some(ProgramShape::Branching), true).unwrap(), 0);
        assert_eq!(simulate(&config, None, 5).unwrap(), 0);
    }
}
