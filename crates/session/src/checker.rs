//! Service checks built from generated programs and storage round trips.

use crate::error::SessionResult;
use crate::session::{Connect, Session, TcpConnector};
use crate::state::StateStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use veighty_config::{CheckerConfig, SynthConfig};
use veighty_isa::{InstructionBuilder, OpcodeTable, Program};
use veighty_synth::{fetch_pair, place_pair, Corpus, Synthesizer};

/// Verdict of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckResult {
    Ok,
    /// The target answered but not as a conforming VM would.
    Faulty,
    /// A stored flag could not be read back.
    FlagNotFound,
    /// The target could not be reached.
    Down,
}

impl CheckResult {
    pub fn is_ok(self) -> bool {
        self == CheckResult::Ok
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckResult::Ok => "OK",
            CheckResult::Faulty => "FAULTY",
            CheckResult::FlagNotFound => "FLAG_NOT_FOUND",
            CheckResult::Down => "DOWN",
        };
        write!(f, "{}", name)
    }
}

/// Runs checks against one target.
pub struct Checker<C: Connect> {
    connector: C,
    table: OpcodeTable,
    corpus: Corpus,
    settings: SynthConfig,
    io_timeout: Duration,
    state: StateStore,
    rng: StdRng,
}

impl Checker<TcpConnector> {
    /// Builds a TCP checker from configuration, loading the opcode
    /// definition, the word list and the state file.
    pub fn from_config(config: &CheckerConfig) -> SessionResult<Self> {
        let table = OpcodeTable::load_or_bundled(config.isa.definition.as_deref())?;
        let corpus = Corpus::from_config(&config.corpus)?;
        let state = StateStore::open(&config.state.path)?;
        let rng = match config.synth.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::new(
            TcpConnector::from_config(&config.target),
            table,
            corpus,
            config.synth.clone(),
            Duration::from_millis(config.target.io_timeout_ms),
            state,
            rng,
        ))
    }
}

impl<C: Connect> Checker<C> {
    pub fn new(
        connector: C,
        table: OpcodeTable,
        corpus: Corpus,
        settings: SynthConfig,
        io_timeout: Duration,
        state: StateStore,
        rng: StdRng,
    ) -> Self {
        Self {
            connector,
            table,
            corpus,
            settings,
            io_timeout,
            state,
            rng,
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    async fn open(&self) -> SessionResult<Session<C::Stream>> {
        let stream = self.connector.connect().await?;
        Ok(Session::new(stream, self.io_timeout))
    }

    /// Runs `program` on a fresh connection.
    pub async fn execute(&self, program: &Program) -> SessionResult<bool> {
        let mut session = self.open().await?;
        session.run(program).await
    }

    /// Generates a random program and runs it.
    pub async fn random_test(&mut self) -> SessionResult<bool> {
        let synth = Synthesizer::new(&self.table, &self.corpus, self.settings.clone());
        let (shape, program) = synth.random_program(&mut self.rng)?;
        info!(%shape, bytes = program.encoded_len(), "executing random program");
        let matched = self.execute(&program).await?;
        if !matched {
            warn!(%shape, "random program failed\n{}", program);
        }
        Ok(matched)
    }

    /// Stores `value` under `key` on the target.
    pub async fn place(&self, key: &str, value: &str) -> SessionResult<bool> {
        info!("Placing new pair: {} = {}", key, value);
        let program = place_pair(InstructionBuilder::new(&self.table), key.as_bytes(), value.as_bytes())?;
        self.execute(&program).await
    }

    /// Reads the value stored under `key`. Returns whatever the target
    /// printed after the program was accepted.
    pub async fn fetch(&self, key: &str) -> SessionResult<Vec<u8>> {
        info!("Getting key: {}", key);
        let program = fetch_pair(InstructionBuilder::new(&self.table), key.as_bytes())?;
        let mut session = self.open().await?;
        if !session.run(&program).await? {
            return Ok(Vec::new());
        }
        session.read_remaining().await
    }

    /// Stores `flag` under its stable key.
    pub async fn place_flag(&mut self, flag: &str) -> SessionResult<CheckResult> {
        let started = Instant::now();
        let key = self.state.key_for_flag(flag, &mut self.rng)?;
        self.state.save()?;
        let result = verdict(self.place(&key, flag).await, CheckResult::Faulty)?;
        info!(%result, elapsed_ms = started.elapsed().as_millis() as u64, "place_flag finished");
        Ok(result)
    }

    /// Reads `flag` back from its stable key.
    pub async fn check_flag(&mut self, flag: &str) -> SessionResult<CheckResult> {
        let started = Instant::now();
        let key = self.state.key_for_flag(flag, &mut self.rng)?;
        self.state.save()?;
        let result = match self.fetch(&key).await {
            Ok(output) if contains(&output, flag.as_bytes()) => CheckResult::Ok,
            Ok(_) => CheckResult::FlagNotFound,
            Err(e) if e.is_unreachable() => CheckResult::Down,
            Err(e) => return Err(e),
        };
        info!(%result, elapsed_ms = started.elapsed().as_millis() as u64, "check_flag finished");
        Ok(result)
    }

    /// Random program, fresh pair stored, random program, some older pair
    /// read, random program, fresh pair read back.
    pub async fn check_service(&mut self) -> SessionResult<CheckResult> {
        let started = Instant::now();
        let result = self.service_steps().await;
        if let Ok(result) = &result {
            info!(%result, elapsed_ms = started.elapsed().as_millis() as u64, "check_service finished");
        }
        result
    }

    async fn service_steps(&mut self) -> SessionResult<CheckResult> {
        if let Some(failed) = self.random_step().await? {
            return Ok(failed);
        }

        let key = self.state.new_key(&self.corpus, &mut self.rng)?;
        let value = String::from_utf8_lossy(&self.corpus.value(&mut self.rng)).into_owned();
        self.state.save()?;
        let placed = verdict(self.place(&key, &value).await, CheckResult::Faulty)?;
        if !placed.is_ok() {
            info!("Failed to place new random key-value pair");
            return Ok(placed);
        }
        self.state.save_pair(&key, &value);
        self.state.save()?;

        if let Some(failed) = self.random_step().await? {
            return Ok(failed);
        }

        // Older pairs may be gone already; only reachability counts here.
        if let Some(other) = self.state.random_pair(&mut self.rng) {
            info!("Trying to retrieve value for {:?}: {:?}", other.key, other.value);
            match self.fetch(&other.key).await {
                Ok(_) => {}
                Err(e) if e.is_unreachable() => return Ok(CheckResult::Down),
                Err(e) => return Err(e),
            }
        }

        if let Some(failed) = self.random_step().await? {
            return Ok(failed);
        }

        info!("Trying to retrieve value for previous {:?}: {:?}", key, value);
        match self.fetch(&key).await {
            Ok(output) if contains(&output, value.as_bytes()) => Ok(CheckResult::Ok),
            Ok(_) => Ok(CheckResult::Faulty),
            Err(e) if e.is_unreachable() => Ok(CheckResult::Down),
            Err(e) => Err(e),
        }
    }

    /// Runs one random program; `Some` carries the verdict when it failed.
    async fn random_step(&mut self) -> SessionResult<Option<CheckResult>> {
        let result = verdict(self.random_test().await, CheckResult::Faulty)?;
        Ok((!result.is_ok()).then_some(result))
    }
}

/// Maps a program outcome onto a verdict.
fn verdict(outcome: SessionResult<bool>, failure: CheckResult) -> SessionResult<CheckResult> {
    match outcome {
        Ok(true) => Ok(CheckResult::Ok),
        Ok(false) => Ok(failure),
        Err(e) if e.is_unreachable() => Ok(CheckResult::Down),
        Err(e) => Err(e),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    veighty_synth::simulator::contains(haystack, needle)
}
