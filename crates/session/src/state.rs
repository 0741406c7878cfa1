//! Persistent checker state.
//!
//! Flags are stored under numeric keys that stay stable across ticks, random
//! pairs under word-plus-number keys that are never reused, and the most
//! recent pairs are remembered so later checks can read them back.

use crate::error::{SessionError, SessionResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use veighty_config::SAVED_PAIRS_LIMIT;
use veighty_synth::storage::validate_key;
use veighty_synth::Corpus;

/// Flag keys are drawn from `FLAG_KEY_MIN..FLAG_KEY_MAX` (11 digits).
const FLAG_KEY_MIN: u64 = 10_000_000_000;
const FLAG_KEY_MAX: u64 = 100_000_000_000;

/// Numeric suffix range of pair keys.
const PAIR_SUFFIX_MIN: u32 = 1_000;
const PAIR_SUFFIX_MAX: u32 = 1_000_000;

/// Longest pair key.
pub const MAX_PAIR_KEY_LEN: usize = 24;

/// Draws attempted before giving up on finding a fresh key.
const MAX_KEY_ATTEMPTS: usize = 10_000;

/// A stored key/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPair {
    pub key: String,
    pub value: String,
}

/// Serialized form of the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerState {
    pub flag_keys: BTreeMap<String, String>,
    pub used_keys: Vec<String>,
    /// Newest first.
    pub saved_pairs: Vec<SavedPair>,
}

/// State backed by a JSON file, or memory only when no path is given.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    path: Option<PathBuf>,
    state: CheckerState,
}

impl StateStore {
    /// Opens the state file at `path`, starting empty if it does not exist.
    pub fn open(path: &Path) -> SessionResult<Self> {
        let state = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| SessionError::StateFormat {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckerState::default(),
            Err(source) => {
                return Err(SessionError::State {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            state,
        })
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CheckerState {
        &self.state
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the state next to its final location and renames it into place.
    pub fn save(&self) -> SessionResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&self.state).map_err(|source| SessionError::StateFormat {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("tmp");
        let io_err = |source| SessionError::State {
            path: path.clone(),
            source,
        };
        std::fs::write(&tmp, content).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        debug!(path = %path.display(), "state saved");
        Ok(())
    }

    /// Key a flag is stored under. New flags get a fresh 11-digit key that
    /// no other flag uses.
    pub fn key_for_flag<R: Rng + ?Sized>(&mut self, flag: &str, rng: &mut R) -> SessionResult<String> {
        if let Some(key) = self.state.flag_keys.get(flag) {
            return Ok(key.clone());
        }
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = rng.gen_range(FLAG_KEY_MIN..FLAG_KEY_MAX).to_string();
            if !self.state.flag_keys.values().any(|used| *used == key) {
                self.state.flag_keys.insert(flag.to_string(), key.clone());
                return Ok(key);
            }
        }
        Err(SessionError::KeysExhausted {
            attempts: MAX_KEY_ATTEMPTS,
        })
    }

    /// Fresh pair key: a corpus word followed by a number, at most
    /// [`MAX_PAIR_KEY_LEN`] characters, never handed out before.
    pub fn new_key<R: Rng + ?Sized>(&mut self, corpus: &Corpus, rng: &mut R) -> SessionResult<String> {
        for _ in 0..MAX_KEY_ATTEMPTS {
            let word = String::from_utf8_lossy(corpus.word(rng)).into_owned();
            let key = format!("{}{}", word, rng.gen_range(PAIR_SUFFIX_MIN..PAIR_SUFFIX_MAX));
            if key.len() <= MAX_PAIR_KEY_LEN
                && validate_key(key.as_bytes()).is_ok()
                && !self.state.used_keys.contains(&key)
            {
                self.state.used_keys.push(key.clone());
                return Ok(key);
            }
        }
        Err(SessionError::KeysExhausted {
            attempts: MAX_KEY_ATTEMPTS,
        })
    }

    /// Remembers a pair, keeping only the most recent ones.
    pub fn save_pair(&mut self, key: &str, value: &str) {
        self.state.saved_pairs.insert(
            0,
            SavedPair {
                key: key.to_string(),
                value: value.to_string(),
            },
        );
        self.state.saved_pairs.truncate(SAVED_PAIRS_LIMIT);
    }

    /// Uniformly chosen remembered pair.
    pub fn random_pair<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<SavedPair> {
        if self.state.saved_pairs.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.state.saved_pairs.len());
        self.state.saved_pairs.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_flag_keys_are_stable_and_unique() {
        let mut store = StateStore::in_memory();
        let mut rng = StdRng::seed_from_u64(1);
        let a = store.key_for_flag("FLAG_A", &mut rng).unwrap();
        let b = store.key_for_flag("FLAG_B", &mut rng).unwrap();
        assert_eq!(a.len(), 11);
        assert_ne!(a, b);
        assert_eq!(store.key_for_flag("FLAG_A", &mut rng).unwrap(), a);
    }

    #[test]
    fn test_new_keys() {
        let corpus = Corpus::bundled().unwrap();
        let mut store = StateStore::in_memory();
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let key = store.new_key(&corpus, &mut rng).unwrap();
            assert!(key.len() <= MAX_PAIR_KEY_LEN);
            assert!(key.bytes().all(|b| b.is_ascii_alphanumeric()));
            assert!(seen.insert(key));
        }
        assert_eq!(store.state().used_keys.len(), 100);
    }

    #[test]
    fn test_saved_pairs_are_bounded() {
        let mut store = StateStore::in_memory();
        for i in 0..15 {
            store.save_pair(&format!("k{i}"), "v");
        }
        assert_eq!(store.state().saved_pairs.len(), SAVED_PAIRS_LIMIT);
        assert_eq!(store.state().saved_pairs[0].key, "k14");
        let mut rng = StdRng::seed_from_u64(3);
        assert!(store.random_pair(&mut rng).is_some());
        assert!(StateStore::in_memory().random_pair(&mut rng).is_none());
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut rng = StdRng::seed_from_u64(4);

        let mut store = StateStore::open(&path).unwrap();
        let key = store.key_for_flag("FLAG", &mut rng).unwrap();
        store.save_pair("lighthouse1234", "value");
        store.save().unwrap();

        let reopened = StateStore::open(&path).unwrap();
        assert_eq!(reopened.state(), store.state());
        assert_eq!(reopened.state().flag_keys.get("FLAG"), Some(&key));
    }

    #[test]
    fn test_malformed_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            StateStore::open(&path),
            Err(SessionError::StateFormat { .. })
        ));
    }
}
