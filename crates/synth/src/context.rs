//! Shared state handed to every generator.

use crate::corpus::Corpus;
use rand::{Rng, RngCore};
use veighty_config::{FlagPolarity, SynthConfig};
use veighty_isa::{InstructionBuilder, OpcodeTable};

/// Everything a generator may draw from. Generators never see the program
/// they end up in; branch generators receive their position explicitly.
pub struct GenContext<'a> {
    builder: InstructionBuilder<'a>,
    corpus: &'a Corpus,
    rng: &'a mut dyn RngCore,
    polarity: FlagPolarity,
    padding_depth: u8,
    block_padding_percent: u8,
}

impl<'a> GenContext<'a> {
    pub fn new(
        table: &'a OpcodeTable,
        corpus: &'a Corpus,
        settings: &SynthConfig,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            builder: InstructionBuilder::new(table),
            corpus,
            rng,
            polarity: settings.compare_flag,
            padding_depth: settings.padding_depth,
            block_padding_percent: settings.block_padding_percent.min(100),
        }
    }

    pub fn builder(&self) -> InstructionBuilder<'a> {
        self.builder
    }

    pub fn corpus(&self) -> &'a Corpus {
        self.corpus
    }

    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    /// How the target maps a comparison result onto its flag.
    pub fn polarity(&self) -> FlagPolarity {
        self.polarity
    }

    /// Remaining nesting allowed for branch blocks inside padding.
    pub fn padding_depth(&self) -> u8 {
        self.padding_depth
    }

    pub fn block_padding_percent(&self) -> u8 {
        self.block_padding_percent
    }

    /// Runs `f` with the padding depth temporarily set to `depth`.
    pub fn with_padding_depth<T>(&mut self, depth: u8, f: impl FnOnce(&mut Self) -> T) -> T {
        let outer = std::mem::replace(&mut self.padding_depth, depth);
        let result = f(self);
        self.padding_depth = outer;
        result
    }

    /// Integer of a random bit width in `min_bits..=max_bits`.
    pub fn bits(&mut self, min_bits: u32, max_bits: u32) -> u64 {
        let width = self.rng.gen_range(min_bits..=max_bits).min(64);
        if width == 0 {
            return 0;
        }
        self.rng.gen::<u64>() >> (64 - width)
    }

    pub fn range(&mut self, min: usize, max: usize) -> usize {
        self.rng.gen_range(min..=max)
    }

    pub fn coin(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// Percentage roll, true with probability `percent / 100`.
    pub fn chance(&mut self, percent: u8) -> bool {
        self.rng.gen_range(0..100u8) < percent
    }

    pub fn word(&mut self) -> Vec<u8> {
        self.corpus.word(&mut *self.rng).to_vec()
    }

    /// Random lowercase ASCII letters.
    pub fn letters(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.rng.gen_range(b'a'..=b'z')).collect()
    }
}
