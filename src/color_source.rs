//! Colour providers for new pairs. The game never rolls dice itself.

use crate::board::PuyoColor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Supplies (main, sub) colours for every spawned pair.
pub trait ColorSource: fmt::Debug {
    fn next_colors(&mut self) -> (PuyoColor, PuyoColor);
}

/// Uniform random colours from a seeded StdRng.
#[derive(Debug)]
pub struct RandomColors {
    seed: u64,
    rng: StdRng,
}

impl RandomColors {
    /// Seed from `seed`, or a fresh random one.
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn roll(&mut self) -> PuyoColor {
        PuyoColor::ALL[self.rng.random_range(0..PuyoColor::ALL.len())]
    }
}

impl ColorSource for RandomColors {
    fn next_colors(&mut self) -> (PuyoColor, PuyoColor) {
        (self.roll(), self.roll())
    }
}

/// Fixed sequence of pairs, repeated forever. For reproducible scenarios.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct Scripted {
    pairs: Vec<(PuyoColor, PuyoColor)>,
    next: usize,
}

#[cfg(test)]
impl Scripted {
    pub fn new(pairs: &[(PuyoColor, PuyoColor)]) -> Self {
        assert!(!pairs.is_empty(), "scripted source needs at least one pair");
        Self {
            pairs: pairs.to_vec(),
            next: 0,
        }
    }
}

#[cfg(test)]
impl ColorSource for Scripted {
    fn next_colors(&mut self) -> (PuyoColor, PuyoColor) {
        let pair = self.pairs[self.next % self.pairs.len()];
        self.next += 1;
        pair
    }
}
