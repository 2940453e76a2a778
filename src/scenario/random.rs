//! Uniform random draws for the Monte Carlo sampler

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 1)`
///
/// The sampler pulls every draw through this trait, so tests can feed a
/// fixed sequence and callers can pick their own generator.
pub trait RandomSource {
    fn next_uniform(&mut self) -> f64;
}

/// `StdRng` with the seed kept for reporting
#[derive(Debug, Clone)]
pub struct SeededSource {
    inner: StdRng,
    seed: u64,
}

impl SeededSource {
    /// Reproducible source: the same seed yields the same draws
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Source seeded from the thread generator
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededSource {
    #[inline]
    fn next_uniform(&mut self) -> f64 {
        self.inner.gen()
    }
}
