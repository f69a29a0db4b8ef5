use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of randomness for the ledger: the bonus coupon draw and coupon
/// code characters. Swapped out in tests to force either branch.
pub trait RandomSource: Send + Sync {
    /// Uniform sample in `[0, 1)`.
    fn unit(&self) -> f64;

    /// Uniform index in `[0, bound)`. `bound` is never zero.
    fn index(&self, bound: usize) -> usize;
}

/// Thread-local OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn unit(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }

    fn index(&self, bound: usize) -> usize {
        rand::thread_rng().gen_range(0..bound)
    }
}

/// Reproducible generator for replays and tests.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn unit(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0.0..1.0)
    }

    fn index(&self, bound: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..bound)
    }
}

/// Always returns the same draw. Indices come from a fixed-seed generator
/// so coupon codes stay distinct and reproducible.
#[derive(Debug)]
pub struct FixedRandom {
    draw: f64,
    indices: SeededRandom,
}

impl FixedRandom {
    pub fn new(draw: f64) -> Self {
        Self {
            draw,
            indices: SeededRandom::new(0),
        }
    }

    /// A draw that passes any positive issue probability.
    pub fn always() -> Self {
        Self::new(0.0)
    }

    /// A draw that fails every issue probability up to 1.0.
    pub fn never() -> Self {
        Self::new(1.0)
    }
}

impl RandomSource for FixedRandom {
    fn unit(&self) -> f64 {
        self.draw
    }

    fn index(&self, bound: usize) -> usize {
        self.indices.index(bound)
    }
}
