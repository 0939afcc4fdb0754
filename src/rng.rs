//! Injectable PRNG for candidate generation.
//!
//! Acquisition needs uniform draws from `[0,1]^D`; the service needs a PRNG
//! it can seed deterministically for tests. `CandidateRng` is the seam;
//! `StdCandidateRng` wraps `rand::rngs::StdRng` the same way the teacher's
//! sample generator seeds an `StdRng` from a config-provided seed.

use rand::prelude::*;
use rand::rngs::StdRng;

/// A source of uniform `[0,1]` draws, abstracted so callers can inject a
/// deterministically-seeded implementation in tests.
pub trait CandidateRng {
    fn uniform(&mut self) -> f64;

    fn uniform_vector(&mut self, dim: usize) -> Vec<f64> {
        (0..dim).map(|_| self.uniform()).collect()
    }
}

/// Default PRNG backed by `rand::rngs::StdRng`.
pub struct StdCandidateRng {
    rng: StdRng,
}

impl StdCandidateRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl CandidateRng for StdCandidateRng {
    fn uniform(&mut self) -> f64 {
        self.rng.gen_range(0.0..=1.0)
    }
}
