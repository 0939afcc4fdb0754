//! Upper-Confidence-Bound acquisition.
//!
//! Scoring is a pure function of parallel mean/variance arrays; candidate
//! generation is a separate concern that takes an injected RNG so tests can
//! seed it deterministically (see `rng::CandidateRng`).

use crate::error::{BoError, Result};
use crate::rng::CandidateRng;

/// `UCB(x) = mean(x) + beta * sqrt(max(0, variance(x)))`.
pub fn ucb_score(mean: f64, variance: f64, exploration_factor: f64) -> f64 {
    mean + exploration_factor * variance.max(0.0).sqrt()
}

/// Index of the highest-UCB candidate. Ties favor the lowest index.
pub fn arg_max_ucb(means: &[f64], variances: &[f64], exploration_factor: f64) -> Result<usize> {
    if means.is_empty() || variances.is_empty() {
        return Err(BoError::invalid_input("cannot score an empty candidate set"));
    }
    if means.len() != variances.len() {
        return Err(BoError::invalid_input(format!(
            "mean/variance length mismatch: {} vs {}",
            means.len(),
            variances.len()
        )));
    }

    let mut best_idx = 0;
    let mut best_score = ucb_score(means[0], variances[0], exploration_factor);
    for i in 1..means.len() {
        let score = ucb_score(means[i], variances[i], exploration_factor);
        if score > best_score {
            best_score = score;
            best_idx = i;
        }
    }
    Ok(best_idx)
}

/// Draw `n` points uniformly from `[0,1]^dim` using the injected PRNG.
pub fn random_candidates(rng: &mut dyn CandidateRng, n: usize, dim: usize) -> Vec<Vec<f64>> {
    (0..n).map(|_| rng.uniform_vector(dim)).collect()
}
