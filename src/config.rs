//! Tunable configuration, loaded once at service construction and
//! re-persisted through the durable-store adapter on every `set_config`.

use serde::{Deserialize, Serialize};

/// All service-wide tunables (§4.4.6). Kernel hyperparameters are captured
/// into a `BoState` at creation time and do not retroactively follow later
/// edits here — only states created afterward pick up the new values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoConfig {
    pub min_runs_threshold: usize,
    pub exploration_factor: f64,
    pub num_candidates: usize,
    pub kernel_length_scale: f64,
    pub kernel_output_scale: f64,
    pub kernel_noise: f64,
    pub max_observations: usize,
    pub number_param_padding: f64,
}

impl Default for BoConfig {
    fn default() -> Self {
        Self {
            min_runs_threshold: 5,
            exploration_factor: 2.0,
            num_candidates: 100,
            kernel_length_scale: 0.3,
            kernel_output_scale: 1.0,
            kernel_noise: 0.1,
            max_observations: 100,
            number_param_padding: 0.2,
        }
    }
}

/// A partial update applied over the current config by `set_config`. Any
/// field left `None` keeps its current value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BoConfigPatch {
    pub min_runs_threshold: Option<usize>,
    pub exploration_factor: Option<f64>,
    pub num_candidates: Option<usize>,
    pub kernel_length_scale: Option<f64>,
    pub kernel_output_scale: Option<f64>,
    pub kernel_noise: Option<f64>,
    pub max_observations: Option<usize>,
    pub number_param_padding: Option<f64>,
}

impl BoConfig {
    pub fn merged(&self, patch: &BoConfigPatch) -> Self {
        Self {
            min_runs_threshold: patch.min_runs_threshold.unwrap_or(self.min_runs_threshold),
            exploration_factor: patch.exploration_factor.unwrap_or(self.exploration_factor),
            num_candidates: patch.num_candidates.unwrap_or(self.num_candidates),
            kernel_length_scale: patch.kernel_length_scale.unwrap_or(self.kernel_length_scale),
            kernel_output_scale: patch.kernel_output_scale.unwrap_or(self.kernel_output_scale),
            kernel_noise: patch.kernel_noise.unwrap_or(self.kernel_noise),
            max_observations: patch.max_observations.unwrap_or(self.max_observations),
            number_param_padding: patch.number_param_padding.unwrap_or(self.number_param_padding),
        }
    }
}
