//! The BO service (C4): per-pair lifecycle, encoding/decoding, suggestion
//! assembly, prediction curves, and configuration management.
//!
//! This is the orchestration layer in the same spirit as the teacher's
//! `app::pipeline::run_fit` — a stateless-ish function gluing the narrower
//! pieces together (load -> fit -> select -> report) -- except here it is
//! generalized into a struct holding the collaborators §6 calls for
//! (durable store, machine schema source, run history source) plus the
//! injected PRNG and clock seams, so the service itself never reaches for
//! ambient state.

pub mod encoding;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::acquisition::{arg_max_ucb, random_candidates};
use crate::clock::Clock;
use crate::config::{BoConfig, BoConfigPatch};
use crate::diagnostics::Diagnostics;
use crate::domain::{
    BoState, GpHyperparams, MachineSchema, Observation, ParamKind, ParamSchema, ParamValue, PredictionCurve,
    PredictionCurveOptions, Run, Suggestion, SUGGESTION_RATING_LABEL,
};
use crate::error::{BoError, Result};
use crate::gp::GaussianProcess;
use crate::kernel::RbfKernel;
use crate::rng::CandidateRng;
use crate::store::{state_key, DurableStore, MachineSchemaSource, RunHistorySource};

use encoding::{decode_rating_mean, decode_rating_std, decode_value, encode_rating, encode_value, numeric_history};

/// Outcome of `initialize_optimizer`: whether a state was actually written.
/// A machine with no optimizable parameters is a legitimate, non-error case
/// (§4.4.3) -- it just never gets a BO state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized,
    NotInitialized,
}

/// The BO service, generic over its injected collaborators so callers can
/// swap in real adapters (a database-backed store, an HTTP machine lookup)
/// without this crate depending on any of them directly.
pub struct BoService<Store, Mach, Hist, Rng, Clk, Diag>
where
    Store: DurableStore,
    Mach: MachineSchemaSource,
    Hist: RunHistorySource,
    Rng: CandidateRng,
    Clk: Clock,
    Diag: Diagnostics,
{
    store: Store,
    machines: Mach,
    runs: Hist,
    rng: Mutex<Rng>,
    clock: Clk,
    diagnostics: Diag,
    config: Mutex<BoConfig>,
}

impl<Store, Mach, Hist, Rng, Clk, Diag> BoService<Store, Mach, Hist, Rng, Clk, Diag>
where
    Store: DurableStore,
    Mach: MachineSchemaSource,
    Hist: RunHistorySource,
    Rng: CandidateRng,
    Clk: Clock,
    Diag: Diagnostics,
{
    /// Construct the service, loading any previously persisted config (or
    /// falling back to `BoConfig::default()`).
    pub fn new(store: Store, machines: Mach, runs: Hist, rng: Rng, clock: Clk, diagnostics: Diag) -> Result<Self> {
        let config = store.load_config()?.unwrap_or_default();
        Ok(Self {
            store,
            machines,
            runs,
            rng: Mutex::new(rng),
            clock,
            diagnostics,
            config: Mutex::new(config),
        })
    }

    /// A snapshot of the current configuration.
    pub fn get_config(&self) -> BoConfig {
        *self.config.lock().expect("config lock poisoned")
    }

    /// Merge `patch` over the current config and durably persist the result.
    pub fn set_config(&self, patch: BoConfigPatch) -> Result<BoConfig> {
        let mut guard = self.config.lock().expect("config lock poisoned");
        let merged = guard.merged(&patch);
        self.store.save_config(merged)?;
        *guard = merged;
        Ok(merged)
    }

    /// Write a fresh, empty BO state for `(bean_id, machine_id)`, capturing
    /// the machine's current optimizable-parameter metadata and the
    /// currently-configured kernel hyperparameters. Overwrites any existing
    /// state for the key. No-ops (without writing) if the machine has no
    /// optimizable parameters.
    pub fn initialize_optimizer(&self, bean_id: &str, machine_id: &str) -> Result<InitOutcome> {
        let machine = self
            .machines
            .get_machine(machine_id)?
            .ok_or_else(|| BoError::state(format!("machine {machine_id} does not exist")))?;

        let metadata = machine.optimizable_subset();
        if metadata.is_empty() {
            return Ok(InitOutcome::NotInitialized);
        }

        let config = self.get_config();
        let state = BoState {
            bean_id: bean_id.to_string(),
            machine_id: machine_id.to_string(),
            parameter_metadata: metadata,
            observations: Vec::new(),
            gp_hyperparameters: GpHyperparams {
                length_scale: config.kernel_length_scale,
                output_scale: config.kernel_output_scale,
                noise: config.kernel_noise,
            },
            last_updated: self.clock.now(),
        };
        self.store.upsert_one(&state_key(bean_id, machine_id), state)?;
        Ok(InitOutcome::Initialized)
    }

    /// Ingest a rated run, lazily creating the optimizer if none exists yet.
    /// No-ops (without error) on an unrated run, on a machine with no
    /// optimizable parameters, or on a run missing a value for one of the
    /// state's optimizable parameters (logged in the last case).
    pub fn update_with_run(&self, bean_id: &str, machine_id: &str, run: &Run) -> Result<()> {
        let Some(rating) = run.rating else {
            return Ok(());
        };
        if !(1..=10).contains(&rating) {
            self.diagnostics
                .log(&format!("updateWithRun: rating {rating} out of range [1,10], ignoring run"));
            return Ok(());
        }

        let key = state_key(bean_id, machine_id);
        let mut state = match self.store.load_one(&key)? {
            Some(state) => state,
            None => match self.initialize_optimizer(bean_id, machine_id)? {
                InitOutcome::NotInitialized => return Ok(()),
                InitOutcome::Initialized => self
                    .store
                    .load_one(&key)?
                    .ok_or_else(|| BoError::state("optimizer state vanished immediately after initialization"))?,
            },
        };

        let config = self.get_config();
        let mut normalized = Vec::with_capacity(state.dim());
        let mut raw_values = HashMap::with_capacity(state.dim());
        for schema in &state.parameter_metadata {
            let Some(value) = run.values.get(schema.id()) else {
                self.diagnostics.log(&format!(
                    "updateWithRun: run for {bean_id}/{machine_id} is missing a value for {}, rejecting",
                    schema.id()
                ));
                return Ok(());
            };
            let history = numeric_history(&state.observations, schema.id());
            let u = encode_value(schema, value, &history, config.number_param_padding)?;
            normalized.push(u);
            raw_values.insert(schema.id().to_string(), value.clone());
        }

        state.observations.push(Observation {
            normalized,
            raw_values,
            rating_normalized: encode_rating(rating),
        });
        if state.observations.len() > config.max_observations {
            let overflow = state.observations.len() - config.max_observations;
            state.observations.drain(0..overflow);
        }
        state.last_updated = self.clock.now();

        self.store.upsert_one(&key, state)?;
        Ok(())
    }

    /// True iff a state exists for the pair and holds at least
    /// `min_runs_threshold` observations.
    pub fn is_ready(&self, bean_id: &str, machine_id: &str) -> Result<bool> {
        let threshold = self.get_config().min_runs_threshold;
        let count = self.get_observation_count(bean_id, machine_id)?;
        Ok(count >= threshold)
    }

    /// `0` if no state exists for the pair; otherwise its observation count.
    pub fn get_observation_count(&self, bean_id: &str, machine_id: &str) -> Result<usize> {
        let state = self.store.load_one(&state_key(bean_id, machine_id))?;
        Ok(state.map(|s| s.observations.len()).unwrap_or(0))
    }

    /// Remove the state for `(bean_id, machine_id)`. Idempotent. Best-effort
    /// per §7: a storage failure is logged but never surfaced, so a caller's
    /// outer delete always succeeds.
    pub fn clear_optimizer(&self, bean_id: &str, machine_id: &str) {
        if let Err(e) = self.store.remove_one(&state_key(bean_id, machine_id)) {
            self.diagnostics.log(&format!("clearOptimizer({bean_id}, {machine_id}): {e}"));
        }
    }

    /// Remove the state for every pair whose machine is `machine_id`
    /// (schema-change cascade). Best-effort, same as `clear_optimizer`.
    pub fn clear_optimizers_for_machine(&self, machine_id: &str) {
        let states = match self.store.load_all() {
            Ok(states) => states,
            Err(e) => {
                self.diagnostics.log(&format!("clearOptimizersForMachine({machine_id}): {e}"));
                return;
            }
        };
        for (key, state) in states {
            if state.machine_id == machine_id {
                if let Err(e) = self.store.remove_one(&key) {
                    self.diagnostics.log(&format!("clearOptimizersForMachine({machine_id}): {e}"));
                }
            }
        }
    }

    /// Remove the state for every pair whose bean is `bean_id` (bean-delete
    /// cascade, invariant 5 of §3). Best-effort, same as `clear_optimizer`.
    pub fn clear_optimizers_for_bean(&self, bean_id: &str) {
        let states = match self.store.load_all() {
            Ok(states) => states,
            Err(e) => {
                self.diagnostics.log(&format!("clearOptimizersForBean({bean_id}): {e}"));
                return;
            }
        };
        for (key, state) in states {
            if state.bean_id == bean_id {
                if let Err(e) = self.store.remove_one(&key) {
                    self.diagnostics.log(&format!("clearOptimizersForBean({bean_id}): {e}"));
                }
            }
        }
    }

    /// Clear and rebuild a pair's state from its remaining rated-run
    /// history, e.g. after a run was deleted upstream. A no-op if the
    /// machine has no optimizable parameters, mirroring `update_with_run`'s
    /// lazy-init contract.
    pub fn rebuild_from_history(&self, bean_id: &str, machine_id: &str) -> Result<()> {
        self.clear_optimizer(bean_id, machine_id);
        for run in self.runs.rated_runs_for(bean_id, machine_id)? {
            self.update_with_run(bean_id, machine_id, &run)?;
        }
        Ok(())
    }

    /// Fit a GP on all observations, draw `num_candidates` random points,
    /// score them by UCB, and decode the winner into a `Suggestion`. Returns
    /// `None` if no state exists, no observations exist yet, or any internal
    /// step fails (logged per §7's read-tolerant propagation policy).
    pub fn suggest_parameters(&self, bean_id: &str, machine_id: &str) -> Option<Suggestion> {
        match self.try_suggest_parameters(bean_id, machine_id) {
            Ok(suggestion) => suggestion,
            Err(e) => {
                self.diagnostics
                    .log(&format!("suggestParameters({bean_id}, {machine_id}): {e}"));
                None
            }
        }
    }

    fn try_suggest_parameters(&self, bean_id: &str, machine_id: &str) -> Result<Option<Suggestion>> {
        let Some(state) = self.store.load_one(&state_key(bean_id, machine_id))? else {
            return Ok(None);
        };
        if state.observations.is_empty() {
            return Ok(None);
        }
        let machine = self
            .machines
            .get_machine(machine_id)?
            .ok_or_else(|| BoError::state(format!("machine {machine_id} does not exist")))?;

        let config = self.get_config();
        let gp = self.fit_gp(&state)?;

        let candidates = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            random_candidates(&mut *rng, config.num_candidates, state.dim())
        };
        let (means, variances) = gp.predict(&candidates)?;
        let best = arg_max_ucb(&means, &variances, config.exploration_factor)?;
        let winner = &candidates[best];

        let mut values = HashMap::with_capacity(machine.parameters.len());
        for (i, schema) in state.parameter_metadata.iter().enumerate() {
            let history = numeric_history(&state.observations, schema.id());
            let decoded = decode_value(schema, winner[i], &history, config.number_param_padding);
            values.insert(schema.id().to_string(), decoded);
        }
        for param in &machine.parameters {
            if param.kind() == ParamKind::FreeText {
                values.insert(param.id().to_string(), ParamValue::Text(String::new()));
            }
        }

        Ok(Some(Suggestion {
            bean_id: bean_id.to_string(),
            machine_id: machine_id.to_string(),
            values,
            rating: SUGGESTION_RATING_LABEL.to_string(),
            is_suggestion: true,
            expected_rating: decode_rating_mean(means[best]),
            expected_std_dev: decode_rating_std(variances[best].max(0.0).sqrt()),
        }))
    }

    /// Extract a 1-D conditional slice of the GP surface for
    /// `parameter_metadata[param_index]`, with every other optimizable
    /// dimension fixed at `opts.fixed_values`. Returns `None` if no state or
    /// no observations exist, or on any internal failure (logged).
    pub fn get_prediction_curve(
        &self,
        bean_id: &str,
        machine_id: &str,
        param_index: usize,
        opts: &PredictionCurveOptions,
    ) -> Option<PredictionCurve> {
        match self.try_prediction_curve(bean_id, machine_id, param_index, opts) {
            Ok(curve) => curve,
            Err(e) => {
                self.diagnostics
                    .log(&format!("getPredictionCurve({bean_id}, {machine_id}, {param_index}): {e}"));
                None
            }
        }
    }

    fn try_prediction_curve(
        &self,
        bean_id: &str,
        machine_id: &str,
        param_index: usize,
        opts: &PredictionCurveOptions,
    ) -> Result<Option<PredictionCurve>> {
        let Some(state) = self.store.load_one(&state_key(bean_id, machine_id))? else {
            return Ok(None);
        };
        if state.observations.is_empty() {
            return Ok(None);
        }
        if param_index >= state.dim() {
            return Err(BoError::invalid_input(format!(
                "paramIndex {param_index} out of range for dimension {}",
                state.dim()
            )));
        }

        let config = self.get_config();
        let num_points = opts.num_points.unwrap_or(50).max(1);
        let samples: Vec<f64> = if num_points == 1 {
            vec![0.0]
        } else {
            (0..num_points).map(|k| k as f64 / (num_points - 1) as f64).collect()
        };

        let mut test_points = Vec::with_capacity(samples.len());
        for &u in &samples {
            let mut point = Vec::with_capacity(state.dim());
            for (j, schema) in state.parameter_metadata.iter().enumerate() {
                if j == param_index {
                    point.push(u);
                    continue;
                }
                let raw = opts.fixed_values.get(schema.id()).ok_or_else(|| {
                    BoError::invalid_input(format!("getPredictionCurve: missing fixedValues entry for {}", schema.id()))
                })?;
                let history = numeric_history(&state.observations, schema.id());
                point.push(encode_value(schema, raw, &history, config.number_param_padding)?);
            }
            test_points.push(point);
        }

        let gp = self.fit_gp(&state)?;
        let (means, variances) = gp.predict(&test_points)?;

        let target = &state.parameter_metadata[param_index];
        let target_history = numeric_history(&state.observations, target.id());
        let param_values: Vec<ParamValue> = samples
            .iter()
            .map(|&u| decode_value(target, u, &target_history, config.number_param_padding))
            .collect();
        let ratings: Vec<f64> = means.iter().map(|m| decode_rating_mean(*m)).collect();
        let std_devs: Vec<f64> = variances
            .iter()
            .map(|v| decode_rating_std(v.max(0.0).sqrt()))
            .collect();

        let valid_indices = ordinal_valid_indices(target, &samples);

        Ok(Some(PredictionCurve {
            param_values,
            ratings,
            std_devs,
            valid_indices,
        }))
    }

    fn fit_gp(&self, state: &BoState) -> Result<GaussianProcess> {
        let kernel = RbfKernel::new(state.gp_hyperparameters.length_scale, state.gp_hyperparameters.output_scale);
        let x: Vec<Vec<f64>> = state.observations.iter().map(|o| o.normalized.clone()).collect();
        let y: Vec<f64> = state.observations.iter().map(|o| o.rating_normalized).collect();
        GaussianProcess::fit(kernel, state.gp_hyperparameters.noise, &x, &y)
    }
}

/// For an ordinal target parameter, the sample index closest to each
/// option's canonical normalized value; `None` for every other kind.
fn ordinal_valid_indices(schema: &ParamSchema, samples: &[f64]) -> Option<Vec<usize>> {
    let ParamSchema::Ordinal { options, .. } = schema else {
        return None;
    };
    let last = (options.len().saturating_sub(1)) as f64;
    Some(
        options
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let canonical = if options.len() <= 1 { 0.0 } else { i as f64 / last };
                samples
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| {
                        (**a - canonical)
                            .abs()
                            .partial_cmp(&(**b - canonical).abs())
                            .expect("samples are never NaN")
                    })
                    .map(|(idx, _)| idx)
                    .unwrap_or(0)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::rng::StdCandidateRng;
    use crate::store::InMemoryStore;

    struct FixedMachines(MachineSchema);

    impl MachineSchemaSource for FixedMachines {
        fn get_machine(&self, machine_id: &str) -> Result<Option<MachineSchema>> {
            if machine_id == self.0.machine_id {
                Ok(Some(self.0.clone()))
            } else {
                Ok(None)
            }
        }
    }

    struct NoHistory;

    impl RunHistorySource for NoHistory {
        fn rated_runs_for(&self, _bean_id: &str, _machine_id: &str) -> Result<Vec<Run>> {
            Ok(vec![])
        }
    }

    struct FixedHistory(Vec<Run>);

    impl RunHistorySource for FixedHistory {
        fn rated_runs_for(&self, bean_id: &str, machine_id: &str) -> Result<Vec<Run>> {
            Ok(self
                .0
                .iter()
                .filter(|r| r.bean_id == bean_id && r.machine_id == machine_id)
                .cloned()
                .collect())
        }
    }

    fn bounded_machine() -> MachineSchema {
        MachineSchema {
            machine_id: "m1".to_string(),
            parameters: vec![ParamSchema::BoundedContinuous {
                id: "g".to_string(),
                name: "Grind".to_string(),
                min: 0.0,
                max: 10.0,
                step: 1.0,
                default: None,
            }],
        }
    }

    fn run_with_g(g: f64, rating: Option<u8>) -> Run {
        let mut values = HashMap::new();
        values.insert("g".to_string(), ParamValue::Number(g));
        Run {
            bean_id: "b1".to_string(),
            machine_id: "m1".to_string(),
            values,
            rating,
        }
    }

    fn service(
        machine: MachineSchema,
    ) -> BoService<InMemoryStore, FixedMachines, NoHistory, StdCandidateRng, crate::clock::SystemClock, RecordingDiagnostics>
    {
        service_seeded(machine, 42)
    }

    fn service_seeded(
        machine: MachineSchema,
        seed: u64,
    ) -> BoService<InMemoryStore, FixedMachines, NoHistory, StdCandidateRng, crate::clock::SystemClock, RecordingDiagnostics>
    {
        BoService::new(
            InMemoryStore::new(),
            FixedMachines(machine),
            NoHistory,
            StdCandidateRng::from_seed(seed),
            crate::clock::SystemClock,
            RecordingDiagnostics::default(),
        )
        .unwrap()
    }

    fn service_with_history(
        machine: MachineSchema,
        runs: Vec<Run>,
    ) -> BoService<InMemoryStore, FixedMachines, FixedHistory, StdCandidateRng, crate::clock::SystemClock, RecordingDiagnostics>
    {
        BoService::new(
            InMemoryStore::new(),
            FixedMachines(machine),
            FixedHistory(runs),
            StdCandidateRng::from_seed(42),
            crate::clock::SystemClock,
            RecordingDiagnostics::default(),
        )
        .unwrap()
    }

    fn ordinal_machine() -> MachineSchema {
        MachineSchema {
            machine_id: "m1".to_string(),
            parameters: vec![ParamSchema::Ordinal {
                id: "coarseness".to_string(),
                name: "Coarseness".to_string(),
                options: vec!["Fine".to_string(), "Medium".to_string(), "Coarse".to_string()],
                default: None,
            }],
        }
    }

    fn run_with_ordinal(option: &str, rating: Option<u8>) -> Run {
        let mut values = HashMap::new();
        values.insert("coarseness".to_string(), ParamValue::Option(option.to_string()));
        Run {
            bean_id: "b1".to_string(),
            machine_id: "m1".to_string(),
            values,
            rating,
        }
    }

    fn unbounded_machine() -> MachineSchema {
        MachineSchema {
            machine_id: "m1".to_string(),
            parameters: vec![ParamSchema::UnboundedContinuous {
                id: "t".to_string(),
                name: "Temperature".to_string(),
                default: None,
            }],
        }
    }

    fn run_with_t(t: f64, rating: Option<u8>) -> Run {
        let mut values = HashMap::new();
        values.insert("t".to_string(), ParamValue::Number(t));
        Run {
            bean_id: "b1".to_string(),
            machine_id: "m1".to_string(),
            values,
            rating,
        }
    }

    #[test]
    fn initialize_on_machine_without_optimizable_params_is_not_initialized() {
        let machine = MachineSchema {
            machine_id: "m1".to_string(),
            parameters: vec![ParamSchema::FreeText {
                id: "notes".to_string(),
                name: "Notes".to_string(),
                default: None,
            }],
        };
        let svc = service(machine);
        let outcome = svc.initialize_optimizer("b1", "m1").unwrap();
        assert_eq!(outcome, InitOutcome::NotInitialized);
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 0);
    }

    #[test]
    fn machine_without_optimizable_params_no_ops_update_and_suggest() {
        let machine = MachineSchema {
            machine_id: "m1".to_string(),
            parameters: vec![ParamSchema::FreeText {
                id: "notes".to_string(),
                name: "Notes".to_string(),
                default: None,
            }],
        };
        let svc = service(machine);

        let mut values = HashMap::new();
        values.insert("notes".to_string(), ParamValue::Text("tastes great".to_string()));
        let run = Run {
            bean_id: "b1".to_string(),
            machine_id: "m1".to_string(),
            values,
            rating: Some(8),
        };

        svc.update_with_run("b1", "m1", &run).unwrap();
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 0);
        assert!(svc.suggest_parameters("b1", "m1").is_none());
    }

    #[test]
    fn update_with_run_is_noop_on_unrated_run() {
        let svc = service(bounded_machine());
        svc.update_with_run("b1", "m1", &run_with_g(5.0, None)).unwrap();
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 0);
    }

    #[test]
    fn update_with_run_lazily_initializes_and_appends() {
        let svc = service(bounded_machine());
        svc.update_with_run("b1", "m1", &run_with_g(5.0, Some(7))).unwrap();
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 1);
    }

    #[test]
    fn max_observations_tail_cap_is_enforced() {
        let svc = service(bounded_machine());
        let mut patch = BoConfigPatch::default();
        patch.max_observations = Some(3);
        svc.set_config(patch).unwrap();

        for (g, r) in [(0.0, 2), (2.0, 4), (5.0, 7), (8.0, 9), (10.0, 6)] {
            svc.update_with_run("b1", "m1", &run_with_g(g, Some(r))).unwrap();
        }
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 3);
    }

    #[test]
    fn is_ready_transitions_at_threshold() {
        let svc = service(bounded_machine());
        let mut patch = BoConfigPatch::default();
        patch.min_runs_threshold = Some(2);
        svc.set_config(patch).unwrap();

        svc.update_with_run("b1", "m1", &run_with_g(1.0, Some(5))).unwrap();
        assert!(!svc.is_ready("b1", "m1").unwrap());
        svc.update_with_run("b1", "m1", &run_with_g(2.0, Some(6))).unwrap();
        assert!(svc.is_ready("b1", "m1").unwrap());
    }

    #[test]
    fn clear_optimizer_is_idempotent() {
        let svc = service(bounded_machine());
        svc.update_with_run("b1", "m1", &run_with_g(5.0, Some(7))).unwrap();
        svc.clear_optimizer("b1", "m1");
        svc.clear_optimizer("b1", "m1");
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 0);
    }

    #[test]
    fn missing_parameter_value_rejects_without_state_change() {
        let svc = service(bounded_machine());
        let run = Run {
            bean_id: "b1".to_string(),
            machine_id: "m1".to_string(),
            values: HashMap::new(),
            rating: Some(7),
        };
        svc.update_with_run("b1", "m1", &run).unwrap();
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 0);
    }

    #[test]
    fn suggest_parameters_is_none_without_observations() {
        let svc = service(bounded_machine());
        assert!(svc.suggest_parameters("b1", "m1").is_none());
    }

    #[test]
    fn suggest_parameters_returns_suggestion_for_single_observation() {
        let svc = service(bounded_machine());
        svc.update_with_run("b1", "m1", &run_with_g(5.0, Some(7))).unwrap();
        let suggestion = svc.suggest_parameters("b1", "m1").expect("suggestion");
        assert!(suggestion.is_suggestion);
        assert_eq!(suggestion.rating, SUGGESTION_RATING_LABEL);
        assert!(suggestion.values.contains_key("g"));
    }

    #[test]
    fn clear_optimizers_for_machine_removes_matching_pairs_only() {
        let svc = service(bounded_machine());
        svc.update_with_run("b1", "m1", &run_with_g(5.0, Some(7))).unwrap();

        // A second bean on the same machine.
        let run2 = Run {
            bean_id: "b2".to_string(),
            ..run_with_g(4.0, Some(5))
        };
        svc.update_with_run("b2", "m1", &run2).unwrap();

        svc.clear_optimizers_for_machine("m1");
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 0);
        assert_eq!(svc.get_observation_count("b2", "m1").unwrap(), 0);
    }

    #[test]
    fn prediction_curve_is_monotonic_in_param_values_for_bounded_param() {
        let svc = service(bounded_machine());
        for (g, r) in [(0.0, 2), (2.0, 4), (5.0, 7), (8.0, 9), (10.0, 6)] {
            svc.update_with_run("b1", "m1", &run_with_g(g, Some(r))).unwrap();
        }
        let opts = PredictionCurveOptions {
            num_points: Some(11),
            fixed_values: HashMap::new(),
        };
        let curve = svc.get_prediction_curve("b1", "m1", 0, &opts).expect("curve");
        assert_eq!(curve.param_values.len(), 11);
        assert_eq!(curve.ratings.len(), 11);
        for pair in curve.param_values.windows(2) {
            let (ParamValue::Number(a), ParamValue::Number(b)) = (&pair[0], &pair[1]) else {
                panic!("expected numeric param values");
            };
            assert!(a <= b);
        }
        for r in &curve.ratings {
            assert!(*r >= 1.0 && *r <= 10.0);
        }

        // With num_points=11 over g in [0,10] the samples land exactly on
        // integer g values, so the historical g=5 (rating 7) and g=8
        // (rating 9) observations sit at sample indices 5 and 8.
        assert!(
            (curve.ratings[5] - 7.0).abs() <= 1.0,
            "predicted mean at g=5 was {}, expected within 1.0 of the observed rating 7",
            curve.ratings[5]
        );
        assert!(
            (curve.ratings[8] - 9.0).abs() <= 1.0,
            "predicted mean at g=8 was {}, expected within 1.0 of the observed rating 9",
            curve.ratings[8]
        );
    }

    #[test]
    fn suggestion_favors_high_rating_region_for_bounded_param() {
        let svc = service(bounded_machine());
        for (g, r) in [(0.0, 2), (2.0, 4), (5.0, 7), (8.0, 9), (10.0, 6)] {
            svc.update_with_run("b1", "m1", &run_with_g(g, Some(r))).unwrap();
        }
        let suggestion = svc.suggest_parameters("b1", "m1").expect("suggestion");
        let ParamValue::Number(g) = suggestion.values.get("g").expect("g value") else {
            panic!("expected a numeric g value");
        };
        assert!((6.0..=10.0).contains(g), "expected g in [6, 10], got {g}");
        assert!(suggestion.expected_rating >= 7.0);
    }

    #[test]
    fn ordinal_suggestion_favors_the_highest_rated_option_across_seeds() {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for seed in 0..120u64 {
            let svc = service_seeded(ordinal_machine(), seed);
            for (opt, r) in [("Fine", 3), ("Medium", 8), ("Coarse", 4)] {
                svc.update_with_run("b1", "m1", &run_with_ordinal(opt, Some(r))).unwrap();
            }
            let suggestion = svc.suggest_parameters("b1", "m1").expect("suggestion");
            let ParamValue::Option(opt) = suggestion.values.get("coarseness").expect("option value") else {
                panic!("expected an option value");
            };
            *counts.entry(opt.clone()).or_insert(0) += 1;
        }
        let medium = *counts.get("Medium").unwrap_or(&0);
        let fine = *counts.get("Fine").unwrap_or(&0);
        let coarse = *counts.get("Coarse").unwrap_or(&0);
        assert!(medium > fine, "Medium ({medium}) should beat Fine ({fine})");
        assert!(medium > coarse, "Medium ({medium}) should beat Coarse ({coarse})");
    }

    #[test]
    fn unbounded_suggestion_stays_within_padded_history_envelope() {
        let svc = service(unbounded_machine());
        for (t, r) in [(90.0, 5), (92.0, 7), (94.0, 8), (96.0, 6)] {
            svc.update_with_run("b1", "m1", &run_with_t(t, Some(r))).unwrap();
        }
        let suggestion = svc.suggest_parameters("b1", "m1").expect("suggestion");
        let ParamValue::Number(t) = suggestion.values.get("t").expect("t value") else {
            panic!("expected a numeric t value");
        };
        assert!((88.8..=97.2).contains(t), "expected t in [88.8, 97.2], got {t}");
    }

    #[test]
    fn rebuild_from_history_reflects_only_the_remaining_runs() {
        let all_runs: Vec<Run> = [(0.0, 2), (2.0, 4), (5.0, 7), (8.0, 9)]
            .into_iter()
            .map(|(g, r)| run_with_g(g, Some(r)))
            .collect();
        let svc = service_with_history(bounded_machine(), all_runs);

        for (g, r) in [(0.0, 2), (2.0, 4), (5.0, 7), (8.0, 9), (10.0, 6)] {
            svc.update_with_run("b1", "m1", &run_with_g(g, Some(r))).unwrap();
        }
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 5);

        let mut patch = BoConfigPatch::default();
        patch.min_runs_threshold = Some(5);
        svc.set_config(patch).unwrap();
        assert!(svc.is_ready("b1", "m1").unwrap());

        svc.rebuild_from_history("b1", "m1").unwrap();
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 4);
        assert!(!svc.is_ready("b1", "m1").unwrap());
    }

    #[test]
    fn clear_optimizers_for_machine_then_update_recreates_a_fresh_state() {
        let svc = service(bounded_machine());
        for (g, r) in [(0.0, 2), (2.0, 4), (5.0, 7), (8.0, 9), (10.0, 6)] {
            svc.update_with_run("b1", "m1", &run_with_g(g, Some(r))).unwrap();
        }
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 5);

        svc.clear_optimizers_for_machine("m1");
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 0);

        svc.update_with_run("b1", "m1", &run_with_g(3.0, Some(5))).unwrap();
        assert_eq!(svc.get_observation_count("b1", "m1").unwrap(), 1);
    }
}
