//! Shared domain types for the brew-parameter Bayesian Optimization core.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and suggestion assembly
//! - persisted through the durable-store adapter (`crate::store`)
//! - round-tripped without losing the raw values needed to recompute the
//!   unbounded-continuous rescaling envelope

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four parameter kinds. `FreeText` is opaque to the model: it never
/// enters the GP input space, but machine schemas and suggestions still
/// carry it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    BoundedContinuous,
    UnboundedContinuous,
    Ordinal,
    FreeText,
}

/// A parameter's schema, tagged by kind with kind-specific configuration.
///
/// This doubles as the "captured metadata" record stored in a `BoState`: the
/// optimizable subset of a machine's parameters, snapshotted at state
/// creation time (see `BoState::parameter_metadata`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamSchema {
    BoundedContinuous {
        id: String,
        name: String,
        min: f64,
        max: f64,
        step: f64,
        default: Option<f64>,
    },
    UnboundedContinuous {
        id: String,
        name: String,
        default: Option<f64>,
    },
    Ordinal {
        id: String,
        name: String,
        options: Vec<String>,
        default: Option<String>,
    },
    FreeText {
        id: String,
        name: String,
        default: Option<String>,
    },
}

impl ParamSchema {
    pub fn id(&self) -> &str {
        match self {
            Self::BoundedContinuous { id, .. }
            | Self::UnboundedContinuous { id, .. }
            | Self::Ordinal { id, .. }
            | Self::FreeText { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::BoundedContinuous { name, .. }
            | Self::UnboundedContinuous { name, .. }
            | Self::Ordinal { name, .. }
            | Self::FreeText { name, .. } => name,
        }
    }

    pub fn kind(&self) -> ParamKind {
        match self {
            Self::BoundedContinuous { .. } => ParamKind::BoundedContinuous,
            Self::UnboundedContinuous { .. } => ParamKind::UnboundedContinuous,
            Self::Ordinal { .. } => ParamKind::Ordinal,
            Self::FreeText { .. } => ParamKind::FreeText,
        }
    }

    /// All non-free-text parameters enter the GP input space.
    pub fn is_optimizable(&self) -> bool {
        self.kind() != ParamKind::FreeText
    }
}

/// A typed parameter value, as submitted on a run or decoded back off the
/// model. Free-text carries an opaque string that never touches encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamValue {
    Number(f64),
    Option(String),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_option_str(&self) -> Option<&str> {
        match self {
            Self::Option(v) => Some(v),
            _ => None,
        }
    }
}

/// An ordered machine definition: the parameters a brewing machine exposes,
/// and the (bean, machine)-keyed optimizer operates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSchema {
    pub machine_id: String,
    pub parameters: Vec<ParamSchema>,
}

impl MachineSchema {
    /// All parameters whose kind is not `FreeText`, in declared order. This
    /// order defines the GP input dimension mapping.
    pub fn optimizable_subset(&self) -> Vec<ParamSchema> {
        self.parameters
            .iter()
            .filter(|p| p.is_optimizable())
            .cloned()
            .collect()
    }

    pub fn param(&self, id: &str) -> Option<&ParamSchema> {
        self.parameters.iter().find(|p| p.id() == id)
    }
}

/// A rated (or not-yet-rated) brewing experiment, as ingested from the
/// surrounding application. `rating` is `None` for runs awaiting a rating;
/// `update_with_run` no-ops on those.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub bean_id: String,
    pub machine_id: String,
    pub values: HashMap<String, ParamValue>,
    pub rating: Option<u8>,
}

/// GP kernel/noise hyperparameters, captured into a `BoState` at creation
/// time and not retroactively updated by later config edits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpHyperparams {
    pub length_scale: f64,
    pub output_scale: f64,
    pub noise: f64,
}

/// One historical observation: the GP-ready normalized vector, the raw
/// values used to derive it (needed to recompute the unbounded-continuous
/// rescaling envelope on every future encode/decode), and the normalized
/// rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub normalized: Vec<f64>,
    pub raw_values: HashMap<String, ParamValue>,
    pub rating_normalized: f64,
}

/// The persistent per-(bean, machine) optimizer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoState {
    pub bean_id: String,
    pub machine_id: String,
    pub parameter_metadata: Vec<ParamSchema>,
    pub observations: Vec<Observation>,
    pub gp_hyperparameters: GpHyperparams,
    pub last_updated: DateTime<Utc>,
}

impl BoState {
    pub fn dim(&self) -> usize {
        self.parameter_metadata.len()
    }
}

/// Marker literal used for `Suggestion::rating`, distinguishing it from any
/// real (numeric) rating a historical run carries.
pub const SUGGESTION_RATING_LABEL: &str = "unrated";

/// A proposed next parameter vector, assembled by the service from the
/// winning UCB candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub bean_id: String,
    pub machine_id: String,
    pub values: HashMap<String, ParamValue>,
    pub rating: String,
    pub is_suggestion: bool,
    pub expected_rating: f64,
    pub expected_std_dev: f64,
}

/// Options controlling `BoService::prediction_curve`.
#[derive(Debug, Clone, Default)]
pub struct PredictionCurveOptions {
    pub num_points: Option<usize>,
    pub fixed_values: HashMap<String, ParamValue>,
}

/// A 1-D conditional slice of the GP's predictive mean/std-dev as one
/// parameter varies with the rest held fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionCurve {
    pub param_values: Vec<ParamValue>,
    pub ratings: Vec<f64>,
    pub std_devs: Vec<f64>,
    /// For ordinal parameters only: the sample index closest to each
    /// option's canonical normalized value. `None` for every other kind.
    pub valid_indices: Option<Vec<usize>>,
}
