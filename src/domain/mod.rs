//! Domain types shared across the kernel, GP, acquisition, and service.
//!
//! This module defines:
//!
//! - parameter schema and typed parameter values (`ParamKind`, `ParamValue`, `ParamSchema`)
//! - the machine schema and the per-pair optimizer state (`MachineSchema`, `BoState`)
//! - ingested runs and produced outputs (`Run`, `Observation`, `Suggestion`, `PredictionCurve`)

pub mod types;

pub use types::*;
