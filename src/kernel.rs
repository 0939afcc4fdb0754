//! The squared-exponential (RBF) kernel.
//!
//! `k(x, y) = sigma_sq * exp(-0.5 * ||x - y||^2 / length_scale^2)`
//!
//! This is the only kernel the service offers: anisotropic or learned
//! kernels are out of scope (see the GP regressor's rationale).

use nalgebra::DVector;

use crate::error::{BoError, Result};

/// Isotropic squared-exponential kernel over vectors in the unit hypercube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RbfKernel {
    pub length_scale: f64,
    pub output_scale: f64,
}

impl RbfKernel {
    pub fn new(length_scale: f64, output_scale: f64) -> Self {
        Self {
            length_scale,
            output_scale,
        }
    }

    /// `k(x, y)`. Both slices must have equal length.
    pub fn eval(&self, x: &[f64], y: &[f64]) -> Result<f64> {
        if x.len() != y.len() {
            return Err(BoError::invalid_input(format!(
                "dimension mismatch: {} vs {}",
                x.len(),
                y.len()
            )));
        }
        let sq_dist: f64 = x.iter().zip(y.iter()).map(|(a, b)| (a - b).powi(2)).sum();
        let ell_sq = self.length_scale * self.length_scale;
        Ok(self.output_scale * (-0.5 * sq_dist / ell_sq).exp())
    }

    /// Same as `eval` but for `nalgebra` column vectors, used by the GP
    /// regressor when assembling the Gram matrix and cross-covariance rows.
    pub fn eval_vec(&self, x: &DVector<f64>, y: &DVector<f64>) -> Result<f64> {
        if x.len() != y.len() {
            return Err(BoError::invalid_input(format!(
                "dimension mismatch: {} vs {}",
                x.len(),
                y.len()
            )));
        }
        let diff = x - y;
        let sq_dist = diff.dot(&diff);
        let ell_sq = self.length_scale * self.length_scale;
        Ok(self.output_scale * (-0.5 * sq_dist / ell_sq).exp())
    }
}
