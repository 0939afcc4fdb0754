//! Gaussian Process regression over the unit hypercube.
//!
//! Fitting forms the Gram matrix, adds the noise hyperparameter to the
//! diagonal, and Cholesky-factorizes it; a single non-positive-definite
//! retry adds jitter before giving up. Unlike the teacher's `math::ols`
//! (which leans on `nalgebra`'s SVD solve for a tall, rectangular design
//! matrix), here the system is square and symmetric, so `nalgebra::Cholesky`
//! is the natural fit and also hands us the explicit inverse directly.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::error::{BoError, Result};
use crate::kernel::RbfKernel;

/// Diagonal jitter added on the single allowed retry after a failed
/// Cholesky factorization.
const JITTER: f64 = 1e-2;

/// A fitted Gaussian Process, caching the factorized kernel matrix inverse
/// and the `alpha = K^-1 y` coefficient vector so repeated `predict` calls
/// (one per candidate, or one per curve sample) stay O(N^2) each.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: RbfKernel,
    noise: f64,
    x_train: Vec<Vec<f64>>,
    k_inv: DMatrix<f64>,
    alpha: DVector<f64>,
}

impl GaussianProcess {
    /// Fit a GP to training pairs `(X, y)`. `noise` is the GP's own
    /// `kernelNoise` hyperparameter (sigma_n^2), added to the Gram
    /// diagonal before factorization.
    pub fn fit(kernel: RbfKernel, noise: f64, x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        let n = x.len();
        if n == 0 {
            return Err(BoError::invalid_input("cannot fit a GP with zero observations"));
        }
        if x.len() != y.len() {
            return Err(BoError::invalid_input(format!(
                "training input/output length mismatch: {} vs {}",
                x.len(),
                y.len()
            )));
        }

        let mut gram = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let k = kernel.eval(&x[i], &x[j])?;
                gram[(i, j)] = k;
                gram[(j, i)] = k;
            }
        }

        let y_vec = DVector::from_row_slice(y);
        let k_inv = invert_with_jitter_retry(&gram, noise, n)?;
        let alpha = &k_inv * &y_vec;

        Ok(Self {
            kernel,
            noise,
            x_train: x.to_vec(),
            k_inv,
            alpha,
        })
    }

    /// Predict mean/variance at each row of `x_star`. Variance is clamped
    /// to be non-negative.
    pub fn predict(&self, x_star: &[Vec<f64>]) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut means = Vec::with_capacity(x_star.len());
        let mut variances = Vec::with_capacity(x_star.len());

        for xs in x_star {
            let k_star: Vec<f64> = self
                .x_train
                .iter()
                .map(|xt| self.kernel.eval(xt, xs))
                .collect::<Result<Vec<f64>>>()?;
            let k_star_vec = DVector::from_row_slice(&k_star);

            let mean = k_star_vec.dot(&self.alpha);

            let k_ss = self.kernel.eval(xs, xs)?;
            let quad = (&k_star_vec.transpose() * &self.k_inv * &k_star_vec)[(0, 0)];
            let variance = (k_ss - quad).max(0.0);

            means.push(mean);
            variances.push(variance);
        }

        Ok((means, variances))
    }

    pub fn noise(&self) -> f64 {
        self.noise
    }

    pub fn kernel(&self) -> RbfKernel {
        self.kernel
    }

    pub fn n_train(&self) -> usize {
        self.x_train.len()
    }
}

fn invert_with_jitter_retry(gram: &DMatrix<f64>, noise: f64, n: usize) -> Result<DMatrix<f64>> {
    let identity = DMatrix::<f64>::identity(n, n);

    let mut k = gram.clone();
    for i in 0..n {
        k[(i, i)] += noise;
    }

    if let Some(inv) = try_cholesky_inverse(&k, &identity) {
        return Ok(inv);
    }

    // Single jitter retry, per the spec.
    for i in 0..n {
        k[(i, i)] += JITTER;
    }
    try_cholesky_inverse(&k, &identity)
        .ok_or_else(|| BoError::numerical("Cholesky factorization failed even after jitter retry"))
}

fn try_cholesky_inverse(k: &DMatrix<f64>, identity: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let chol = Cholesky::<f64, Dyn>::new(k.clone())?;
    let inv = chol.solve(identity);
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}
