//! Gaussian noise models.
//!
//! A factor stores its Jacobian and right-hand side already whitened, so the
//! noise model is only needed at construction time.

use nalgebra::{DMatrix, DVector};

use hybridforge_core::{HybridError, Result};

/// Measurement noise with a diagonal covariance.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseModel {
    /// Identity covariance.
    Unit { dim: usize },
    /// `sigma^2 I`.
    Isotropic { dim: usize, sigma: f64 },
    /// `diag(sigmas)^2`.
    Diagonal { sigmas: DVector<f64> },
}

impl NoiseModel {
    pub fn unit(dim: usize) -> Self {
        NoiseModel::Unit { dim }
    }

    /// Isotropic noise with standard deviation `sigma`.
    pub fn isotropic(dim: usize, sigma: f64) -> Result<Self> {
        check_sigma(sigma)?;
        Ok(NoiseModel::Isotropic { dim, sigma })
    }

    /// Independent noise with one standard deviation per row.
    pub fn diagonal(sigmas: &[f64]) -> Result<Self> {
        for &s in sigmas {
            check_sigma(s)?;
        }
        Ok(NoiseModel::Diagonal {
            sigmas: DVector::from_row_slice(sigmas),
        })
    }

    pub fn dim(&self) -> usize {
        match self {
            NoiseModel::Unit { dim } | NoiseModel::Isotropic { dim, .. } => *dim,
            NoiseModel::Diagonal { sigmas } => sigmas.len(),
        }
    }

    fn inv_sigma(&self, row: usize) -> f64 {
        match self {
            NoiseModel::Unit { .. } => 1.0,
            NoiseModel::Isotropic { sigma, .. } => 1.0 / sigma,
            NoiseModel::Diagonal { sigmas } => 1.0 / sigmas[row],
        }
    }

    /// Scales row `i` of `m` by `1 / sigma_i`.
    pub fn whiten_matrix(&self, m: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = m.clone();
        for (i, mut row) in out.row_iter_mut().enumerate() {
            row *= self.inv_sigma(i);
        }
        out
    }

    /// Scales entry `i` of `v` by `1 / sigma_i`.
    pub fn whiten(&self, v: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            v.len(),
            v.iter().enumerate().map(|(i, x)| x * self.inv_sigma(i)),
        )
    }
}

fn check_sigma(sigma: f64) -> Result<()> {
    if sigma > 0.0 && sigma.is_finite() {
        Ok(())
    } else {
        Err(HybridError::InvalidArgument(format!(
            "noise sigma must be positive and finite, got {}",
            sigma
        )))
    }
}
