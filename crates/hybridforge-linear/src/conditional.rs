//! Gaussian conditionals `p(x | parents)` in square-root form.

use nalgebra::{DMatrix, DVector};
use smallvec::SmallVec;

use hybridforge_core::{DiscreteValues, HybridError, Key, Result};

use crate::factor::GaussianFactor;
use crate::values::VectorValues;

/// `R x + Σ_j S_j y_j = d` with `R` upper triangular.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianConditional {
    frontal: Key,
    r: DMatrix<f64>,
    parents: SmallVec<[(Key, DMatrix<f64>); 4]>,
    d: DVector<f64>,
}

impl GaussianConditional {
    /// # Errors
    ///
    /// `DimensionMismatch` if the blocks disagree in shape and
    /// `NumericalFailure` if `R` has a zero on its diagonal.
    pub fn new(
        frontal: Key,
        r: DMatrix<f64>,
        parents: Vec<(Key, DMatrix<f64>)>,
        d: DVector<f64>,
    ) -> Result<Self> {
        let dim = r.nrows();
        if r.ncols() != dim || d.len() != dim {
            return Err(HybridError::DimensionMismatch {
                expected: dim,
                actual: if r.ncols() != dim { r.ncols() } else { d.len() },
                context: format!("square-root information of {}", frontal),
            });
        }
        if let Some((key, s)) = parents.iter().find(|(_, s)| s.nrows() != dim) {
            return Err(HybridError::DimensionMismatch {
                expected: dim,
                actual: s.nrows(),
                context: format!("rows of the parent block for {}", key),
            });
        }
        if (0..dim).any(|i| r[(i, i)] == 0.0) {
            return Err(HybridError::NumericalFailure {
                key: frontal,
                assignment: DiscreteValues::new(),
                reason: "zero on the diagonal of R".to_string(),
            });
        }
        Ok(GaussianConditional {
            frontal,
            r: r.upper_triangle(),
            parents: parents.into_iter().collect(),
            d,
        })
    }

    /// Unit-information conditional centered at zero with no parents.
    pub fn unit(frontal: Key, dim: usize) -> Self {
        GaussianConditional {
            frontal,
            r: DMatrix::identity(dim, dim),
            parents: SmallVec::new(),
            d: DVector::zeros(dim),
        }
    }

    pub fn frontal(&self) -> Key {
        self.frontal
    }

    pub fn dim(&self) -> usize {
        self.r.nrows()
    }

    pub fn parents(&self) -> impl Iterator<Item = Key> + '_ {
        self.parents.iter().map(|(k, _)| *k)
    }

    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    pub fn d(&self) -> &DVector<f64> {
        &self.d
    }

    /// `Σ ln|R_ii|`, the log-determinant of the square-root information.
    pub fn log_det(&self) -> f64 {
        self.r.diagonal().iter().map(|v| v.abs().ln()).sum()
    }

    fn parent_term(&self, values: &VectorValues) -> Result<DVector<f64>> {
        let mut acc = DVector::zeros(self.dim());
        for (key, s) in &self.parents {
            let y = values.get(key).ok_or_else(|| {
                HybridError::KeyMismatch(format!(
                    "no value for parent {} of {}",
                    key, self.frontal
                ))
            })?;
            if y.len() != s.ncols() {
                return Err(HybridError::DimensionMismatch {
                    expected: s.ncols(),
                    actual: y.len(),
                    context: format!("value of {}", key),
                });
            }
            acc += s * y;
        }
        Ok(acc)
    }

    /// Solves for the frontal given values of every parent.
    pub fn solve(&self, parents: &VectorValues) -> Result<DVector<f64>> {
        let rhs = &self.d - self.parent_term(parents)?;
        self.r
            .solve_upper_triangular(&rhs)
            .ok_or_else(|| HybridError::NumericalFailure {
                key: self.frontal,
                assignment: DiscreteValues::new(),
                reason: "back-substitution through a singular R".to_string(),
            })
    }

    /// `½‖R x + Σ S_j y_j − d‖²`.
    pub fn error(&self, values: &VectorValues) -> Result<f64> {
        let x = values.get(&self.frontal).ok_or_else(|| {
            HybridError::KeyMismatch(format!("no value for frontal {}", self.frontal))
        })?;
        if x.len() != self.dim() {
            return Err(HybridError::DimensionMismatch {
                expected: self.dim(),
                actual: x.len(),
                context: format!("value of {}", self.frontal),
            });
        }
        let residual = &self.r * x + self.parent_term(values)? - &self.d;
        Ok(0.5 * residual.norm_squared())
    }

    /// The same quadratic viewed as a factor, for re-elimination.
    pub fn to_factor(&self) -> GaussianFactor {
        let mut keys: SmallVec<[Key; 4]> = SmallVec::with_capacity(self.parents.len() + 1);
        let mut blocks: SmallVec<[DMatrix<f64>; 4]> = SmallVec::with_capacity(self.parents.len() + 1);
        keys.push(self.frontal);
        blocks.push(self.r.clone());
        for (k, s) in &self.parents {
            keys.push(*k);
            blocks.push(s.clone());
        }
        GaussianFactor::from_parts(keys, blocks, self.d.clone())
    }
}
