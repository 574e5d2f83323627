//! Whitened linear-Gaussian factors.

use nalgebra::{DMatrix, DVector};
use smallvec::SmallVec;

use hybridforge_core::{HybridError, Key, Result};

use crate::noise::NoiseModel;
use crate::values::VectorValues;

/// `½‖Σ_j A_j x_j − b‖²` with `A_j` and `b` already whitened.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianFactor {
    keys: SmallVec<[Key; 4]>,
    blocks: SmallVec<[DMatrix<f64>; 4]>,
    rhs: DVector<f64>,
}

impl GaussianFactor {
    /// Creates a factor from Jacobian blocks and a right-hand side.
    ///
    /// `noise`, when given, is folded into the blocks and `b`.
    pub fn new(
        terms: Vec<(Key, DMatrix<f64>)>,
        b: DVector<f64>,
        noise: Option<&NoiseModel>,
    ) -> Result<Self> {
        let rows = b.len();
        let mut keys: SmallVec<[Key; 4]> = SmallVec::with_capacity(terms.len());
        let mut blocks: SmallVec<[DMatrix<f64>; 4]> = SmallVec::with_capacity(terms.len());
        for (key, block) in terms {
            if keys.contains(&key) {
                return Err(HybridError::KeyMismatch(format!(
                    "Gaussian factor lists {} more than once",
                    key
                )));
            }
            if block.nrows() != rows {
                return Err(HybridError::DimensionMismatch {
                    expected: rows,
                    actual: block.nrows(),
                    context: format!("rows of the Jacobian block for {}", key),
                });
            }
            if block.ncols() == 0 {
                return Err(HybridError::InvalidArgument(format!(
                    "Jacobian block for {} has no columns",
                    key
                )));
            }
            keys.push(key);
            blocks.push(block);
        }

        let (blocks, rhs) = match noise {
            None => (blocks, b),
            Some(model) => {
                if model.dim() != rows {
                    return Err(HybridError::DimensionMismatch {
                        expected: rows,
                        actual: model.dim(),
                        context: "noise model dimension".to_string(),
                    });
                }
                (
                    blocks.iter().map(|a| model.whiten_matrix(a)).collect(),
                    model.whiten(&b),
                )
            }
        };
        Ok(GaussianFactor { keys, blocks, rhs })
    }

    /// A factor over no variables whose error is the constant `½‖b‖²`.
    pub fn constant(b: DVector<f64>) -> Self {
        GaussianFactor {
            keys: SmallVec::new(),
            blocks: SmallVec::new(),
            rhs: b,
        }
    }

    /// Stacks the rows of `factors` into one factor over the union of their
    /// keys; a key a factor does not involve gets zero columns in its rows.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if two factors give a key different widths.
    pub fn stack(factors: &[&GaussianFactor]) -> Result<Self> {
        let mut dims: SmallVec<[(Key, usize); 4]> = SmallVec::new();
        for f in factors {
            for (key, block) in f.terms() {
                match dims.iter().find(|(k, _)| *k == key) {
                    Some(&(_, dim)) if dim != block.ncols() => {
                        return Err(HybridError::DimensionMismatch {
                            expected: dim,
                            actual: block.ncols(),
                            context: format!("columns of {}", key),
                        });
                    }
                    Some(_) => {}
                    None => dims.push((key, block.ncols())),
                }
            }
        }

        let rows: usize = factors.iter().map(|f| f.rows()).sum();
        let mut blocks: SmallVec<[DMatrix<f64>; 4]> =
            dims.iter().map(|&(_, dim)| DMatrix::zeros(rows, dim)).collect();
        let mut rhs = DVector::zeros(rows);
        let mut start = 0;
        for f in factors {
            for (key, block) in f.terms() {
                if let Some(i) = dims.iter().position(|(k, _)| *k == key) {
                    blocks[i]
                        .view_mut((start, 0), (f.rows(), block.ncols()))
                        .copy_from(block);
                }
            }
            rhs.rows_mut(start, f.rows()).copy_from(f.rhs());
            start += f.rows();
        }
        Ok(GaussianFactor {
            keys: dims.iter().map(|&(k, _)| k).collect(),
            blocks,
            rhs,
        })
    }

    pub(crate) fn from_parts(
        keys: SmallVec<[Key; 4]>,
        blocks: SmallVec<[DMatrix<f64>; 4]>,
        rhs: DVector<f64>,
    ) -> Self {
        GaussianFactor { keys, blocks, rhs }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn involves(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_constant(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.rhs.len()
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Jacobian block for `key`, if the factor involves it.
    pub fn block(&self, key: Key) -> Option<&DMatrix<f64>> {
        self.keys
            .iter()
            .position(|k| *k == key)
            .map(|i| &self.blocks[i])
    }

    /// `(key, block)` pairs in the factor's key order.
    pub fn terms(&self) -> impl Iterator<Item = (Key, &DMatrix<f64>)> {
        self.keys.iter().copied().zip(self.blocks.iter())
    }

    /// Dimension of `key` in this factor.
    pub fn dim_of(&self, key: Key) -> Option<usize> {
        self.block(key).map(|b| b.ncols())
    }

    /// Whitened residual `Σ A_j x_j − b`.
    pub fn residual(&self, values: &VectorValues) -> Result<DVector<f64>> {
        let mut r = -self.rhs.clone();
        for (key, block) in self.terms() {
            let x = values.get(&key).ok_or_else(|| {
                HybridError::KeyMismatch(format!("no value for {}", key))
            })?;
            if x.len() != block.ncols() {
                return Err(HybridError::DimensionMismatch {
                    expected: block.ncols(),
                    actual: x.len(),
                    context: format!("value of {}", key),
                });
            }
            r += block * x;
        }
        Ok(r)
    }

    /// `½‖Σ A_j x_j − b‖²`.
    pub fn error(&self, values: &VectorValues) -> Result<f64> {
        Ok(0.5 * self.residual(values)?.norm_squared())
    }
}
