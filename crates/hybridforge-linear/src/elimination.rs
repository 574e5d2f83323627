//! Dense QR elimination of a single continuous variable.

use nalgebra::{DMatrix, DVector};
use smallvec::SmallVec;
use tracing::trace;

use hybridforge_core::{DiscreteValues, HybridError, Key, Result};

use crate::conditional::GaussianConditional;
use crate::factor::GaussianFactor;

/// Default threshold below which a diagonal entry of `R` counts as zero.
pub const DEFAULT_RANK_TOLERANCE: f64 = 1e-9;

/// Eliminates `key` from the product of `factors`.
///
/// Stacks the factors into an augmented `[A | b]` matrix with the frontal
/// columns first, triangularizes it with Householder QR and splits the result
/// into `p(key | separator)` and a residual factor on the separator. The
/// residual keeps the leftover rows, so the total error of the inputs equals
/// conditional error plus residual error.
///
/// # Errors
///
/// `NumericalFailure` when the stacked system has fewer rows than the
/// frontal dimension or a diagonal entry of `R` is below `rank_tolerance`.
pub fn eliminate_qr(
    factors: &[&GaussianFactor],
    key: Key,
    rank_tolerance: f64,
) -> Result<(GaussianConditional, GaussianFactor)> {
    let frontal_dim = factors
        .iter()
        .find_map(|f| f.dim_of(key))
        .ok_or_else(|| HybridError::KeyMismatch(format!("no factor involves {}", key)))?;

    // Column layout: frontal, then separator keys in first-seen order.
    let mut layout: SmallVec<[(Key, usize, usize); 8]> = SmallVec::new();
    layout.push((key, 0, frontal_dim));
    let mut cols = frontal_dim;
    for f in factors {
        for (k, block) in f.terms() {
            let known = layout.iter().find(|(lk, _, _)| *lk == k).map(|(_, _, d)| *d);
            match known {
                Some(dim) if dim != block.ncols() => {
                    return Err(HybridError::DimensionMismatch {
                        expected: dim,
                        actual: block.ncols(),
                        context: format!("columns of {}", k),
                    });
                }
                Some(_) => {}
                None => {
                    layout.push((k, cols, block.ncols()));
                    cols += block.ncols();
                }
            }
        }
    }

    let rows: usize = factors.iter().map(|f| f.rows()).sum();
    if rows < frontal_dim {
        return Err(HybridError::NumericalFailure {
            key,
            assignment: DiscreteValues::new(),
            reason: format!(
                "{} rows cannot determine a variable of dimension {}",
                rows, frontal_dim
            ),
        });
    }

    let mut ab = DMatrix::<f64>::zeros(rows, cols + 1);
    let mut row = 0;
    for f in factors {
        for (k, block) in f.terms() {
            if let Some((_, start, dim)) = layout.iter().find(|(lk, _, _)| *lk == k) {
                ab.view_mut((row, *start), (f.rows(), *dim)).copy_from(block);
            }
        }
        ab.view_mut((row, cols), (f.rows(), 1)).copy_from(f.rhs());
        row += f.rows();
    }

    let r = ab.qr().r();
    for i in 0..frontal_dim {
        let pivot = r[(i, i)].abs();
        if pivot.is_nan() || pivot <= rank_tolerance {
            return Err(HybridError::NumericalFailure {
                key,
                assignment: DiscreteValues::new(),
                reason: format!("rank deficient: |R[{}, {}]| = {:e}", i, i, pivot),
            });
        }
    }

    let conditional = GaussianConditional::new(
        key,
        r.view((0, 0), (frontal_dim, frontal_dim)).into_owned(),
        layout[1..]
            .iter()
            .map(|(k, start, dim)| (*k, r.view((0, *start), (frontal_dim, *dim)).into_owned()))
            .collect(),
        DVector::from_iterator(frontal_dim, r.view((0, cols), (frontal_dim, 1)).iter().copied()),
    )?;

    let remaining = r.nrows() - frontal_dim;
    let residual = GaussianFactor::from_parts(
        layout[1..].iter().map(|(k, _, _)| *k).collect(),
        layout[1..]
            .iter()
            .map(|(_, start, dim)| r.view((frontal_dim, *start), (remaining, *dim)).into_owned())
            .collect(),
        DVector::from_iterator(
            remaining,
            r.view((frontal_dim, cols), (remaining, 1)).iter().copied(),
        ),
    );

    trace!(
        event = "qr_eliminate",
        key = %key,
        rows = rows,
        cols = cols,
        residual_rows = remaining,
    );
    Ok((conditional, residual))
}
