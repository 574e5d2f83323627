//! Arithmetic on real-valued decision trees.

use std::cmp::Ordering;

use super::{AlgebraicDecisionTree, DecisionTree};
use crate::error::{HybridError, Result};
use crate::key::DiscreteKey;

impl AlgebraicDecisionTree {
    /// Leaves in depth-first order, each with the number of assignments of
    /// `keys` it stands for.
    ///
    /// Every key the tree branches on must be listed in `keys`.
    pub fn leaves_with_multiplicity(&self, keys: &[DiscreteKey]) -> Result<Vec<(f64, usize)>> {
        for k in self.keys() {
            if !keys.contains(&k) {
                return Err(HybridError::KeyMismatch(format!(
                    "tree branches on {} which is not among the declared keys",
                    k.key
                )));
            }
        }
        let total: usize = keys.iter().map(|k| k.cardinality).product();
        let mut out = Vec::with_capacity(self.leaf_count());
        collect_multiplicity(self, 1, total, &mut out);
        Ok(out)
    }

    /// Sum over all assignments of `keys`.
    pub fn sum_over(&self, keys: &[DiscreteKey]) -> Result<f64> {
        Ok(self
            .leaves_with_multiplicity(keys)?
            .iter()
            .map(|(v, m)| v * *m as f64)
            .sum())
    }

    /// Largest leaf value.
    pub fn max_value(&self) -> f64 {
        self.leaves().into_iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest leaf value.
    pub fn min_value(&self) -> f64 {
        self.leaves().into_iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Multiplies every leaf by `factor`.
    pub fn scale(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    /// Rescales the tree so it sums to one over `keys`.
    pub fn normalize(&self, keys: &[DiscreteKey]) -> Result<Self> {
        let total = self.sum_over(keys)?;
        if total <= 0.0 || !total.is_finite() {
            return Err(HybridError::InvalidArgument(format!(
                "cannot normalize a tree with total {}",
                total
            )));
        }
        Ok(self.scale(1.0 / total))
    }

    /// Keeps the `max_leaves` largest leaves and zeroes the rest.
    ///
    /// Survivors are rescaled so the total over `keys` equals the total
    /// before pruning. Ties keep the leaf that comes first in depth-first
    /// order. A merged leaf counts as one leaf however many assignments it
    /// covers.
    ///
    /// # Errors
    ///
    /// `EmptyPruneResult` if `max_leaves` is zero or every leaf is already
    /// zero.
    pub fn prune(&self, keys: &[DiscreteKey], max_leaves: usize) -> Result<Self> {
        if max_leaves == 0 {
            return Err(HybridError::EmptyPruneResult(
                "asked to keep zero leaves".to_string(),
            ));
        }
        let leaves = self.leaves_with_multiplicity(keys)?;
        let total = weighted_total(&leaves);
        if total <= 0.0 {
            return Err(HybridError::EmptyPruneResult(
                "every leaf is zero".to_string(),
            ));
        }

        let nonzero = leaves.iter().filter(|(v, _)| *v > 0.0).count();
        if nonzero <= max_leaves {
            return Ok(self.clone());
        }

        let mut order: Vec<usize> = (0..leaves.len()).collect();
        order.sort_by(|&i, &j| {
            leaves[j]
                .0
                .partial_cmp(&leaves[i].0)
                .unwrap_or(Ordering::Equal)
        });
        let mut keep = vec![false; leaves.len()];
        for &i in order.iter().take(max_leaves) {
            keep[i] = true;
        }
        self.rescale_kept(&leaves, &keep, total)
    }

    /// Zeroes every leaf whose normalized probability is below `floor` and
    /// rescales the survivors to the original total.
    ///
    /// # Errors
    ///
    /// `EmptyPruneResult` if no leaf reaches the floor.
    pub fn prune_below(&self, keys: &[DiscreteKey], floor: f64) -> Result<Self> {
        let leaves = self.leaves_with_multiplicity(keys)?;
        let total = weighted_total(&leaves);
        if total <= 0.0 {
            return Err(HybridError::EmptyPruneResult(
                "every leaf is zero".to_string(),
            ));
        }
        let keep: Vec<bool> = leaves
            .iter()
            .map(|(v, _)| *v > 0.0 && *v / total >= floor)
            .collect();
        if !keep.iter().any(|&k| k) {
            return Err(HybridError::EmptyPruneResult(format!(
                "no leaf reaches probability floor {}",
                floor
            )));
        }
        self.rescale_kept(&leaves, &keep, total)
    }

    fn rescale_kept(&self, leaves: &[(f64, usize)], keep: &[bool], total: f64) -> Result<Self> {
        let kept_total: f64 = leaves
            .iter()
            .zip(keep)
            .filter(|(_, &k)| k)
            .map(|((v, m), _)| v * *m as f64)
            .sum();
        let factor = total / kept_total;
        self.with_leaves(
            leaves
                .iter()
                .zip(keep)
                .map(|((v, _), &k)| if k { v * factor } else { 0.0 }),
        )
    }
}

fn weighted_total(leaves: &[(f64, usize)]) -> f64 {
    leaves.iter().map(|(v, m)| v * *m as f64).sum()
}

fn collect_multiplicity(
    tree: &AlgebraicDecisionTree,
    path_size: usize,
    total: usize,
    out: &mut Vec<(f64, usize)>,
) {
    match tree {
        DecisionTree::Leaf(v) => out.push((*v, total / path_size)),
        DecisionTree::Choice { key, branches } => {
            for b in branches {
                collect_multiplicity(b, path_size * key.cardinality, total, out);
            }
        }
    }
}
