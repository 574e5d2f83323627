//! Non-negative potentials over discrete keys.

use std::fmt;

use smallvec::SmallVec;

use super::EliminationMode;
use crate::assignment::DiscreteValues;
use crate::decision_tree::{AlgebraicDecisionTree, DecisionTree};
use crate::error::{HybridError, Result};
use crate::key::{DiscreteKey, Key};

/// A table of non-negative values indexed by an assignment of its keys.
///
/// The tree may branch on fewer keys than the factor declares; a declared key
/// the tree ignores simply does not change the value.
#[derive(Clone, PartialEq)]
pub struct DecisionTreeFactor {
    keys: SmallVec<[DiscreteKey; 4]>,
    tree: AlgebraicDecisionTree,
}

impl DecisionTreeFactor {
    /// Creates a factor from values in lexicographic assignment order of
    /// `keys` (first key most significant).
    ///
    /// ```
    /// use hybridforge_core::{DecisionTreeFactor, DiscreteKey, DiscreteValues, Key};
    ///
    /// let m = DiscreteKey::new(Key::symbol('m', 0), 2);
    /// let f = DecisionTreeFactor::new(&[m], vec![0.25, 0.75]).unwrap();
    /// let at = DiscreteValues::from_pairs([(m.key, 1)]);
    /// assert_eq!(f.evaluate(&at).unwrap(), 0.75);
    /// ```
    pub fn new(keys: &[DiscreteKey], values: Vec<f64>) -> Result<Self> {
        if let Some(bad) = values.iter().find(|v| v.is_nan() || **v < 0.0) {
            return Err(HybridError::InvalidArgument(format!(
                "discrete factor values must be non-negative, got {}",
                bad
            )));
        }
        let tree = DecisionTree::from_values(keys, values)?;
        Self::from_tree(keys, tree)
    }

    /// Wraps an existing tree, declaring `keys` as the factor's scope.
    pub fn from_tree(keys: &[DiscreteKey], tree: AlgebraicDecisionTree) -> Result<Self> {
        let mut sorted: SmallVec<[DiscreteKey; 4]> = keys.iter().copied().collect();
        sorted.sort();
        if sorted.windows(2).any(|w| w[0].key == w[1].key) {
            return Err(HybridError::KeyMismatch(
                "discrete factor lists a key more than once".to_string(),
            ));
        }
        if let Some(extra) = tree.keys().into_iter().find(|k| !sorted.contains(k)) {
            return Err(HybridError::KeyMismatch(format!(
                "tree branches on {} outside the factor's keys",
                extra.key
            )));
        }
        Ok(DecisionTreeFactor { keys: sorted, tree })
    }

    /// A factor with no keys and a single value.
    pub fn constant(value: f64) -> Self {
        DecisionTreeFactor {
            keys: SmallVec::new(),
            tree: DecisionTree::leaf(value),
        }
    }

    /// A factor over `keys` that has the same value everywhere.
    pub fn constant_over(keys: &[DiscreteKey], value: f64) -> Result<Self> {
        Self::from_tree(keys, DecisionTree::leaf(value))
    }

    /// Declared keys, sorted.
    pub fn keys(&self) -> &[DiscreteKey] {
        &self.keys
    }

    pub fn tree(&self) -> &AlgebraicDecisionTree {
        &self.tree
    }

    pub fn contains(&self, key: Key) -> bool {
        self.keys.iter().any(|k| k.key == key)
    }

    fn discrete_key(&self, key: Key) -> Result<DiscreteKey> {
        self.keys
            .iter()
            .find(|k| k.key == key)
            .copied()
            .ok_or_else(|| HybridError::KeyMismatch(format!("factor does not involve {}", key)))
    }

    pub fn evaluate(&self, values: &DiscreteValues) -> Result<f64> {
        self.tree.evaluate(values).copied()
    }

    /// `-ln value`; infinite where the value is zero.
    pub fn error(&self, values: &DiscreteValues) -> Result<f64> {
        Ok(-self.evaluate(values)?.ln())
    }

    /// Pointwise product; the result spans the union of both key sets.
    pub fn multiply(&self, other: &DecisionTreeFactor) -> Result<Self> {
        let keys = merge_keys(&self.keys, &other.keys)?;
        let tree = self.tree.apply(&other.tree, |a, b| a * b)?;
        Ok(DecisionTreeFactor { keys, tree })
    }

    /// Pointwise quotient, with anything divided by zero taken as zero.
    pub fn divide(&self, other: &DecisionTreeFactor) -> Result<Self> {
        let keys = merge_keys(&self.keys, &other.keys)?;
        let tree = self
            .tree
            .apply(&other.tree, |a, b| if *b == 0.0 { 0.0 } else { a / b })?;
        Ok(DecisionTreeFactor { keys, tree })
    }

    /// Sums `key` out.
    pub fn sum_out(&self, key: Key) -> Result<Self> {
        self.fold_out(key, |a, b| a + b)
    }

    /// Maximizes `key` out.
    pub fn max_out(&self, key: Key) -> Result<Self> {
        self.fold_out(key, |a, b| a.max(*b))
    }

    /// Sums or maximizes `key` out depending on `mode`.
    pub fn marginalize(&self, key: Key, mode: EliminationMode) -> Result<Self> {
        match mode {
            EliminationMode::MaxProduct => self.max_out(key),
            EliminationMode::SumProduct => self.sum_out(key),
        }
    }

    fn fold_out(&self, key: Key, op: impl Fn(&f64, &f64) -> f64) -> Result<Self> {
        let dk = self.discrete_key(key)?;
        let tree = self.tree.combine_out(dk, op)?;
        let keys = self.keys.iter().copied().filter(|k| k.key != key).collect();
        Ok(DecisionTreeFactor { keys, tree })
    }

    /// Maximizes out every key not listed in `keep`.
    pub fn max_marginal(&self, keep: &[DiscreteKey]) -> Result<Self> {
        let mut result = self.clone();
        for k in &self.keys {
            if !keep.iter().any(|kk| kk.key == k.key) {
                result = result.max_out(k.key)?;
            }
        }
        Ok(result)
    }

    /// Fixes the keys assigned in `values`, removing them from the scope.
    pub fn restrict(&self, values: &DiscreteValues) -> Result<Self> {
        let tree = self.tree.restrict(values)?;
        let keys = self
            .keys
            .iter()
            .copied()
            .filter(|k| !values.contains_key(&k.key))
            .collect();
        Ok(DecisionTreeFactor { keys, tree })
    }

    /// Total over every assignment of the declared keys.
    pub fn sum(&self) -> Result<f64> {
        self.tree.sum_over(&self.keys)
    }

    pub fn max_value(&self) -> f64 {
        self.tree.max_value()
    }

    pub fn normalize(&self) -> Result<Self> {
        Ok(DecisionTreeFactor {
            keys: self.keys.clone(),
            tree: self.tree.normalize(&self.keys)?,
        })
    }

    /// Keeps the `max_leaves` most probable leaves (see
    /// [`AlgebraicDecisionTree::prune`]).
    pub fn prune(&self, max_leaves: usize) -> Result<Self> {
        Ok(DecisionTreeFactor {
            keys: self.keys.clone(),
            tree: self.tree.prune(&self.keys, max_leaves)?,
        })
    }

    /// Zeroes leaves whose normalized probability is below `floor`.
    pub fn prune_below(&self, floor: f64) -> Result<Self> {
        Ok(DecisionTreeFactor {
            keys: self.keys.clone(),
            tree: self.tree.prune_below(&self.keys, floor)?,
        })
    }

    /// Number of assignments with a non-zero value.
    pub fn nonzero_count(&self) -> Result<usize> {
        Ok(self
            .tree
            .leaves_with_multiplicity(&self.keys)?
            .iter()
            .filter(|(v, _)| *v > 0.0)
            .map(|(_, m)| m)
            .sum())
    }
}

impl fmt::Debug for DecisionTreeFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionTreeFactor")
            .field("keys", &self.keys)
            .field("leaves", &self.tree.leaf_count())
            .finish()
    }
}

pub(crate) fn merge_keys(
    a: &[DiscreteKey],
    b: &[DiscreteKey],
) -> Result<SmallVec<[DiscreteKey; 4]>> {
    let mut merged: SmallVec<[DiscreteKey; 4]> = a.iter().copied().collect();
    for k in b {
        let existing = merged.iter().find(|m| m.key == k.key).copied();
        match existing {
            Some(m) if m.cardinality != k.cardinality => {
                return Err(HybridError::KeyMismatch(format!(
                    "{} has cardinality {} and {}",
                    k.key, m.cardinality, k.cardinality
                )));
            }
            Some(_) => {}
            None => merged.push(*k),
        }
    }
    merged.sort();
    Ok(merged)
}
