//! Piecewise functions over discrete assignments.
//!
//! A [`DecisionTree`] maps every assignment of its discrete keys to a leaf
//! payload: a probability, a Gaussian conditional, a solution vector.
//!
//! Invariants:
//! - Keys strictly increase along every root-to-leaf path, so a path visits
//!   each key at most once and always in the same relative order.
//! - A choice whose branches are all equal is collapsed into that branch.
//!   A key that does not change the payload therefore disappears from the
//!   tree, which is what keeps pruned trees small.

mod algebraic;


use std::collections::BTreeSet;

use crate::assignment::DiscreteValues;
use crate::error::{HybridError, Result};
use crate::key::{DiscreteKey, Key};

/// A piecewise function from discrete assignments to leaves of type `L`.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionTree<L> {
    /// Constant payload.
    Leaf(L),
    /// Branch on `key`; `branches[v]` is the sub-tree for `key = v`.
    Choice {
        key: DiscreteKey,
        branches: Vec<DecisionTree<L>>,
    },
}

/// Decision tree over real values (probabilities, errors).
pub type AlgebraicDecisionTree = DecisionTree<f64>;

impl<L> DecisionTree<L> {
    /// Creates a constant tree.
    pub fn leaf(value: L) -> Self {
        DecisionTree::Leaf(value)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, DecisionTree::Leaf(_))
    }

    fn top_key(&self) -> Option<DiscreteKey> {
        match self {
            DecisionTree::Leaf(_) => None,
            DecisionTree::Choice { key, .. } => Some(*key),
        }
    }

    /// Returns the sub-tree for `key = value`, or `self` if the root does not
    /// branch on `key`.
    fn branch(&self, key: Key, value: usize) -> &Self {
        match self {
            DecisionTree::Choice { key: k, branches } if k.key == key => &branches[value],
            _ => self,
        }
    }

    /// Number of leaves (a merged leaf counts once).
    pub fn leaf_count(&self) -> usize {
        match self {
            DecisionTree::Leaf(_) => 1,
            DecisionTree::Choice { branches, .. } => branches.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Leaves in depth-first order.
    pub fn leaves(&self) -> Vec<&L> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a L>) {
        match self {
            DecisionTree::Leaf(v) => out.push(v),
            DecisionTree::Choice { branches, .. } => {
                for b in branches {
                    b.collect_leaves(out);
                }
            }
        }
    }

    /// Leaves in depth-first order, each with the partial assignment of the
    /// keys on its path.
    pub fn leaves_with_assignment(&self) -> Vec<(DiscreteValues, &L)> {
        let mut out = Vec::with_capacity(self.leaf_count());
        let mut path = DiscreteValues::new();
        self.collect_with_assignment(&mut path, &mut out);
        out
    }

    fn collect_with_assignment<'a>(
        &'a self,
        path: &mut DiscreteValues,
        out: &mut Vec<(DiscreteValues, &'a L)>,
    ) {
        match self {
            DecisionTree::Leaf(v) => out.push((path.clone(), v)),
            DecisionTree::Choice { key, branches } => {
                for (value, b) in branches.iter().enumerate() {
                    path.insert(key.key, value);
                    b.collect_with_assignment(path, out);
                }
                path.remove(&key.key);
            }
        }
    }

    /// The discrete keys the tree actually branches on, sorted.
    pub fn keys(&self) -> Vec<DiscreteKey> {
        let mut set = BTreeSet::new();
        self.collect_keys(&mut set);
        set.into_iter().collect()
    }

    fn collect_keys(&self, set: &mut BTreeSet<DiscreteKey>) {
        if let DecisionTree::Choice { key, branches } = self {
            set.insert(*key);
            for b in branches {
                b.collect_keys(set);
            }
        }
    }

    /// Evaluates the tree at an assignment.
    ///
    /// The assignment must give a value to every key on the path taken.
    pub fn evaluate(&self, values: &DiscreteValues) -> Result<&L> {
        let mut node = self;
        loop {
            match node {
                DecisionTree::Leaf(v) => return Ok(v),
                DecisionTree::Choice { key, branches } => {
                    let value = *values.get(&key.key).ok_or_else(|| {
                        HybridError::KeyMismatch(format!(
                            "assignment {} has no value for {}",
                            values, key.key
                        ))
                    })?;
                    node = branches.get(value).ok_or_else(|| {
                        HybridError::KeyMismatch(format!(
                            "value {} out of range for {} (cardinality {})",
                            value, key.key, key.cardinality
                        ))
                    })?;
                }
            }
        }
    }
}

impl<L: PartialEq> DecisionTree<L> {
    /// Creates a choice node, collapsing it if all branches are equal.
    pub fn choice(key: DiscreteKey, mut branches: Vec<DecisionTree<L>>) -> Self {
        debug_assert_eq!(branches.len(), key.cardinality);
        if !branches.is_empty() && branches.windows(2).all(|w| w[0] == w[1]) {
            return branches.swap_remove(0);
        }
        DecisionTree::Choice { key, branches }
    }

    /// Builds a tree from leaf values listed in lexicographic assignment order
    /// of `keys` (first key most significant).
    ///
    /// ```
    /// use hybridforge_core::{DecisionTree, DiscreteKey, DiscreteValues, Key};
    ///
    /// let a = DiscreteKey::new(Key::new(2), 2);
    /// let b = DiscreteKey::new(Key::new(1), 2);
    /// let tree = DecisionTree::from_values(&[a, b], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    ///
    /// let at = DiscreteValues::from_pairs([(a.key, 1), (b.key, 0)]);
    /// assert_eq!(*tree.evaluate(&at).unwrap(), 3.0);
    /// ```
    pub fn from_values(keys: &[DiscreteKey], values: Vec<L>) -> Result<Self> {
        check_distinct(keys)?;
        let expected: usize = keys.iter().map(|k| k.cardinality).product();
        if values.len() != expected {
            return Err(HybridError::DimensionMismatch {
                expected,
                actual: values.len(),
                context: "decision tree leaf values".to_string(),
            });
        }

        let mut strides = vec![1usize; keys.len()];
        for i in (0..keys.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * keys[i + 1].cardinality;
        }

        let mut slots: Vec<Option<L>> = values.into_iter().map(Some).collect();
        Self::try_from_fn(keys, |assignment| {
            let index: usize = keys
                .iter()
                .zip(&strides)
                .map(|(k, stride)| assignment.get(&k.key).copied().unwrap_or(0) * stride)
                .sum();
            slots[index].take().ok_or_else(|| {
                HybridError::KeyMismatch(format!("leaf {} requested twice", index))
            })
        })
    }

    /// Builds a tree by evaluating `f` at every assignment of `keys`.
    pub fn from_fn(keys: &[DiscreteKey], mut f: impl FnMut(&DiscreteValues) -> L) -> Result<Self> {
        Self::try_from_fn(keys, |values| Ok(f(values)))
    }

    /// Fallible variant of [`from_fn`](Self::from_fn).
    pub fn try_from_fn(
        keys: &[DiscreteKey],
        mut f: impl FnMut(&DiscreteValues) -> Result<L>,
    ) -> Result<Self> {
        check_distinct(keys)?;
        let mut sorted = keys.to_vec();
        sorted.sort();
        let mut path = DiscreteValues::new();
        Self::build_fn(&sorted, &mut path, &mut f)
    }

    fn build_fn(
        keys: &[DiscreteKey],
        path: &mut DiscreteValues,
        f: &mut impl FnMut(&DiscreteValues) -> Result<L>,
    ) -> Result<Self> {
        match keys.split_first() {
            None => Ok(DecisionTree::Leaf(f(path)?)),
            Some((key, rest)) => {
                let mut branches = Vec::with_capacity(key.cardinality);
                for v in 0..key.cardinality {
                    path.insert(key.key, v);
                    branches.push(Self::build_fn(rest, path, f)?);
                }
                path.remove(&key.key);
                Ok(Self::choice(*key, branches))
            }
        }
    }

    /// Maps every leaf.
    pub fn map<M: PartialEq>(&self, f: impl Fn(&L) -> M) -> DecisionTree<M> {
        self.map_ref(&f)
    }

    fn map_ref<M: PartialEq>(&self, f: &impl Fn(&L) -> M) -> DecisionTree<M> {
        match self {
            DecisionTree::Leaf(v) => DecisionTree::Leaf(f(v)),
            DecisionTree::Choice { key, branches } => {
                DecisionTree::choice(*key, branches.iter().map(|b| b.map_ref(f)).collect())
            }
        }
    }

    /// Maps every leaf with a fallible function, stopping at the first error.
    pub fn try_map<M: PartialEq>(&self, mut f: impl FnMut(&L) -> Result<M>) -> Result<DecisionTree<M>> {
        self.try_map_ref(&mut f)
    }

    fn try_map_ref<M: PartialEq>(
        &self,
        f: &mut impl FnMut(&L) -> Result<M>,
    ) -> Result<DecisionTree<M>> {
        match self {
            DecisionTree::Leaf(v) => Ok(DecisionTree::Leaf(f(v)?)),
            DecisionTree::Choice { key, branches } => {
                let mut mapped = Vec::with_capacity(branches.len());
                for b in branches {
                    mapped.push(b.try_map_ref(f)?);
                }
                Ok(DecisionTree::choice(*key, mapped))
            }
        }
    }

    /// Maps every leaf together with the partial assignment on its path.
    pub fn map_with_assignment<M: PartialEq>(
        &self,
        mut f: impl FnMut(&DiscreteValues, &L) -> M,
    ) -> DecisionTree<M> {
        let mut path = DiscreteValues::new();
        self.map_with_path(&mut path, &mut f)
    }

    fn map_with_path<M: PartialEq>(
        &self,
        path: &mut DiscreteValues,
        f: &mut impl FnMut(&DiscreteValues, &L) -> M,
    ) -> DecisionTree<M> {
        match self {
            DecisionTree::Leaf(v) => DecisionTree::Leaf(f(path, v)),
            DecisionTree::Choice { key, branches } => {
                let mut mapped = Vec::with_capacity(branches.len());
                for (value, b) in branches.iter().enumerate() {
                    path.insert(key.key, value);
                    mapped.push(b.map_with_path(path, f));
                }
                path.remove(&key.key);
                DecisionTree::choice(*key, mapped)
            }
        }
    }

    /// Rebuilds a tree of the same shape from new leaves given in the
    /// depth-first order of [`leaves`](Self::leaves).
    pub fn with_leaves<M: PartialEq>(&self, leaves: impl IntoIterator<Item = M>) -> Result<DecisionTree<M>> {
        let mut iter = leaves.into_iter();
        let tree = self.rebuild(&mut iter)?;
        if iter.next().is_some() {
            return Err(HybridError::DimensionMismatch {
                expected: self.leaf_count(),
                actual: self.leaf_count() + 1 + iter.count(),
                context: "replacement leaves".to_string(),
            });
        }
        Ok(tree)
    }

    fn rebuild<M: PartialEq>(&self, iter: &mut impl Iterator<Item = M>) -> Result<DecisionTree<M>> {
        match self {
            DecisionTree::Leaf(_) => iter.next().map(DecisionTree::Leaf).ok_or_else(|| {
                HybridError::DimensionMismatch {
                    expected: self.leaf_count(),
                    actual: 0,
                    context: "replacement leaves".to_string(),
                }
            }),
            DecisionTree::Choice { key, branches } => {
                let mut rebuilt = Vec::with_capacity(branches.len());
                for b in branches {
                    rebuilt.push(b.rebuild(iter)?);
                }
                Ok(DecisionTree::choice(*key, rebuilt))
            }
        }
    }

    /// Combines two trees pointwise.
    ///
    /// The result branches on the union of both key sets; each leaf is
    /// `f(left, right)` evaluated under the matching sub-assignment.
    pub fn apply<R, M: PartialEq>(
        &self,
        other: &DecisionTree<R>,
        f: impl Fn(&L, &R) -> M,
    ) -> Result<DecisionTree<M>> {
        apply_rec(self, other, &f)
    }
}

impl<L: Clone + PartialEq> DecisionTree<L> {
    /// Restricts the tree to a (partial) assignment.
    ///
    /// Keys with a value in `values` are removed; the rest remain.
    pub fn restrict(&self, values: &DiscreteValues) -> Result<Self> {
        match self {
            DecisionTree::Leaf(v) => Ok(DecisionTree::Leaf(v.clone())),
            DecisionTree::Choice { key, branches } => match values.get(&key.key) {
                Some(&value) => branches
                    .get(value)
                    .ok_or_else(|| {
                        HybridError::KeyMismatch(format!(
                            "value {} out of range for {} (cardinality {})",
                            value, key.key, key.cardinality
                        ))
                    })?
                    .restrict(values),
                None => {
                    let mut restricted = Vec::with_capacity(branches.len());
                    for b in branches {
                        restricted.push(b.restrict(values)?);
                    }
                    Ok(DecisionTree::choice(*key, restricted))
                }
            },
        }
    }

    /// Folds `key` out of the tree by combining its branches with `op`.
    ///
    /// Summing out a key the tree does not depend on combines
    /// `key.cardinality` copies of the tree.
    pub fn combine_out(&self, key: DiscreteKey, op: impl Fn(&L, &L) -> L) -> Result<Self> {
        let mut fixed = DiscreteValues::new();
        fixed.insert(key.key, 0);
        let mut acc = self.restrict(&fixed)?;
        for value in 1..key.cardinality {
            fixed.insert(key.key, value);
            acc = acc.apply(&self.restrict(&fixed)?, &op)?;
        }
        Ok(acc)
    }
}

fn apply_rec<L, R, M: PartialEq>(
    a: &DecisionTree<L>,
    b: &DecisionTree<R>,
    f: &impl Fn(&L, &R) -> M,
) -> Result<DecisionTree<M>> {
    let key = match (a, b) {
        (DecisionTree::Leaf(x), DecisionTree::Leaf(y)) => return Ok(DecisionTree::Leaf(f(x, y))),
        (DecisionTree::Choice { key, .. }, DecisionTree::Leaf(_)) => *key,
        (DecisionTree::Leaf(_), DecisionTree::Choice { key, .. }) => *key,
        (DecisionTree::Choice { key: ka, .. }, DecisionTree::Choice { key: kb, .. }) => {
            if ka.key == kb.key && ka.cardinality != kb.cardinality {
                return Err(HybridError::KeyMismatch(format!(
                    "{} has cardinality {} on one side and {} on the other",
                    ka.key, ka.cardinality, kb.cardinality
                )));
            }
            if ka.key <= kb.key {
                *ka
            } else {
                *kb
            }
        }
    };
    debug_assert!(a.top_key().map_or(true, |k| k.key >= key.key));
    debug_assert!(b.top_key().map_or(true, |k| k.key >= key.key));

    let mut branches = Vec::with_capacity(key.cardinality);
    for value in 0..key.cardinality {
        branches.push(apply_rec(a.branch(key.key, value), b.branch(key.key, value), f)?);
    }
    Ok(DecisionTree::choice(key, branches))
}

fn check_distinct(keys: &[DiscreteKey]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for k in keys {
        if !seen.insert(k.key) {
            return Err(HybridError::KeyMismatch(format!(
                "key {} listed more than once",
                k.key
            )));
        }
    }
    Ok(())
}
