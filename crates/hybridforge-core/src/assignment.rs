//! Discrete assignments.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::key::{DiscreteKey, Key};

/// An assignment of values to (a subset of) the discrete keys.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiscreteValues(BTreeMap<Key, usize>);

impl DiscreteValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an assignment from `(key, value)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Key, usize)>) -> Self {
        DiscreteValues(pairs.into_iter().collect())
    }

    /// Enumerates every assignment of `keys`.
    ///
    /// Order is lexicographic with the first key most significant, the same
    /// order [`DecisionTree::from_values`](crate::DecisionTree::from_values)
    /// expects its leaves in.
    ///
    /// ```
    /// use hybridforge_core::{DiscreteKey, DiscreteValues, Key};
    ///
    /// let a = DiscreteKey::new(Key::new(1), 2);
    /// let b = DiscreteKey::new(Key::new(2), 3);
    /// let all = DiscreteValues::cartesian_product(&[a, b]);
    /// assert_eq!(all.len(), 6);
    /// assert_eq!(all[1][&b.key], 1);
    /// assert_eq!(all[3][&a.key], 1);
    /// ```
    pub fn cartesian_product(keys: &[DiscreteKey]) -> Vec<DiscreteValues> {
        let mut result = vec![DiscreteValues::new()];
        for dk in keys {
            let mut next = Vec::with_capacity(result.len() * dk.cardinality);
            for partial in &result {
                for value in 0..dk.cardinality {
                    let mut assignment = partial.clone();
                    assignment.insert(dk.key, value);
                    next.push(assignment);
                }
            }
            result = next;
        }
        result
    }

    /// Returns the restriction of this assignment to `keys`.
    pub fn restricted_to(&self, keys: &[DiscreteKey]) -> DiscreteValues {
        DiscreteValues(
            keys.iter()
                .filter_map(|dk| self.0.get(&dk.key).map(|&v| (dk.key, v)))
                .collect(),
        )
    }

    /// Returns true if every key assigned in `other` has the same value here.
    pub fn agrees_with(&self, other: &DiscreteValues) -> bool {
        other
            .0
            .iter()
            .all(|(k, v)| self.0.get(k).map_or(true, |mine| mine == v))
    }
}

impl Deref for DiscreteValues {
    type Target = BTreeMap<Key, usize>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DiscreteValues {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(Key, usize)> for DiscreteValues {
    fn from_iter<I: IntoIterator<Item = (Key, usize)>>(iter: I) -> Self {
        DiscreteValues(iter.into_iter().collect())
    }
}

impl fmt::Debug for DiscreteValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for DiscreteValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        write!(f, "}}")
    }
}
