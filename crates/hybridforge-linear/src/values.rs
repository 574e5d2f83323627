//! Continuous solution vectors keyed by variable.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use nalgebra::DVector;

use hybridforge_core::Key;

/// One vector per continuous key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorValues(BTreeMap<Key, DVector<f64>>);

impl VectorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a scalar-valued variable.
    pub fn insert_scalar(&mut self, key: Key, value: f64) {
        self.0.insert(key, DVector::from_element(1, value));
    }

    /// Adds `delta` to the matching entries.
    ///
    /// Keys present only in `self` are kept unchanged; keys present only in
    /// `delta` are inserted as-is.
    pub fn retract(&self, delta: &VectorValues) -> VectorValues {
        let mut out = self.clone();
        for (k, d) in delta.iter() {
            let entry = out.0.entry(*k).or_insert_with(|| DVector::zeros(d.len()));
            if entry.len() == d.len() {
                *entry += d;
            } else {
                *entry = d.clone();
            }
        }
        out
    }

    /// True if both hold the same keys and every entry agrees within `tol`.
    pub fn equals(&self, other: &VectorValues, tol: f64) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| {
                other.get(k).map_or(false, |w| {
                    v.len() == w.len() && v.iter().zip(w.iter()).all(|(a, b)| (a - b).abs() <= tol)
                })
            })
    }
}

impl Deref for VectorValues {
    type Target = BTreeMap<Key, DVector<f64>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for VectorValues {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(Key, DVector<f64>)> for VectorValues {
    fn from_iter<I: IntoIterator<Item = (Key, DVector<f64>)>>(iter: I) -> Self {
        VectorValues(iter.into_iter().collect())
    }
}
