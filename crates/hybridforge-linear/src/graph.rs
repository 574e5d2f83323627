//! Plain Gaussian factor graphs.

use std::collections::BTreeMap;

use hybridforge_core::{HybridError, Key, Result};

use crate::bayes_net::GaussianBayesNet;
use crate::elimination::eliminate_qr;
use crate::factor::GaussianFactor;
use crate::values::VectorValues;

/// An ordered collection of Gaussian factors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaussianFactorGraph {
    factors: Vec<GaussianFactor>,
}

impl GaussianFactorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, factor: GaussianFactor) {
        self.factors.push(factor);
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GaussianFactor> {
        self.factors.iter()
    }

    /// Every key with its dimension, sorted by key.
    pub fn dims(&self) -> BTreeMap<Key, usize> {
        self.factors
            .iter()
            .flat_map(|f| f.terms().map(|(k, b)| (k, b.ncols())))
            .collect()
    }

    /// Sum of factor errors.
    pub fn error(&self, values: &VectorValues) -> Result<f64> {
        self.factors.iter().map(|f| f.error(values)).sum()
    }

    /// Unnormalized density `exp(-error)`.
    pub fn prob_prime(&self, values: &VectorValues) -> Result<f64> {
        Ok((-self.error(values)?).exp())
    }

    /// Eliminates every variable in `ordering` and returns the Bayes net.
    ///
    /// # Errors
    ///
    /// `OrderingViolation` if `ordering` names a key no factor involves or
    /// leaves a key of the graph uneliminated.
    pub fn eliminate_sequential(
        &self,
        ordering: &[Key],
        rank_tolerance: f64,
    ) -> Result<GaussianBayesNet> {
        let mut working: Vec<GaussianFactor> = self.factors.clone();
        let mut net = GaussianBayesNet::new();
        for &key in ordering {
            let (involved, rest): (Vec<_>, Vec<_>) =
                working.into_iter().partition(|f| f.involves(key));
            if involved.is_empty() {
                return Err(HybridError::OrderingViolation(format!(
                    "{} is not a variable of the graph",
                    key
                )));
            }
            let refs: Vec<&GaussianFactor> = involved.iter().collect();
            let (conditional, residual) = eliminate_qr(&refs, key, rank_tolerance)?;
            net.push(conditional);
            working = rest;
            if !residual.is_constant() {
                working.push(residual);
            }
        }
        if let Some(left) = working.iter().find(|f| !f.is_constant()) {
            return Err(HybridError::OrderingViolation(format!(
                "ordering leaves {} uneliminated",
                left.keys()[0]
            )));
        }
        Ok(net)
    }

    /// Eliminates in key order and back-substitutes.
    pub fn optimize(&self, rank_tolerance: f64) -> Result<VectorValues> {
        let ordering: Vec<Key> = self.dims().into_keys().collect();
        self.eliminate_sequential(&ordering, rank_tolerance)?.optimize()
    }
}

impl From<Vec<GaussianFactor>> for GaussianFactorGraph {
    fn from(factors: Vec<GaussianFactor>) -> Self {
        GaussianFactorGraph { factors }
    }
}

impl FromIterator<GaussianFactor> for GaussianFactorGraph {
    fn from_iter<I: IntoIterator<Item = GaussianFactor>>(iter: I) -> Self {
        GaussianFactorGraph {
            factors: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a GaussianFactorGraph {
    type Item = &'a GaussianFactor;
    type IntoIter = std::slice::Iter<'a, GaussianFactor>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.iter()
    }
}
