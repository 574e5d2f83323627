//! Hybrid Gaussian factor graphs.

use std::collections::{BTreeMap, BTreeSet};

use hybridforge_config::EliminationConfig;
use hybridforge_core::{
    AlgebraicDecisionTree, DecisionTree, DecisionTreeFactor, DiscreteKey, DiscreteValues,
    EliminationMode, HybridError, Key, Result, VariableKind,
};
use hybridforge_linear::{GaussianFactorGraph, VectorValues};

use crate::bayes_net::HybridBayesNet;
use crate::elimination::eliminate_sequential;
use crate::factor::HybridFactor;
use crate::ordering::Ordering;
use crate::values::HybridValues;

/// An ordered multiset of hybrid factors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridGaussianFactorGraph {
    factors: Vec<HybridFactor>,
}

impl HybridGaussianFactorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factor.
    pub fn push(&mut self, factor: impl Into<HybridFactor>) {
        self.factors.push(factor.into());
    }

    /// Adds every factor of `other`.
    pub fn extend(&mut self, other: impl IntoIterator<Item = HybridFactor>) {
        self.factors.extend(other);
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HybridFactor> {
        self.factors.iter()
    }

    pub fn get(&self, index: usize) -> Option<&HybridFactor> {
        self.factors.get(index)
    }

    /// Keeps only the first `len` factors.
    pub fn truncate(&mut self, len: usize) {
        self.factors.truncate(len);
    }

    /// Kind and size of every variable referenced by the factors.
    ///
    /// # Errors
    ///
    /// `KeyMismatch` if a key is used both as continuous and discrete, or
    /// with two different dimensions or cardinalities.
    pub fn variable_kinds(&self) -> Result<BTreeMap<Key, VariableKind>> {
        let mut kinds: BTreeMap<Key, VariableKind> = BTreeMap::new();
        let mut record = |key: Key, kind: VariableKind| -> Result<()> {
            match kinds.get(&key).copied() {
                Some(existing) if existing != kind => Err(HybridError::KeyMismatch(format!(
                    "{} is used as {:?} and as {:?}",
                    key, existing, kind
                ))),
                Some(_) => Ok(()),
                None => {
                    kinds.insert(key, kind);
                    Ok(())
                }
            }
        };
        for factor in &self.factors {
            for dk in factor.discrete_keys() {
                record(
                    dk.key,
                    VariableKind::Discrete {
                        cardinality: dk.cardinality,
                    },
                )?;
            }
            match factor {
                HybridFactor::Continuous(f) => {
                    for (key, block) in f.terms() {
                        record(key, VariableKind::Continuous { dim: block.ncols() })?;
                    }
                }
                HybridFactor::Mixture(m) => {
                    for f in m.components().leaves().into_iter().flatten() {
                        for (key, block) in f.terms() {
                            record(key, VariableKind::Continuous { dim: block.ncols() })?;
                        }
                    }
                }
                HybridFactor::Discrete(_) => {}
            }
        }
        Ok(kinds)
    }

    /// Every key, sorted.
    pub fn keys(&self) -> BTreeSet<Key> {
        self.factors
            .iter()
            .flat_map(|f| {
                f.continuous_keys()
                    .iter()
                    .copied()
                    .chain(f.discrete_keys().iter().map(|k| k.key))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Continuous keys, sorted.
    pub fn continuous_keys(&self) -> Vec<Key> {
        self.factors
            .iter()
            .flat_map(|f| f.continuous_keys().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Discrete keys, sorted.
    pub fn discrete_keys(&self) -> Vec<DiscreteKey> {
        self.factors
            .iter()
            .flat_map(|f| f.discrete_keys().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sum of factor errors at `values`.
    pub fn error(&self, values: &HybridValues) -> Result<f64> {
        self.factors.iter().map(|f| f.error(values)).sum()
    }

    /// Unnormalized probability `exp(-error)`.
    pub fn prob_prime(&self, values: &HybridValues) -> Result<f64> {
        Ok((-self.error(values)?).exp())
    }

    /// Error of the continuous and mixture factors only.
    pub fn continuous_error(
        &self,
        continuous: &VectorValues,
        discrete: &DiscreteValues,
    ) -> Result<f64> {
        let mut total = 0.0;
        for factor in &self.factors {
            total += match factor {
                HybridFactor::Continuous(f) => f.error(continuous)?,
                HybridFactor::Mixture(m) => m.error(continuous, discrete)?,
                HybridFactor::Discrete(_) => 0.0,
            };
        }
        Ok(total)
    }

    /// The plain Gaussian graph selected by `assignment`.
    ///
    /// Discrete factors are dropped.
    ///
    /// # Errors
    ///
    /// `PrunedBranch` if `assignment` selects a pruned mixture component.
    pub fn choose(&self, assignment: &DiscreteValues) -> Result<GaussianFactorGraph> {
        let mut graph = GaussianFactorGraph::new();
        for factor in &self.factors {
            match factor {
                HybridFactor::Continuous(f) => graph.push(f.clone()),
                HybridFactor::Mixture(m) => match m.component(assignment)? {
                    Some(f) => graph.push(f.clone()),
                    None => {
                        return Err(HybridError::PrunedBranch {
                            key: m.continuous_keys().first().copied().unwrap_or(Key::new(0)),
                            assignment: assignment.restricted_to(m.discrete_keys()),
                        })
                    }
                },
                HybridFactor::Discrete(_) => {}
            }
        }
        Ok(graph)
    }

    /// Per-assignment continuous solutions of a Bayes net produced by
    /// eliminating this graph's continuous keys.
    ///
    /// The tree spans every discrete parent of the net's Gaussian
    /// conditionals; pruned branches hold `None`.
    pub fn continuous_delta(
        &self,
        bayes_net: &HybridBayesNet,
    ) -> Result<DecisionTree<Option<VectorValues>>> {
        DecisionTree::try_from_fn(&bayes_net.continuous_discrete_keys(), |assignment| {
            match bayes_net.optimize_continuous(assignment) {
                Ok(values) => Ok(Some(values)),
                Err(HybridError::PrunedBranch { .. }) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }

    /// `exp(-error)` of the continuous part of the graph at each branch
    /// solution of `bayes_net`; zero for pruned branches.
    pub fn continuous_prob_primes(
        &self,
        bayes_net: &HybridBayesNet,
    ) -> Result<AlgebraicDecisionTree> {
        let delta = self.continuous_delta(bayes_net)?;
        let mut keys: BTreeSet<DiscreteKey> =
            bayes_net.continuous_discrete_keys().into_iter().collect();
        for factor in &self.factors {
            if let HybridFactor::Mixture(m) = factor {
                keys.extend(m.discrete_keys().iter().copied());
            }
        }
        let keys: Vec<DiscreteKey> = keys.into_iter().collect();
        DecisionTree::try_from_fn(&keys, |assignment| match delta.evaluate(assignment)? {
            Some(values) => Ok((-self.continuous_error(values, assignment)?).exp()),
            None => Ok(0.0),
        })
    }

    /// Normalized posterior over every discrete key with the continuous keys
    /// integrated out.
    ///
    /// Eliminates a copy of the graph in sum-product mode, whatever mode
    /// `config` names.
    pub fn discrete_posterior(&self, config: &EliminationConfig) -> Result<DecisionTreeFactor> {
        let config = EliminationConfig {
            mode: EliminationMode::SumProduct,
            ..config.clone()
        };
        let ordering = Ordering::continuous_first(self)?;
        let bayes_net = eliminate_sequential(self, &ordering, &config)?;
        bayes_net.discrete_joint()?.normalize()
    }
}

impl From<Vec<HybridFactor>> for HybridGaussianFactorGraph {
    fn from(factors: Vec<HybridFactor>) -> Self {
        HybridGaussianFactorGraph { factors }
    }
}

impl FromIterator<HybridFactor> for HybridGaussianFactorGraph {
    fn from_iter<I: IntoIterator<Item = HybridFactor>>(iter: I) -> Self {
        HybridGaussianFactorGraph {
            factors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for HybridGaussianFactorGraph {
    type Item = HybridFactor;
    type IntoIter = std::vec::IntoIter<HybridFactor>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.into_iter()
    }
}

impl<'a> IntoIterator for &'a HybridGaussianFactorGraph {
    type Item = &'a HybridFactor;
    type IntoIter = std::slice::Iter<'a, HybridFactor>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.iter()
    }
}
