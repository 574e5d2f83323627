//! Hybrid conditionals: one frontal variable given its parents.

use std::collections::BTreeSet;

use smallvec::SmallVec;

use hybridforge_core::{
    DecisionTree, DecisionTreeFactor, DiscreteConditional, DiscreteKey, DiscreteValues,
    HybridError, Key, Result,
};
use hybridforge_linear::{GaussianConditional, VectorValues};

use crate::factor::{GaussianMixtureFactor, HybridFactor};
use crate::values::HybridValues;

/// A Gaussian conditional on one continuous frontal whose parameters are
/// selected by discrete parents.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMixture {
    frontal: Key,
    continuous_parents: SmallVec<[Key; 4]>,
    discrete_parents: SmallVec<[DiscreteKey; 4]>,
    conditionals: DecisionTree<Option<GaussianConditional>>,
}

impl GaussianMixture {
    /// Wraps a tree of per-assignment conditionals on `frontal`.
    pub fn new(
        frontal: Key,
        discrete_parents: &[DiscreteKey],
        conditionals: DecisionTree<Option<GaussianConditional>>,
    ) -> Result<Self> {
        if let Some(extra) = conditionals
            .keys()
            .into_iter()
            .find(|k| !discrete_parents.contains(k))
        {
            return Err(HybridError::KeyMismatch(format!(
                "mixture on {} branches on {} outside its discrete parents",
                frontal, extra.key
            )));
        }
        let mut continuous_parents = BTreeSet::new();
        for c in conditionals.leaves().into_iter().flatten() {
            if c.frontal() != frontal {
                return Err(HybridError::KeyMismatch(format!(
                    "mixture on {} holds a conditional on {}",
                    frontal,
                    c.frontal()
                )));
            }
            continuous_parents.extend(c.parents());
        }
        let mut discrete: SmallVec<[DiscreteKey; 4]> = discrete_parents.iter().copied().collect();
        discrete.sort();
        Ok(GaussianMixture {
            frontal,
            continuous_parents: continuous_parents.into_iter().collect(),
            discrete_parents: discrete,
            conditionals,
        })
    }

    pub fn frontal(&self) -> Key {
        self.frontal
    }

    pub fn continuous_parents(&self) -> &[Key] {
        &self.continuous_parents
    }

    pub fn discrete_parents(&self) -> &[DiscreteKey] {
        &self.discrete_parents
    }

    pub fn conditionals(&self) -> &DecisionTree<Option<GaussianConditional>> {
        &self.conditionals
    }

    /// The conditional selected by `assignment`.
    ///
    /// # Errors
    ///
    /// `PrunedBranch` if pruning removed that branch.
    pub fn choose(&self, assignment: &DiscreteValues) -> Result<&GaussianConditional> {
        self.conditionals
            .evaluate(assignment)?
            .as_ref()
            .ok_or_else(|| HybridError::PrunedBranch {
                key: self.frontal,
                assignment: assignment.restricted_to(&self.discrete_parents),
            })
    }

    /// Error of the selected conditional; infinite on a pruned branch.
    pub fn error(&self, continuous: &VectorValues, discrete: &DiscreteValues) -> Result<f64> {
        match self.conditionals.evaluate(discrete)? {
            Some(c) => c.error(continuous),
            None => Ok(f64::INFINITY),
        }
    }

    /// Drops every branch whose discrete parents have zero max-marginal in
    /// `joint`.
    pub fn prune(&self, joint: &DecisionTreeFactor) -> Result<Self> {
        let mut in_joint: Vec<DiscreteKey> = self
            .discrete_parents
            .iter()
            .copied()
            .filter(|k| joint.contains(k.key))
            .collect();
        in_joint.sort();
        let marginal = joint.max_marginal(&in_joint)?;
        let conditionals = DecisionTree::try_from_fn(&self.discrete_parents, |assignment| {
            if marginal.evaluate(assignment)? == 0.0 {
                Ok(None)
            } else {
                Ok(self.conditionals.evaluate(assignment)?.clone())
            }
        })?;
        Ok(GaussianMixture {
            conditionals,
            ..self.clone()
        })
    }

    /// `exp(Σ ln|R_ii| − max)` per branch: the normalization the branch
    /// conditionals carry relative to their unnormalized quadratic form.
    pub fn normalization_factor(&self) -> Result<DecisionTreeFactor> {
        let log_dets = self
            .conditionals
            .map(|c| c.as_ref().map_or(f64::NEG_INFINITY, |c| c.log_det()));
        let max = log_dets.max_value();
        DecisionTreeFactor::from_tree(
            &self.discrete_parents,
            log_dets.map(|ld| if ld.is_finite() { (ld - max).exp() } else { 0.0 }),
        )
    }

    /// The quadratic of every branch as a mixture factor.
    pub fn to_factor(&self) -> Result<GaussianMixtureFactor> {
        GaussianMixtureFactor::from_tree(
            &self.discrete_parents,
            self.conditionals.map(|c| c.as_ref().map(|c| c.to_factor())),
        )
    }
}

/// Any conditional of a hybrid Bayes net.
#[derive(Debug, Clone, PartialEq)]
pub enum HybridConditional {
    Continuous(GaussianConditional),
    Discrete(DiscreteConditional),
    Mixture(GaussianMixture),
}

impl HybridConditional {
    pub fn frontal(&self) -> Key {
        match self {
            HybridConditional::Continuous(c) => c.frontal(),
            HybridConditional::Discrete(c) => c.frontal().key,
            HybridConditional::Mixture(m) => m.frontal(),
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, HybridConditional::Discrete(_))
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, HybridConditional::Continuous(_))
    }

    pub fn is_hybrid(&self) -> bool {
        matches!(self, HybridConditional::Mixture(_))
    }

    pub fn continuous_parents(&self) -> Vec<Key> {
        match self {
            HybridConditional::Continuous(c) => c.parents().collect(),
            HybridConditional::Discrete(_) => Vec::new(),
            HybridConditional::Mixture(m) => m.continuous_parents().to_vec(),
        }
    }

    pub fn discrete_parents(&self) -> &[DiscreteKey] {
        match self {
            HybridConditional::Continuous(_) => &[],
            HybridConditional::Discrete(c) => c.parents(),
            HybridConditional::Mixture(m) => m.discrete_parents(),
        }
    }

    /// Negative log of the conditional's unnormalized value.
    pub fn error(&self, values: &HybridValues) -> Result<f64> {
        match self {
            HybridConditional::Continuous(c) => c.error(values.continuous()),
            HybridConditional::Discrete(c) => c.error(values.discrete()),
            HybridConditional::Mixture(m) => m.error(values.continuous(), values.discrete()),
        }
    }

    /// The conditional as a factor, for re-elimination.
    pub fn to_factor(&self) -> Result<HybridFactor> {
        Ok(match self {
            HybridConditional::Continuous(c) => HybridFactor::Continuous(c.to_factor()),
            HybridConditional::Discrete(c) => HybridFactor::Discrete(c.to_factor()?),
            HybridConditional::Mixture(m) => HybridFactor::Mixture(m.to_factor()?),
        })
    }
}

impl From<GaussianConditional> for HybridConditional {
    fn from(c: GaussianConditional) -> Self {
        HybridConditional::Continuous(c)
    }
}

impl From<DiscreteConditional> for HybridConditional {
    fn from(c: DiscreteConditional) -> Self {
        HybridConditional::Discrete(c)
    }
}

impl From<GaussianMixture> for HybridConditional {
    fn from(m: GaussianMixture) -> Self {
        HybridConditional::Mixture(m)
    }
}
