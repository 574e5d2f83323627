//! Hybrid Bayes nets: the output of elimination.

use std::collections::BTreeSet;

use tracing::debug;

use hybridforge_core::{
    eliminate_discrete, DecisionTreeFactor, DiscreteConditional, DiscreteKey, DiscreteValues,
    EliminationMode, Result,
};
use hybridforge_linear::{GaussianBayesNet, VectorValues};

use crate::conditional::HybridConditional;
use crate::graph::HybridGaussianFactorGraph;
use crate::values::HybridValues;

/// Conditionals in elimination order.
///
/// A conditional's parents are always eliminated after it, so solving runs
/// from the back of the net to the front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridBayesNet {
    conditionals: Vec<HybridConditional>,
}

impl HybridBayesNet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, conditional: impl Into<HybridConditional>) {
        self.conditionals.push(conditional.into());
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = HybridConditional>) {
        self.conditionals.extend(other);
    }

    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HybridConditional> {
        self.conditionals.iter()
    }

    pub fn at(&self, index: usize) -> Option<&HybridConditional> {
        self.conditionals.get(index)
    }

    /// Frontal keys of the discrete conditionals, sorted.
    pub fn discrete_keys(&self) -> Vec<DiscreteKey> {
        self.discrete_conditionals()
            .map(|c| c.frontal())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Discrete parents of the Gaussian mixtures, sorted.
    pub fn continuous_discrete_keys(&self) -> Vec<DiscreteKey> {
        self.conditionals
            .iter()
            .filter(|c| !c.is_discrete())
            .flat_map(|c| c.discrete_parents().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn discrete_conditionals(&self) -> impl Iterator<Item = &DiscreteConditional> {
        self.conditionals.iter().filter_map(|c| match c {
            HybridConditional::Discrete(d) => Some(d),
            _ => None,
        })
    }

    /// Product of every discrete conditional.
    ///
    /// Under max-product elimination this is the max-marginal of the modes
    /// scaled so the best assignment has value 1; under sum-product it is the
    /// normalized mode posterior.
    pub fn discrete_joint(&self) -> Result<DecisionTreeFactor> {
        let mut joint = DecisionTreeFactor::constant(1.0);
        for c in self.discrete_conditionals() {
            joint = joint.multiply(&c.to_factor()?)?;
        }
        Ok(joint)
    }

    /// The Gaussian Bayes net selected by `assignment`.
    ///
    /// # Errors
    ///
    /// `PrunedBranch` if some mixture has no conditional for `assignment`.
    pub fn choose(&self, assignment: &DiscreteValues) -> Result<GaussianBayesNet> {
        let mut net = GaussianBayesNet::new();
        for c in &self.conditionals {
            match c {
                HybridConditional::Continuous(g) => net.push(g.clone()),
                HybridConditional::Mixture(m) => net.push(m.choose(assignment)?.clone()),
                HybridConditional::Discrete(_) => {}
            }
        }
        Ok(net)
    }

    /// Back-substitutes the continuous conditionals under `assignment`.
    pub fn optimize_continuous(&self, assignment: &DiscreteValues) -> Result<VectorValues> {
        self.choose(assignment)?.optimize()
    }

    /// Most probable assignment of every variable.
    ///
    /// Discrete keys are chosen by argmax from the back of the net, then the
    /// continuous keys are solved under that assignment.
    pub fn optimize(&self) -> Result<HybridValues> {
        self.optimize_with(&DiscreteValues::new())
    }

    /// Most probable assignment with the discrete keys in `given` fixed.
    ///
    /// The discrete joint is conditioned on `given` and the free keys are
    /// max-eliminated again in the net's frontal order, so a fixed child also
    /// informs the choice of its ancestors.
    pub fn optimize_with(&self, given: &DiscreteValues) -> Result<HybridValues> {
        let mut discrete = given.clone();
        if given.is_empty() {
            for d in self.discrete_conditionals().collect::<Vec<_>>().into_iter().rev() {
                let value = d.argmax(&discrete)?;
                discrete.insert(d.frontal().key, value);
            }
        } else {
            let mut marginal = self.discrete_joint()?.restrict(given)?;
            let mut free = Vec::new();
            for c in self.discrete_conditionals() {
                if given.contains_key(&c.frontal().key) {
                    continue;
                }
                let (conditional, rest) =
                    eliminate_discrete(&[marginal], c.frontal(), EliminationMode::MaxProduct)?;
                free.push(conditional);
                marginal = rest;
            }
            for d in free.iter().rev() {
                let value = d.argmax(&discrete)?;
                discrete.insert(d.frontal().key, value);
            }
        }
        let continuous = self.optimize_continuous(&discrete)?;
        Ok(HybridValues::new(continuous, discrete))
    }

    /// Sum of the conditional errors at `values`.
    pub fn error(&self, values: &HybridValues) -> Result<f64> {
        self.conditionals.iter().map(|c| c.error(values)).sum()
    }

    /// Keeps the `max_leaves` most probable mode assignments.
    ///
    /// The discrete conditionals are rebuilt from the pruned joint in the
    /// same frontal order, and every mixture loses the branches whose modes
    /// became impossible. A net without discrete conditionals is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// `EmptyPruneResult` if `max_leaves` is zero or the joint is all zero.
    pub fn prune(&self, max_leaves: usize, mode: EliminationMode) -> Result<Self> {
        if self.discrete_conditionals().next().is_none() {
            return Ok(self.clone());
        }
        let joint = self.discrete_joint()?;
        let pruned = joint.prune(max_leaves)?;
        debug!(
            event = "prune",
            max_leaves = max_leaves,
            nonzero_before = joint.nonzero_count()?,
            nonzero_after = pruned.nonzero_count()?,
        );
        self.rebuild_from_joint(&pruned, mode)
    }

    /// Drops mode assignments whose normalized probability is below `floor`.
    pub fn prune_below(&self, floor: f64, mode: EliminationMode) -> Result<Self> {
        if self.discrete_conditionals().next().is_none() {
            return Ok(self.clone());
        }
        let joint = self.discrete_joint()?;
        let pruned = joint.prune_below(floor)?;
        debug!(
            event = "prune_below",
            floor = floor,
            nonzero_before = joint.nonzero_count()?,
            nonzero_after = pruned.nonzero_count()?,
        );
        self.rebuild_from_joint(&pruned, mode)
    }

    fn rebuild_from_joint(&self, joint: &DecisionTreeFactor, mode: EliminationMode) -> Result<Self> {
        let mut rebuilt = Vec::new();
        let mut marginal = joint.clone();
        for c in self.discrete_conditionals() {
            let (conditional, rest) = eliminate_discrete(&[marginal], c.frontal(), mode)?;
            rebuilt.push(conditional);
            marginal = rest;
        }

        let mut rebuilt = rebuilt.into_iter();
        let mut conditionals = Vec::with_capacity(self.conditionals.len());
        for c in &self.conditionals {
            conditionals.push(match c {
                HybridConditional::Discrete(_) => match rebuilt.next() {
                    Some(d) => HybridConditional::Discrete(d),
                    None => c.clone(),
                },
                HybridConditional::Mixture(m) => HybridConditional::Mixture(m.prune(joint)?),
                HybridConditional::Continuous(_) => c.clone(),
            });
        }
        Ok(HybridBayesNet { conditionals })
    }

    /// Every conditional as a factor.
    pub fn to_factor_graph(&self) -> Result<HybridGaussianFactorGraph> {
        self.conditionals.iter().map(HybridConditional::to_factor).collect()
    }
}

impl FromIterator<HybridConditional> for HybridBayesNet {
    fn from_iter<I: IntoIterator<Item = HybridConditional>>(iter: I) -> Self {
        HybridBayesNet {
            conditionals: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for HybridBayesNet {
    type Item = HybridConditional;
    type IntoIter = std::vec::IntoIter<HybridConditional>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditionals.into_iter()
    }
}

impl<'a> IntoIterator for &'a HybridBayesNet {
    type Item = &'a HybridConditional;
    type IntoIter = std::slice::Iter<'a, HybridConditional>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditionals.iter()
    }
}
