//! Hybrid factors: continuous, discrete or mode-switched Gaussian.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use hybridforge_core::{
    AlgebraicDecisionTree, DecisionTree, DecisionTreeFactor, DiscreteKey, DiscreteValues,
    HybridError, Key, Result,
};
use hybridforge_linear::{GaussianFactor, VectorValues};

use crate::values::HybridValues;

/// A Gaussian factor whose component is selected by discrete modes.
///
/// A `None` leaf marks a pruned branch; its error is infinite.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMixtureFactor {
    continuous_keys: SmallVec<[Key; 4]>,
    discrete_keys: SmallVec<[DiscreteKey; 4]>,
    components: DecisionTree<Option<GaussianFactor>>,
}

impl GaussianMixtureFactor {
    /// Creates a mixture with one component per assignment of
    /// `discrete_keys`, listed in lexicographic assignment order.
    pub fn new(discrete_keys: &[DiscreteKey], components: Vec<GaussianFactor>) -> Result<Self> {
        let tree = DecisionTree::from_values(discrete_keys, components.into_iter().map(Some).collect())?;
        Self::from_tree(discrete_keys, tree)
    }

    /// Wraps a component tree; the continuous keys are gathered from the
    /// components.
    pub fn from_tree(
        discrete_keys: &[DiscreteKey],
        components: DecisionTree<Option<GaussianFactor>>,
    ) -> Result<Self> {
        if let Some(extra) = components
            .keys()
            .into_iter()
            .find(|k| !discrete_keys.contains(k))
        {
            return Err(HybridError::KeyMismatch(format!(
                "mixture branches on {} outside its discrete keys",
                extra.key
            )));
        }

        let mut dims: BTreeMap<Key, usize> = BTreeMap::new();
        for factor in components.leaves().into_iter().flatten() {
            for (key, block) in factor.terms() {
                let dim = *dims.entry(key).or_insert(block.ncols());
                if dim != block.ncols() {
                    return Err(HybridError::DimensionMismatch {
                        expected: dim,
                        actual: block.ncols(),
                        context: format!("mixture components on {}", key),
                    });
                }
            }
        }

        let mut discrete: SmallVec<[DiscreteKey; 4]> = discrete_keys.iter().copied().collect();
        discrete.sort();
        Ok(GaussianMixtureFactor {
            continuous_keys: dims.into_keys().collect(),
            discrete_keys: discrete,
            components,
        })
    }

    pub fn continuous_keys(&self) -> &[Key] {
        &self.continuous_keys
    }

    pub fn discrete_keys(&self) -> &[DiscreteKey] {
        &self.discrete_keys
    }

    pub fn components(&self) -> &DecisionTree<Option<GaussianFactor>> {
        &self.components
    }

    /// The component selected by `assignment`, `None` if pruned.
    pub fn component(&self, assignment: &DiscreteValues) -> Result<Option<&GaussianFactor>> {
        Ok(self.components.evaluate(assignment)?.as_ref())
    }

    /// Error of the selected component; infinite on a pruned branch.
    pub fn error(&self, continuous: &VectorValues, discrete: &DiscreteValues) -> Result<f64> {
        match self.component(discrete)? {
            Some(f) => f.error(continuous),
            None => Ok(f64::INFINITY),
        }
    }

    /// Error of every component at `continuous`.
    pub fn error_tree(&self, continuous: &VectorValues) -> Result<AlgebraicDecisionTree> {
        self.components.try_map(|c| match c {
            Some(f) => f.error(continuous),
            None => Ok(f64::INFINITY),
        })
    }
}

/// Any factor of a hybrid graph.
#[derive(Debug, Clone, PartialEq)]
pub enum HybridFactor {
    Continuous(GaussianFactor),
    Discrete(DecisionTreeFactor),
    Mixture(GaussianMixtureFactor),
}

impl HybridFactor {
    pub fn continuous_keys(&self) -> &[Key] {
        match self {
            HybridFactor::Continuous(f) => f.keys(),
            HybridFactor::Discrete(_) => &[],
            HybridFactor::Mixture(m) => m.continuous_keys(),
        }
    }

    pub fn discrete_keys(&self) -> &[DiscreteKey] {
        match self {
            HybridFactor::Continuous(_) => &[],
            HybridFactor::Discrete(f) => f.keys(),
            HybridFactor::Mixture(m) => m.discrete_keys(),
        }
    }

    /// True if `key` is one of the factor's continuous or discrete keys.
    pub fn involves(&self, key: Key) -> bool {
        self.continuous_keys().contains(&key) || self.discrete_keys().iter().any(|k| k.key == key)
    }

    /// True if the factor has no keys at all.
    pub fn is_constant(&self) -> bool {
        self.continuous_keys().is_empty() && self.discrete_keys().is_empty()
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, HybridFactor::Continuous(_))
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, HybridFactor::Discrete(_))
    }

    pub fn is_hybrid(&self) -> bool {
        matches!(self, HybridFactor::Mixture(_))
    }

    /// Negative log of the factor's value at `values`.
    pub fn error(&self, values: &HybridValues) -> Result<f64> {
        match self {
            HybridFactor::Continuous(f) => f.error(values.continuous()),
            HybridFactor::Discrete(f) => f.error(values.discrete()),
            HybridFactor::Mixture(m) => m.error(values.continuous(), values.discrete()),
        }
    }
}

impl From<GaussianFactor> for HybridFactor {
    fn from(f: GaussianFactor) -> Self {
        HybridFactor::Continuous(f)
    }
}

impl From<DecisionTreeFactor> for HybridFactor {
    fn from(f: DecisionTreeFactor) -> Self {
        HybridFactor::Discrete(f)
    }
}

impl From<GaussianMixtureFactor> for HybridFactor {
    fn from(f: GaussianMixtureFactor) -> Self {
        HybridFactor::Mixture(f)
    }
}
