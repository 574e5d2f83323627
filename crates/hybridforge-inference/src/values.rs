//! Joint continuous and discrete solutions.

use hybridforge_core::DiscreteValues;
use hybridforge_linear::VectorValues;

/// A solution with a value for every continuous and discrete key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridValues {
    continuous: VectorValues,
    discrete: DiscreteValues,
}

impl HybridValues {
    pub fn new(continuous: VectorValues, discrete: DiscreteValues) -> Self {
        HybridValues {
            continuous,
            discrete,
        }
    }

    pub fn continuous(&self) -> &VectorValues {
        &self.continuous
    }

    pub fn discrete(&self) -> &DiscreteValues {
        &self.discrete
    }

    pub fn into_parts(self) -> (VectorValues, DiscreteValues) {
        (self.continuous, self.discrete)
    }
}
