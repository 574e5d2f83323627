//! Discrete factors, conditionals and single-variable discrete elimination.

mod conditional;
mod factor;

#[cfg(test)]
mod tests;

pub use conditional::DiscreteConditional;
pub use factor::DecisionTreeFactor;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::key::DiscreteKey;

/// How a discrete variable is folded out of its joint.
///
/// `MaxProduct` keeps the best value of the eliminated variable for every
/// assignment of the rest, which makes back-substitution return the joint
/// MAP. `SumProduct` sums it out, which yields true marginals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EliminationMode {
    #[default]
    MaxProduct,
    SumProduct,
}

/// Eliminates `frontal` from the product of `factors`.
///
/// Returns `P(frontal | rest) = joint / marginal` together with the marginal
/// over the remaining keys. With no factors the conditional is uniform and
/// the marginal is the constant `cardinality`.
pub fn eliminate_discrete(
    factors: &[DecisionTreeFactor],
    frontal: DiscreteKey,
    mode: EliminationMode,
) -> Result<(DiscreteConditional, DecisionTreeFactor)> {
    let mut joint = DecisionTreeFactor::constant_over(&[frontal], 1.0)?;
    for factor in factors {
        joint = joint.multiply(factor)?;
    }
    let marginal = joint.marginalize(frontal.key, mode)?;
    let conditional = DiscreteConditional::from_joint(&joint, &marginal, frontal)?;
    Ok((conditional, marginal))
}
