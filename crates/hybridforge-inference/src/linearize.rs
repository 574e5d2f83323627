//! Boundary to nonlinear models.

use hybridforge_core::Result;
use hybridforge_linear::VectorValues;

use crate::graph::HybridGaussianFactorGraph;

/// A model that can be linearized into hybrid Gaussian factors.
///
/// The returned factors are expressed in the tangent delta around `point`:
/// solving them gives the correction to add to the linearization point.
pub trait Linearize {
    fn linearize(&self, point: &VectorValues) -> Result<HybridGaussianFactorGraph>;
}
