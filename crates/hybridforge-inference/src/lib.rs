//! HybridForge Inference - Hybrid elimination and incremental smoothing
//!
//! This crate ties the continuous and discrete layers together:
//! - Hybrid factors and conditionals, including mode-switched Gaussians
//! - Hybrid factor graphs and elimination orderings
//! - Branch-parallel sequential elimination into hybrid Bayes nets
//! - MAP queries, mode pruning and the incremental smoother

pub mod bayes_net;
pub mod conditional;
pub mod elimination;
pub mod factor;
pub mod graph;
pub mod linearize;
pub mod ordering;
pub mod smoother;
pub mod values;

#[cfg(test)]
mod test_utils;

pub use bayes_net::HybridBayesNet;
pub use conditional::{GaussianMixture, HybridConditional};
pub use elimination::{eliminate_partial_sequential, eliminate_sequential};
pub use factor::{GaussianMixtureFactor, HybridFactor};
pub use graph::HybridGaussianFactorGraph;
pub use linearize::Linearize;
pub use ordering::{BatchOrdering, IncrementalOrdering, Ordering, OrderingPolicy};
pub use smoother::HybridSmoother;
pub use values::HybridValues;
