//! HybridForge - Incremental hybrid estimation in Rust
//!
//! Estimate continuous states and discrete modes jointly: build a hybrid
//! factor graph, eliminate it into a hybrid Bayes net, and query the MAP
//! assignment. The smoother folds new measurements in step by step and keeps
//! the number of live mode hypotheses bounded.
//!
//! # Example
//!
//! ```rust
//! use hybridforge::prelude::*;
//! use hybridforge::symbol_shorthand::{m, x};
//! use nalgebra::{dmatrix, dvector};
//!
//! let mode = DiscreteKey::new(m(0), 2);
//! let stay = GaussianFactor::new(
//!     vec![(x(0), dmatrix![-1.0]), (x(1), dmatrix![1.0])],
//!     dvector![0.0],
//!     None,
//! )
//! .unwrap();
//! let step = GaussianFactor::new(
//!     vec![(x(0), dmatrix![-1.0]), (x(1), dmatrix![1.0])],
//!     dvector![1.0],
//!     None,
//! )
//! .unwrap();
//!
//! let mut graph = HybridGaussianFactorGraph::new();
//! graph.push(GaussianFactor::new(vec![(x(0), dmatrix![10.0])], dvector![0.0], None).unwrap());
//! graph.push(GaussianFactor::new(vec![(x(1), dmatrix![10.0])], dvector![10.0], None).unwrap());
//! graph.push(GaussianMixtureFactor::new(&[mode], vec![stay, step]).unwrap());
//!
//! let mut smoother = HybridSmoother::new();
//! let ordering = smoother.ordering_for(&graph).unwrap();
//! smoother.update(graph, &ordering, None).unwrap();
//!
//! let values = smoother.hybrid_bayes_net().optimize().unwrap();
//! assert_eq!(values.discrete()[&m(0)], 1);
//! ```

// Keys and discrete building blocks
pub use hybridforge_core::{
    eliminate_discrete, symbol_shorthand, AlgebraicDecisionTree, DecisionTree,
    DecisionTreeFactor, DiscreteConditional, DiscreteKey, DiscreteValues, EliminationMode,
    HybridError, Key, Result, VariableKind,
};

// Linear-Gaussian layer
pub use hybridforge_linear::{
    GaussianBayesNet, GaussianConditional, GaussianFactor, GaussianFactorGraph, NoiseModel,
    VectorValues, DEFAULT_RANK_TOLERANCE,
};

// Hybrid inference
pub use hybridforge_inference::{
    eliminate_partial_sequential, eliminate_sequential, BatchOrdering, GaussianMixture,
    GaussianMixtureFactor, HybridBayesNet, HybridConditional, HybridFactor,
    HybridGaussianFactorGraph, HybridSmoother, HybridValues, IncrementalOrdering, Linearize,
    Ordering, OrderingPolicy,
};

// Configuration
pub use hybridforge_config::{ConfigError, EliminationConfig, HybridConfig, SmootherConfig};

pub mod prelude {
    pub use super::{DecisionTreeFactor, DiscreteKey, DiscreteValues, EliminationMode, Key};
    pub use super::{GaussianFactor, NoiseModel, VectorValues};
    pub use super::{
        GaussianMixtureFactor, HybridBayesNet, HybridGaussianFactorGraph, HybridSmoother,
        HybridValues, Linearize, Ordering, OrderingPolicy,
    };
    pub use super::HybridConfig;
}
