//! HybridForge Core - Core types for hybrid continuous/discrete estimation
//!
//! This crate provides the foundations shared by the other HybridForge crates:
//! - Keys identifying continuous and discrete unknowns
//! - Discrete assignments
//! - Decision trees (piecewise functions over discrete assignments)
//! - Discrete factors, conditionals and discrete elimination
//! - The crate-wide error type

pub mod assignment;
pub mod decision_tree;
pub mod discrete;
pub mod error;
pub mod key;

pub use assignment::DiscreteValues;
pub use decision_tree::{AlgebraicDecisionTree, DecisionTree};
pub use discrete::{eliminate_discrete, DecisionTreeFactor, DiscreteConditional, EliminationMode};
pub use error::{HybridError, Result};
pub use key::{symbol_shorthand, DiscreteKey, Key, VariableKind};
