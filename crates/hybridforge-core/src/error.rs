//! Error types for HybridForge

use thiserror::Error;

use crate::assignment::DiscreteValues;
use crate::key::Key;

/// Main error type for HybridForge operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HybridError {
    /// Supplied elimination ordering breaks a structural constraint.
    #[error("Ordering violation: {0}")]
    OrderingViolation(String),

    /// A Gaussian elimination step met a singular or rank-deficient system.
    #[error("Numerical failure eliminating {key} under {assignment}: {reason}")]
    NumericalFailure {
        key: Key,
        assignment: DiscreteValues,
        reason: String,
    },

    /// Pruning (or a fully pruned branch set) would leave nothing behind.
    #[error("Empty prune result: {0}")]
    EmptyPruneResult(String),

    /// Key sets of two operands are incompatible with the operation.
    #[error("Key mismatch: {0}")]
    KeyMismatch(String),

    /// Matrix or vector dimensions disagree.
    #[error("Dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    /// A solve was asked to use a branch that pruning removed.
    #[error("Branch of {key} under {assignment} was pruned")]
    PrunedBranch { key: Key, assignment: DiscreteValues },

    /// Invalid argument passed by the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl HybridError {
    /// Attaches the discrete assignment a numerical failure happened under.
    ///
    /// Other variants are returned unchanged.
    pub fn at_assignment(self, assignment: &DiscreteValues) -> Self {
        match self {
            HybridError::NumericalFailure { key, reason, .. } => HybridError::NumericalFailure {
                key,
                assignment: assignment.clone(),
                reason,
            },
            other => other,
        }
    }
}

/// Result type alias for HybridForge operations
pub type Result<T> = std::result::Result<T, HybridError>;
