//! Conditional distributions of one discrete variable.

use smallvec::SmallVec;

use super::factor::DecisionTreeFactor;
use crate::assignment::DiscreteValues;
use crate::decision_tree::{AlgebraicDecisionTree, DecisionTree};
use crate::error::{HybridError, Result};
use crate::key::DiscreteKey;

/// `P(frontal | parents)` stored as a decision tree over frontal and parents.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteConditional {
    frontal: DiscreteKey,
    parents: SmallVec<[DiscreteKey; 4]>,
    table: AlgebraicDecisionTree,
}

impl DiscreteConditional {
    /// Builds `joint / marginal` where `marginal` is `joint` with `frontal`
    /// folded out.
    pub fn from_joint(
        joint: &DecisionTreeFactor,
        marginal: &DecisionTreeFactor,
        frontal: DiscreteKey,
    ) -> Result<Self> {
        if !joint.contains(frontal.key) {
            return Err(HybridError::KeyMismatch(format!(
                "joint does not involve frontal {}",
                frontal.key
            )));
        }
        let quotient = joint.divide(marginal)?;
        let parents = quotient
            .keys()
            .iter()
            .copied()
            .filter(|k| k.key != frontal.key)
            .collect();
        Ok(DiscreteConditional {
            frontal,
            parents,
            table: quotient.tree().clone(),
        })
    }

    /// Parses a table written as one row per parent assignment, each row a
    /// `/`-separated list of relative weights for the frontal values.
    ///
    /// Rows follow the lexicographic order of `parents` and are normalized
    /// independently.
    ///
    /// ```
    /// use hybridforge_core::{DiscreteConditional, DiscreteKey, DiscreteValues, Key};
    ///
    /// let m0 = DiscreteKey::new(Key::symbol('m', 0), 2);
    /// let m1 = DiscreteKey::new(Key::symbol('m', 1), 2);
    /// let cond = DiscreteConditional::from_signature(m1, &[m0], "1/3 1/1").unwrap();
    ///
    /// let at = DiscreteValues::from_pairs([(m0.key, 0), (m1.key, 1)]);
    /// assert_eq!(cond.evaluate(&at).unwrap(), 0.75);
    /// ```
    pub fn from_signature(
        frontal: DiscreteKey,
        parents: &[DiscreteKey],
        signature: &str,
    ) -> Result<Self> {
        let expected_rows: usize = parents.iter().map(|k| k.cardinality).product();
        let rows: Vec<&str> = signature.split_whitespace().collect();
        if rows.len() != expected_rows {
            return Err(HybridError::DimensionMismatch {
                expected: expected_rows,
                actual: rows.len(),
                context: format!("rows of the signature for {}", frontal.key),
            });
        }

        let mut values = Vec::with_capacity(expected_rows * frontal.cardinality);
        for row in rows {
            let weights = row
                .split('/')
                .map(|w| {
                    w.parse::<f64>()
                        .ok()
                        .filter(|v| *v >= 0.0 && v.is_finite())
                        .ok_or_else(|| {
                            HybridError::InvalidArgument(format!(
                                "bad weight '{}' in signature row '{}'",
                                w, row
                            ))
                        })
                })
                .collect::<Result<Vec<f64>>>()?;
            if weights.len() != frontal.cardinality {
                return Err(HybridError::DimensionMismatch {
                    expected: frontal.cardinality,
                    actual: weights.len(),
                    context: format!("signature row '{}'", row),
                });
            }
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                return Err(HybridError::InvalidArgument(format!(
                    "signature row '{}' has no mass",
                    row
                )));
            }
            values.extend(weights.iter().map(|w| w / total));
        }

        let mut keys: Vec<DiscreteKey> = parents.to_vec();
        keys.push(frontal);
        let table = DecisionTree::from_values(&keys, values)?;
        Ok(DiscreteConditional {
            frontal,
            parents: parents.iter().copied().collect(),
            table,
        })
    }

    /// Uniform distribution over `frontal` with no parents.
    pub fn uniform(frontal: DiscreteKey) -> Self {
        DiscreteConditional {
            frontal,
            parents: SmallVec::new(),
            table: DecisionTree::leaf(1.0 / frontal.cardinality as f64),
        }
    }

    pub fn frontal(&self) -> DiscreteKey {
        self.frontal
    }

    pub fn parents(&self) -> &[DiscreteKey] {
        &self.parents
    }

    /// Frontal followed by the parents.
    pub fn keys(&self) -> Vec<DiscreteKey> {
        std::iter::once(self.frontal)
            .chain(self.parents.iter().copied())
            .collect()
    }

    pub fn table(&self) -> &AlgebraicDecisionTree {
        &self.table
    }

    pub fn evaluate(&self, values: &DiscreteValues) -> Result<f64> {
        self.table.evaluate(values).copied()
    }

    /// `-ln P(frontal | parents)`.
    pub fn error(&self, values: &DiscreteValues) -> Result<f64> {
        Ok(-self.evaluate(values)?.ln())
    }

    /// Most probable frontal value given the parents fixed in `parents`.
    ///
    /// Ties go to the smallest value.
    pub fn argmax(&self, parents: &DiscreteValues) -> Result<usize> {
        let mut values = parents.restricted_to(&self.parents);
        let mut best = (0, f64::NEG_INFINITY);
        for v in 0..self.frontal.cardinality {
            values.insert(self.frontal.key, v);
            let p = self.evaluate(&values)?;
            if p > best.1 {
                best = (v, p);
            }
        }
        Ok(best.0)
    }

    /// The same table viewed as a factor over frontal and parents.
    pub fn to_factor(&self) -> Result<DecisionTreeFactor> {
        DecisionTreeFactor::from_tree(&self.keys(), self.table.clone())
    }
}
