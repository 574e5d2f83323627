//! 1-D factors on scalar unknowns.
//!
//! Each factor is linearized into the tangent delta around a point, so the
//! solution of the linearized graph is the correction to add to that point.

use nalgebra::{dvector, DMatrix};

use hybridforge_core::{DecisionTreeFactor, DiscreteKey, HybridError, Key, Result};
use hybridforge_inference::{
    GaussianMixtureFactor, HybridFactor, HybridGaussianFactorGraph, Linearize,
};
use hybridforge_linear::{GaussianFactor, NoiseModel, VectorValues};

/// A factor of the scalar model.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarFactor {
    /// `x ~ N(measured, sigma²)`.
    Prior { key: Key, measured: f64, sigma: f64 },
    /// `to - from ~ N(measured, sigma²)`.
    Between {
        from: Key,
        to: Key,
        measured: f64,
        sigma: f64,
    },
    /// `to - from ~ N(means[mode], sigma²)`.
    Switching {
        from: Key,
        to: Key,
        mode: DiscreteKey,
        means: Vec<f64>,
        sigma: f64,
    },
    /// A discrete factor, unchanged by linearization.
    Discrete(DecisionTreeFactor),
}

impl ScalarFactor {
    /// Linearizes this factor around `point`.
    pub fn linearize(&self, point: &VectorValues) -> Result<HybridFactor> {
        match self {
            ScalarFactor::Prior {
                key,
                measured,
                sigma,
            } => Ok(prior_factor(*key, *measured, *sigma, value_at(point, *key)?)?.into()),
            ScalarFactor::Between {
                from,
                to,
                measured,
                sigma,
            } => {
                let at = (value_at(point, *from)?, value_at(point, *to)?);
                Ok(between_factor(*from, *to, *measured, *sigma, at)?.into())
            }
            ScalarFactor::Switching {
                from,
                to,
                mode,
                means,
                sigma,
            } => {
                if means.len() != mode.cardinality {
                    return Err(HybridError::DimensionMismatch {
                        expected: mode.cardinality,
                        actual: means.len(),
                        context: format!("means of the switching factor on {}", mode.key),
                    });
                }
                let at = (value_at(point, *from)?, value_at(point, *to)?);
                let components = means
                    .iter()
                    .map(|&mean| between_factor(*from, *to, mean, *sigma, at))
                    .collect::<Result<Vec<_>>>()?;
                Ok(GaussianMixtureFactor::new(&[*mode], components)?.into())
            }
            ScalarFactor::Discrete(f) => Ok(f.clone().into()),
        }
    }
}

/// An ordered list of scalar factors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarModel {
    factors: Vec<ScalarFactor>,
}

impl ScalarModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, factor: ScalarFactor) {
        self.factors.push(factor);
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScalarFactor> {
        self.factors.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ScalarFactor> {
        self.factors.get(index)
    }
}

impl Linearize for ScalarModel {
    fn linearize(&self, point: &VectorValues) -> Result<HybridGaussianFactorGraph> {
        self.factors.iter().map(|f| f.linearize(point)).collect()
    }
}

impl FromIterator<ScalarFactor> for ScalarModel {
    fn from_iter<I: IntoIterator<Item = ScalarFactor>>(iter: I) -> Self {
        ScalarModel {
            factors: iter.into_iter().collect(),
        }
    }
}

/// Linearized `x ~ N(measured, sigma²)` at `x = at`.
pub fn prior_factor(key: Key, measured: f64, sigma: f64, at: f64) -> Result<GaussianFactor> {
    let noise = NoiseModel::isotropic(1, sigma)?;
    GaussianFactor::new(vec![(key, one(1.0))], dvector![measured - at], Some(&noise))
}

/// Linearized `to - from ~ N(measured, sigma²)` at `(from, to) = at`.
pub fn between_factor(
    from: Key,
    to: Key,
    measured: f64,
    sigma: f64,
    at: (f64, f64),
) -> Result<GaussianFactor> {
    let noise = NoiseModel::isotropic(1, sigma)?;
    GaussianFactor::new(
        vec![(from, one(-1.0)), (to, one(1.0))],
        dvector![measured - (at.1 - at.0)],
        Some(&noise),
    )
}

fn one(v: f64) -> DMatrix<f64> {
    DMatrix::from_element(1, 1, v)
}

fn value_at(point: &VectorValues, key: Key) -> Result<f64> {
    point
        .get(&key)
        .and_then(|v| v.iter().next().copied())
        .ok_or_else(|| HybridError::KeyMismatch(format!("no linearization value for {}", key)))
}
