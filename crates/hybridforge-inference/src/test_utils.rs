//! Test utilities for hybridforge-inference
//!
//! Small scalar builders for the unit tests. Every factor is expressed
//! directly in the unknowns (linearized at zero), so a solution value is the
//! estimate itself.

use nalgebra::{dvector, DMatrix};

use hybridforge_core::symbol_shorthand::{m, x};
use hybridforge_core::{DecisionTreeFactor, DiscreteKey};
use hybridforge_linear::{GaussianFactor, NoiseModel};

use crate::factor::GaussianMixtureFactor;
use crate::graph::HybridGaussianFactorGraph;

pub fn scalar(v: f64) -> DMatrix<f64> {
    DMatrix::from_element(1, 1, v)
}

/// Binary mode key `m{k}`.
pub fn mode(k: u64) -> DiscreteKey {
    DiscreteKey::new(m(k), 2)
}

/// `x{k} ~ N(z, sigma²)`.
pub fn prior(k: u64, z: f64, sigma: f64) -> GaussianFactor {
    let noise = NoiseModel::isotropic(1, sigma).unwrap();
    GaussianFactor::new(vec![(x(k), scalar(1.0))], dvector![z], Some(&noise)).unwrap()
}

/// `x{k+1} - x{k} ~ N(mean, sigma²)`.
pub fn between(k: u64, mean: f64, sigma: f64) -> GaussianFactor {
    let noise = NoiseModel::isotropic(1, sigma).unwrap();
    GaussianFactor::new(
        vec![(x(k), scalar(-1.0)), (x(k + 1), scalar(1.0))],
        dvector![mean],
        Some(&noise),
    )
    .unwrap()
}

/// Motion `x{k} → x{k+1}` that either stays put (`m{k} = 0`) or moves by one.
pub fn switching_motion(k: u64, sigma: f64) -> GaussianMixtureFactor {
    GaussianMixtureFactor::new(&[mode(k)], vec![between(k, 0.0, sigma), between(k, 1.0, sigma)])
        .unwrap()
}

/// Priors on every `x{k}` from `measurements` and a switching motion between
/// each consecutive pair.
pub fn switching_graph(measurements: &[f64], between_sigma: f64, measurement_sigma: f64) -> HybridGaussianFactorGraph {
    let mut graph = HybridGaussianFactorGraph::new();
    for (k, &z) in measurements.iter().enumerate() {
        graph.push(prior(k as u64, z, measurement_sigma));
        if k + 1 < measurements.len() {
            graph.push(switching_motion(k as u64, between_sigma));
        }
    }
    graph
}

/// Unnormalized prior preferring one value of a binary mode.
pub fn mode_prior(k: u64, p0: f64, p1: f64) -> DecisionTreeFactor {
    DecisionTreeFactor::new(&[mode(k)], vec![p0, p1]).unwrap()
}
