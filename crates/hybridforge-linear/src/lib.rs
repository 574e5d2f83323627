//! HybridForge Linear - Linear-Gaussian building blocks
//!
//! This crate provides the continuous half of hybrid inference:
//! - Noise models folded into factors at construction
//! - Whitened Gaussian factors and square-root conditionals
//! - Dense QR elimination of one variable
//! - Plain Gaussian factor graphs and Bayes nets

pub mod bayes_net;
pub mod conditional;
pub mod elimination;
pub mod factor;
pub mod graph;
pub mod noise;
pub mod values;


pub use bayes_net::GaussianBayesNet;
pub use conditional::GaussianConditional;
pub use elimination::{eliminate_qr, DEFAULT_RANK_TOLERANCE};
pub use factor::GaussianFactor;
pub use graph::GaussianFactorGraph;
pub use noise::NoiseModel;
pub use values::VectorValues;
