//! The 1-D switching system.
//!
//! A robot moves along a line for `steps` time steps. Between consecutive
//! steps it either stays put (mode 0) or moves by one (mode 1); every
//! position is measured directly. The unknowns are the positions `x0..`
//! and the modes `m0..`, one mode per motion.
//!
//! Factor layout of [`Switching::model`]:
//!
//! | index | factor |
//! |---|---|
//! | `0` | prior on `x0` |
//! | `1 ..= K-1` | switching motion `x(k-1) → x(k)` on `m(k-1)` |
//! | `K ..= 2K-2` | measurement of `x(k)`, `k ≥ 1` |
//! | `2K-1` | mode prior on `m0` |
//! | `2K ..` | mode transitions `m(j) → m(j+1)` |

use hybridforge_core::symbol_shorthand::{m, x};
use hybridforge_core::{DiscreteConditional, DiscreteKey, DiscreteValues, HybridError, Result};
use hybridforge_inference::{HybridGaussianFactorGraph, Linearize};
use hybridforge_linear::{GaussianFactorGraph, VectorValues};

use crate::scalar::{between_factor, prior_factor, ScalarFactor, ScalarModel};

/// Parameters of a switching problem.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchingParams {
    /// Number of positions `K`; there are `K - 1` modes.
    pub steps: usize,
    pub between_sigma: f64,
    pub measurement_sigma: f64,
    /// One measurement per position; only the first `steps` are used.
    pub measurements: Vec<f64>,
    /// Signature of `P(m(j+1) | m(j))`, such as `"1/2 3/2"`.
    pub transition: String,
}

impl SwitchingParams {
    /// `steps` positions measured at `0, 1, 2, ...`.
    pub fn new(steps: usize) -> Self {
        SwitchingParams {
            steps,
            between_sigma: 1.0,
            measurement_sigma: 0.1,
            measurements: (0..steps).map(|k| k as f64).collect(),
            transition: "1/2 3/2".to_string(),
        }
    }

    pub fn with_measurements(mut self, measurements: &[f64]) -> Self {
        self.measurements = measurements.to_vec();
        self
    }

    pub fn with_sigmas(mut self, between_sigma: f64, measurement_sigma: f64) -> Self {
        self.between_sigma = between_sigma;
        self.measurement_sigma = measurement_sigma;
        self
    }

    pub fn with_transition(mut self, signature: &str) -> Self {
        self.transition = signature.to_string();
        self
    }
}

/// A built switching problem.
#[derive(Debug, Clone)]
pub struct Switching {
    pub steps: usize,
    /// Factors before linearization, in the layout of the module docs.
    pub model: ScalarModel,
    /// `x(k) = k + 1`.
    pub linearization_point: VectorValues,
    /// `model` linearized at `linearization_point`.
    pub linearized: HybridGaussianFactorGraph,
}

impl Switching {
    /// Binary mode keys `m0 .. m(K-2)`.
    pub fn modes(&self) -> Vec<DiscreteKey> {
        (0..self.steps.saturating_sub(1) as u64).map(mode).collect()
    }

    /// Factors that become available at step `k`.
    ///
    /// Step 0 is the prior on `x0`. Step `k ≥ 1` adds the motion into
    /// `x(k)`, the measurement of `x(k)` and the mode-chain factor that
    /// introduces `m(k-1)`.
    pub fn step(&self, k: usize) -> ScalarModel {
        let big_k = self.steps;
        let indices = if k == 0 {
            vec![0]
        } else {
            vec![k, k + big_k - 1, 2 * big_k - 2 + k]
        };
        indices
            .into_iter()
            .filter_map(|i| self.model.get(i).cloned())
            .collect()
    }

    /// The linearization point restricted to `x0 ..= x(k)`.
    pub fn point_until(&self, k: usize) -> VectorValues {
        (0..=k as u64)
            .filter_map(|i| self.linearization_point.get(&x(i)).map(|v| (x(i), v.clone())))
            .collect()
    }
}

/// Binary mode key `m(k)`.
pub fn mode(k: u64) -> DiscreteKey {
    DiscreteKey::new(m(k), 2)
}

/// The assignment `m(k) = sequence[k]`.
pub fn assignment(sequence: &[usize]) -> DiscreteValues {
    sequence
        .iter()
        .enumerate()
        .map(|(k, &v)| (m(k as u64), v))
        .collect()
}

/// Builds the switching problem described by `params`.
///
/// # Errors
///
/// `InvalidArgument` for zero steps or a bad sigma or signature,
/// `DimensionMismatch` if there are fewer measurements than steps.
pub fn switching(params: &SwitchingParams) -> Result<Switching> {
    let big_k = params.steps;
    if big_k == 0 {
        return Err(HybridError::InvalidArgument(
            "a switching problem needs at least one step".to_string(),
        ));
    }
    if params.measurements.len() < big_k {
        return Err(HybridError::DimensionMismatch {
            expected: big_k,
            actual: params.measurements.len(),
            context: "switching measurements".to_string(),
        });
    }

    let mut model = ScalarModel::new();
    model.push(ScalarFactor::Prior {
        key: x(0),
        measured: params.measurements[0],
        sigma: params.measurement_sigma,
    });
    for k in 0..big_k as u64 - 1 {
        model.push(ScalarFactor::Switching {
            from: x(k),
            to: x(k + 1),
            mode: mode(k),
            means: vec![0.0, 1.0],
            sigma: params.between_sigma,
        });
    }
    for k in 1..big_k {
        model.push(ScalarFactor::Prior {
            key: x(k as u64),
            measured: params.measurements[k],
            sigma: params.measurement_sigma,
        });
    }
    if big_k > 1 {
        model.push(ScalarFactor::Discrete(
            DiscreteConditional::from_signature(mode(0), &[], "1/1")?.to_factor()?,
        ));
        for j in 0..big_k as u64 - 2 {
            model.push(ScalarFactor::Discrete(
                DiscreteConditional::from_signature(mode(j + 1), &[mode(j)], &params.transition)?
                    .to_factor()?,
            ));
        }
    }

    let mut linearization_point = VectorValues::new();
    for k in 0..big_k as u64 {
        linearization_point.insert_scalar(x(k), k as f64 + 1.0);
    }
    let linearized = model.linearize(&linearization_point)?;

    Ok(Switching {
        steps: big_k,
        model,
        linearization_point,
        linearized,
    })
}

/// The plain Gaussian problem of a switching system whose modes are fixed to
/// `sequence`: measurement priors on every position and a plain motion with
/// mean `sequence[k]`, linearized at `x(k) = k + 1`.
pub fn specific_problem(params: &SwitchingParams, sequence: &[usize]) -> Result<GaussianFactorGraph> {
    let big_k = params.steps;
    if sequence.len() + 1 != big_k {
        return Err(HybridError::DimensionMismatch {
            expected: big_k.saturating_sub(1),
            actual: sequence.len(),
            context: "discrete sequence".to_string(),
        });
    }
    let at = |k: usize| k as f64 + 1.0;

    let mut graph = GaussianFactorGraph::new();
    for k in 0..big_k {
        let measured = params.measurements.get(k).copied().ok_or_else(|| {
            HybridError::DimensionMismatch {
                expected: big_k,
                actual: params.measurements.len(),
                context: "switching measurements".to_string(),
            }
        })?;
        graph.push(prior_factor(x(k as u64), measured, params.measurement_sigma, at(k))?);
    }
    for (k, &v) in sequence.iter().enumerate() {
        graph.push(between_factor(
            x(k as u64),
            x(k as u64 + 1),
            v as f64,
            params.between_sigma,
            (at(k), at(k + 1)),
        )?);
    }
    Ok(graph)
}

/// The mode sequence encoded by the bits of `index`, most significant bit
/// first: bit `i` becomes mode `steps - 2 - i`.
///
/// ```
/// use hybridforge_test::discrete_sequence;
///
/// assert_eq!(discrete_sequence(4, 0b110), vec![1, 1, 0]);
/// assert_eq!(discrete_sequence(4, 1), vec![0, 0, 1]);
/// ```
pub fn discrete_sequence(steps: usize, index: usize) -> Vec<usize> {
    let modes = steps.saturating_sub(1);
    let mut sequence = vec![0; modes];
    for i in 0..modes {
        sequence[modes - 1 - i] = (index >> i) & 1;
    }
    sequence
}
