//! Sequential elimination of hybrid factor graphs.
//!
//! Continuous keys are eliminated once per discrete branch of the factors
//! that involve them: the branch factors are stacked and QR-factorized into a
//! Gaussian conditional and a residual on the separator. Discrete keys are
//! eliminated from the product of their (purely discrete) factors.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use hybridforge_config::EliminationConfig;
use hybridforge_core::{
    eliminate_discrete, DecisionTree, DecisionTreeFactor, DiscreteConditional, DiscreteKey,
    DiscreteValues, EliminationMode, HybridError, Key, Result, VariableKind,
};
use hybridforge_linear::{eliminate_qr, GaussianConditional, GaussianFactor};

use crate::bayes_net::HybridBayesNet;
use crate::conditional::{GaussianMixture, HybridConditional};
use crate::factor::{GaussianMixtureFactor, HybridFactor};
use crate::graph::HybridGaussianFactorGraph;
use crate::ordering::Ordering;

type Branch = Option<Vec<GaussianFactor>>;
type BranchResult = Option<(GaussianConditional, GaussianFactor)>;

/// Eliminates the keys of `ordering` in order.
///
/// Returns the Bayes net of the eliminated keys, in elimination order, and
/// the factors left on keys outside the ordering.
///
/// # Errors
///
/// - `OrderingViolation` if the ordering breaks the continuous-first rules.
/// - `NumericalFailure` if a branch system is singular; the error names the
///   key and the discrete assignment of the branch.
/// - `EmptyPruneResult` if every branch of some step was pruned.
pub fn eliminate_partial_sequential(
    graph: &HybridGaussianFactorGraph,
    ordering: &Ordering,
    config: &EliminationConfig,
) -> Result<(HybridBayesNet, HybridGaussianFactorGraph)> {
    ordering.validate(graph)?;
    let kinds = graph.variable_kinds()?;

    let mut factors: Vec<HybridFactor> = graph.iter().cloned().collect();
    let mut bayes_net = HybridBayesNet::new();

    for &key in ordering.iter() {
        let kind = kinds.get(&key).copied().ok_or_else(|| {
            HybridError::OrderingViolation(format!("{} is not a variable of the graph", key))
        })?;
        let (involved, rest): (Vec<HybridFactor>, Vec<HybridFactor>) =
            factors.into_iter().partition(|f| f.involves(key));
        factors = rest;

        match kind {
            VariableKind::Continuous { dim } => {
                let (conditional, produced) = eliminate_continuous(key, dim, &involved, config)?;
                bayes_net.push(conditional);
                factors.extend(produced);
            }
            VariableKind::Discrete { cardinality } => {
                let dk = DiscreteKey::try_new(key, cardinality)?;
                let (conditional, marginal) = eliminate_discrete_key(dk, involved, config.mode)?;
                bayes_net.push(HybridConditional::Discrete(conditional));
                if !marginal.keys().is_empty() {
                    factors.push(HybridFactor::Discrete(marginal));
                }
            }
        }
    }

    Ok((bayes_net, factors.into_iter().collect()))
}

/// Eliminates every key of `ordering`, which must cover the whole graph.
///
/// # Errors
///
/// As [`eliminate_partial_sequential`], plus `OrderingViolation` if a factor
/// with keys is left over.
pub fn eliminate_sequential(
    graph: &HybridGaussianFactorGraph,
    ordering: &Ordering,
    config: &EliminationConfig,
) -> Result<HybridBayesNet> {
    let (bayes_net, remaining) = eliminate_partial_sequential(graph, ordering, config)?;
    if let Some(left) = remaining.iter().find(|f| !f.is_constant()) {
        let keys: Vec<String> = left
            .continuous_keys()
            .iter()
            .map(|k| k.to_string())
            .chain(left.discrete_keys().iter().map(|k| k.key.to_string()))
            .collect();
        return Err(HybridError::OrderingViolation(format!(
            "ordering leaves {} uneliminated",
            keys.join(", ")
        )));
    }
    Ok(bayes_net)
}

fn eliminate_continuous(
    key: Key,
    dim: usize,
    involved: &[HybridFactor],
    config: &EliminationConfig,
) -> Result<(HybridConditional, Vec<HybridFactor>)> {
    if involved.is_empty() {
        warn!(event = "eliminate_unconstrained", key = %key, dim = dim);
        return Ok((GaussianConditional::unit(key, dim).into(), Vec::new()));
    }

    let mut plain = Vec::new();
    let mut mixtures = Vec::new();
    for factor in involved {
        match factor {
            HybridFactor::Continuous(f) => plain.push(f.clone()),
            HybridFactor::Mixture(m) => mixtures.push(m),
            HybridFactor::Discrete(_) => {
                return Err(HybridError::KeyMismatch(format!(
                    "discrete factor involves continuous {}",
                    key
                )))
            }
        }
    }

    let mode_keys: Vec<DiscreteKey> = mixtures
        .iter()
        .flat_map(|m| m.discrete_keys().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut tree: DecisionTree<Branch> = DecisionTree::leaf(Some(plain));
    for m in &mixtures {
        tree = tree.apply(m.components(), |acc, component| match (acc, component) {
            (Some(factors), Some(f)) => {
                let mut factors = factors.clone();
                factors.push(f.clone());
                Some(factors)
            }
            _ => None,
        })?;
    }

    let branches = tree.leaves_with_assignment();
    let eliminate_branch = |(assignment, branch): &(DiscreteValues, &Branch)| -> Result<BranchResult> {
        match branch {
            None => Ok(None),
            Some(factors) => {
                let refs: Vec<&GaussianFactor> = factors.iter().collect();
                if !factors.iter().any(|f| f.involves(key)) {
                    // Nothing in this branch constrains the key; its factors
                    // pass through to the residual.
                    trace!(
                        event = "eliminate_unconstrained_branch",
                        key = %key,
                        assignment = %assignment,
                    );
                    return GaussianFactor::stack(&refs)
                        .map(|residual| Some((GaussianConditional::unit(key, dim), residual)))
                        .map_err(|e| e.at_assignment(assignment));
                }
                eliminate_qr(&refs, key, config.rank_tolerance)
                    .map(Some)
                    .map_err(|e| e.at_assignment(assignment))
            }
        }
    };
    let results: Vec<BranchResult> =
        if config.parallel && branches.len() >= config.parallel_threshold {
            branches.par_iter().map(eliminate_branch).collect::<Result<_>>()?
        } else {
            branches.iter().map(eliminate_branch).collect::<Result<_>>()?
        };

    debug!(
        event = "eliminate_variable",
        key = %key,
        kind = "continuous",
        branches = branches.len(),
        mode_keys = mode_keys.len(),
    );

    if results.iter().all(Option::is_none) {
        return Err(HybridError::EmptyPruneResult(format!(
            "every branch eliminating {} was pruned",
            key
        )));
    }

    let (conditionals, residuals): (Vec<Option<GaussianConditional>>, Vec<Option<GaussianFactor>>) =
        results
            .into_iter()
            .map(|r| match r {
                Some((c, f)) => (Some(c), Some(f)),
                None => (None, None),
            })
            .unzip();

    if mode_keys.is_empty() {
        let mut pairs = conditionals.into_iter().zip(residuals).flat_map(|(c, f)| c.zip(f));
        let (conditional, residual) = pairs.next().ok_or_else(|| {
            HybridError::EmptyPruneResult(format!("no branch left eliminating {}", key))
        })?;
        let produced = if residual.is_constant() {
            Vec::new()
        } else {
            vec![HybridFactor::Continuous(residual)]
        };
        return Ok((conditional.into(), produced));
    }

    let conditional_tree = tree.with_leaves(conditionals)?;
    let residual_tree = tree.with_leaves(residuals)?;
    let log_dets = conditional_tree.map(|c| c.as_ref().map(GaussianConditional::log_det));
    let mixture = GaussianMixture::new(key, &mode_keys, conditional_tree)?;
    let sum_product = config.mode == EliminationMode::SumProduct;

    let key_free = residual_tree
        .leaves()
        .into_iter()
        .flatten()
        .all(GaussianFactor::is_constant);

    let mut produced = Vec::new();
    if key_free {
        // Fold the leftover error (and, summing, the branch volume) into a
        // discrete potential on the modes.
        let energies = residual_tree.apply(&log_dets, |residual, log_det| {
            match (residual, log_det) {
                (Some(f), Some(ld)) => {
                    let e = f.rhs().norm_squared() * 0.5;
                    Some(if sum_product { e + ld } else { e })
                }
                _ => None,
            }
        })?;
        produced.push(HybridFactor::Discrete(energy_factor(&mode_keys, &energies)?));
    } else {
        if residual_tree.is_leaf() {
            match residual_tree.leaves().into_iter().flatten().next() {
                Some(f) => produced.push(HybridFactor::Continuous(f.clone())),
                None => {
                    return Err(HybridError::EmptyPruneResult(format!(
                        "no residual left eliminating {}",
                        key
                    )))
                }
            }
        } else {
            produced.push(HybridFactor::Mixture(GaussianMixtureFactor::from_tree(
                &mode_keys,
                residual_tree,
            )?));
        }
        if sum_product {
            produced.push(HybridFactor::Discrete(energy_factor(&mode_keys, &log_dets)?));
        }
    }

    Ok((mixture.into(), produced))
}

/// `exp(-(e - e_min))` per branch, zero where the branch was pruned.
fn energy_factor(
    keys: &[DiscreteKey],
    energies: &DecisionTree<Option<f64>>,
) -> Result<DecisionTreeFactor> {
    let min = energies
        .leaves()
        .into_iter()
        .flatten()
        .copied()
        .fold(f64::INFINITY, f64::min);
    DecisionTreeFactor::from_tree(
        keys,
        energies.map(|e| e.map_or(0.0, |e| (min - e).exp())),
    )
}

fn eliminate_discrete_key(
    key: DiscreteKey,
    involved: Vec<HybridFactor>,
    mode: EliminationMode,
) -> Result<(DiscreteConditional, DecisionTreeFactor)> {
    let mut factors = Vec::with_capacity(involved.len());
    for factor in involved {
        match factor {
            HybridFactor::Discrete(f) => factors.push(f),
            other => {
                let continuous: Vec<String> =
                    other.continuous_keys().iter().map(|k| k.to_string()).collect();
                return Err(HybridError::OrderingViolation(format!(
                    "discrete {} eliminated while continuous {} remain",
                    key.key,
                    continuous.join(", ")
                )));
            }
        }
    }

    if factors.is_empty() {
        warn!(event = "eliminate_unconstrained", key = %key.key, cardinality = key.cardinality);
        return Ok((
            DiscreteConditional::uniform(key),
            DecisionTreeFactor::constant(key.cardinality as f64),
        ));
    }

    let (conditional, marginal) = eliminate_discrete(&factors, key, mode)?;
    debug!(
        event = "eliminate_variable",
        key = %key.key,
        kind = "discrete",
        parents = conditional.parents().len(),
    );
    Ok((conditional, marginal))
}
