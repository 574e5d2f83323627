//! Incremental hybrid smoothing with mode pruning.

use std::time::Instant;

use tracing::info;

use hybridforge_config::HybridConfig;
use hybridforge_core::{EliminationMode, Result};

use crate::bayes_net::HybridBayesNet;
use crate::conditional::HybridConditional;
use crate::elimination::eliminate_sequential;
use crate::graph::HybridGaussianFactorGraph;
use crate::ordering::{IncrementalOrdering, Ordering, OrderingPolicy};

/// Holds a hybrid Bayes net and folds new factors into it.
///
/// Each update moves the held conditionals whose frontal is in the ordering
/// back into a working graph, eliminates that graph together with the new
/// factors, and prunes the combined net to the configured mode budget. A
/// failed update leaves the held net untouched.
///
/// # Examples
///
/// ```
/// use hybridforge_core::symbol_shorthand::x;
/// use hybridforge_inference::{HybridGaussianFactorGraph, HybridSmoother};
/// use hybridforge_linear::GaussianFactor;
/// use nalgebra::{dmatrix, dvector};
///
/// let mut smoother = HybridSmoother::new();
/// let mut graph = HybridGaussianFactorGraph::new();
/// graph.push(GaussianFactor::new(vec![(x(0), dmatrix![1.0])], dvector![2.0], None).unwrap());
///
/// let ordering = smoother.ordering_for(&graph).unwrap();
/// smoother.update(graph, &ordering, None).unwrap();
///
/// let values = smoother.hybrid_bayes_net().optimize().unwrap();
/// assert_eq!(values.continuous()[&x(0)][0], 2.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HybridSmoother {
    config: HybridConfig,
    bayes_net: HybridBayesNet,
    update_count: u64,
}

impl HybridSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HybridConfig) -> Self {
        HybridSmoother {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// The held net.
    pub fn hybrid_bayes_net(&self) -> &HybridBayesNet {
        &self.bayes_net
    }

    pub fn is_empty(&self) -> bool {
        self.bayes_net.is_empty()
    }

    /// Number of successful updates.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// The [`IncrementalOrdering`] for adding `new_factors`.
    pub fn ordering_for(&self, new_factors: &HybridGaussianFactorGraph) -> Result<Ordering> {
        IncrementalOrdering.ordering(&self.bayes_net, new_factors)
    }

    /// Adds `new_factors`, eliminating in `ordering`.
    ///
    /// `max_leaves` overrides the configured mode budget for this update.
    ///
    /// # Errors
    ///
    /// Any elimination or pruning error. The held net is only replaced once
    /// the whole update succeeded.
    pub fn update(
        &mut self,
        new_factors: HybridGaussianFactorGraph,
        ordering: &Ordering,
        max_leaves: Option<usize>,
    ) -> Result<()> {
        let start = Instant::now();
        let mode = self.config.elimination.mode;
        info!(
            event = "update_start",
            update = self.update_count + 1,
            new_factors = new_factors.len(),
            ordering_len = ordering.len(),
        );

        let mut graph = HybridGaussianFactorGraph::new();
        let mut kept = HybridBayesNet::new();
        for conditional in self.bayes_net.iter() {
            if !ordering.contains(conditional.frontal()) {
                kept.push(conditional.clone());
                continue;
            }
            graph.push(conditional.to_factor()?);
            // A moved mixture loses its per-branch normalization; summing
            // needs it back.
            if let (EliminationMode::SumProduct, HybridConditional::Mixture(m)) = (mode, conditional) {
                graph.push(m.normalization_factor()?);
            }
        }
        let moved = graph.len();
        graph.extend(new_factors);

        let fragment = eliminate_sequential(&graph, ordering, &self.config.elimination)?;
        let mut updated = kept;
        updated.extend(fragment);

        if let Some(n) = max_leaves.or(self.config.smoother.max_leaves) {
            updated = updated.prune(n, mode)?;
        }
        if let Some(floor) = self.config.smoother.prune_floor {
            updated = updated.prune_below(floor, mode)?;
        }

        self.bayes_net = updated;
        self.update_count += 1;

        info!(
            event = "update_end",
            update = self.update_count,
            moved_factors = moved,
            conditionals = self.bayes_net.len(),
            duration_ms = start.elapsed().as_millis() as u64,
        );
        Ok(())
    }

    /// Adds `new_factors` with the ordering `policy` picks.
    pub fn update_with(
        &mut self,
        new_factors: HybridGaussianFactorGraph,
        policy: &impl OrderingPolicy,
        max_leaves: Option<usize>,
    ) -> Result<()> {
        let ordering = policy.ordering(&self.bayes_net, &new_factors)?;
        self.update(new_factors, &ordering, max_leaves)
    }
}
