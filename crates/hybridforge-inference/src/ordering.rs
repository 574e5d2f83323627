//! Elimination orderings and the policies that build them.
//!
//! Every ordering eliminates continuous keys before discrete keys. A discrete
//! key may only be eliminated once no continuous key is left, because the
//! discrete elimination step cannot represent a factor that still depends on
//! a continuous variable.

use std::collections::{BTreeSet, HashSet};
use std::ops::Deref;

use hybridforge_core::{HybridError, Key, Result, VariableKind};

use crate::bayes_net::HybridBayesNet;
use crate::graph::HybridGaussianFactorGraph;

/// A sequence of keys to eliminate, first to last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering(Vec<Key>);

impl Ordering {
    pub fn new(keys: Vec<Key>) -> Self {
        Ordering(keys)
    }

    /// All continuous keys, then all discrete keys, each group sorted.
    pub fn continuous_first(graph: &HybridGaussianFactorGraph) -> Result<Self> {
        let kinds = graph.variable_kinds()?;
        let continuous = kinds.iter().filter(|(_, k)| !k.is_discrete()).map(|(key, _)| *key);
        let discrete = kinds.iter().filter(|(_, k)| k.is_discrete()).map(|(key, _)| *key);
        Ok(Ordering(continuous.chain(discrete).collect()))
    }

    /// Ordering for merging `new` factors into a `current` graph.
    ///
    /// Continuous keys only `current` uses come first, then the continuous
    /// keys the new factors touch, then every discrete key.
    pub fn constrained(
        current: &HybridGaussianFactorGraph,
        new: &HybridGaussianFactorGraph,
    ) -> Result<Self> {
        let mut merged = current.clone();
        merged.extend(new.clone());
        let kinds = merged.variable_kinds()?;
        let touched: BTreeSet<Key> = new.continuous_keys().into_iter().collect();

        let mut keys: Vec<Key> = kinds
            .iter()
            .filter(|(key, k)| !k.is_discrete() && !touched.contains(*key))
            .map(|(key, _)| *key)
            .collect();
        keys.extend(touched.iter().copied());
        keys.extend(
            kinds
                .iter()
                .filter(|(_, k)| k.is_discrete())
                .map(|(key, _)| *key),
        );
        Ok(Ordering(keys))
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn contains(&self, key: Key) -> bool {
        self.0.contains(&key)
    }

    /// Checks this ordering against the graph it will eliminate.
    ///
    /// # Errors
    ///
    /// `OrderingViolation` if a key repeats, a key is not a variable of
    /// `graph`, a continuous key follows a discrete key, or a discrete key
    /// would be eliminated while some continuous key of `graph` stays
    /// uneliminated.
    pub fn validate(&self, graph: &HybridGaussianFactorGraph) -> Result<()> {
        let kinds = graph.variable_kinds()?;
        let mut seen = HashSet::with_capacity(self.0.len());
        let mut discrete_seen = None;
        for &key in &self.0 {
            if !seen.insert(key) {
                return Err(HybridError::OrderingViolation(format!(
                    "{} appears more than once",
                    key
                )));
            }
            match kinds.get(&key) {
                None => {
                    return Err(HybridError::OrderingViolation(format!(
                        "{} is not a variable of the graph",
                        key
                    )))
                }
                Some(VariableKind::Discrete { .. }) => {
                    if discrete_seen.is_none() {
                        discrete_seen = Some(key);
                    }
                }
                Some(VariableKind::Continuous { .. }) => {
                    if let Some(d) = discrete_seen {
                        return Err(HybridError::OrderingViolation(format!(
                            "continuous {} comes after discrete {}",
                            key, d
                        )));
                    }
                }
            }
        }

        if let Some(d) = discrete_seen {
            if let Some((left, _)) = kinds
                .iter()
                .find(|(key, k)| !k.is_discrete() && !seen.contains(*key))
            {
                return Err(HybridError::OrderingViolation(format!(
                    "discrete {} is eliminated while continuous {} remains",
                    d, left
                )));
            }
        }
        Ok(())
    }
}

impl Deref for Ordering {
    type Target = [Key];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Key>> for Ordering {
    fn from(keys: Vec<Key>) -> Self {
        Ordering(keys)
    }
}

impl FromIterator<Key> for Ordering {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Ordering(iter.into_iter().collect())
    }
}

/// Chooses the elimination ordering for one smoother update.
pub trait OrderingPolicy {
    /// Ordering for eliminating `new_factors` together with whatever part of
    /// `held` the ordering pulls back in.
    fn ordering(
        &self,
        held: &HybridBayesNet,
        new_factors: &HybridGaussianFactorGraph,
    ) -> Result<Ordering>;
}

/// Re-eliminates only what the new factors touch.
///
/// Continuous keys touched by the new factors are ordered with the keys the
/// held network already knows before brand-new keys. Continuous parents of
/// any held conditional pulled back in are added too, so the working graph
/// never keeps a continuous key outside the ordering. Every discrete key
/// comes last.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementalOrdering;

impl OrderingPolicy for IncrementalOrdering {
    fn ordering(
        &self,
        held: &HybridBayesNet,
        new_factors: &HybridGaussianFactorGraph,
    ) -> Result<Ordering> {
        let held_frontals: BTreeSet<Key> = held
            .iter()
            .filter(|c| !c.is_discrete())
            .map(|c| c.frontal())
            .collect();

        let mut touched: BTreeSet<Key> = new_factors.continuous_keys().into_iter().collect();
        loop {
            let before = touched.len();
            for c in held.iter() {
                if touched.contains(&c.frontal()) {
                    touched.extend(c.continuous_parents());
                }
            }
            if touched.len() == before {
                break;
            }
        }

        let (old, fresh): (Vec<Key>, Vec<Key>) =
            touched.into_iter().partition(|k| held_frontals.contains(k));
        let mut discrete: BTreeSet<Key> = held.discrete_keys().iter().map(|k| k.key).collect();
        discrete.extend(new_factors.discrete_keys().iter().map(|k| k.key));

        Ok(old.into_iter().chain(fresh).chain(discrete).collect())
    }
}

/// Re-eliminates the whole held network together with the new factors.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOrdering;

impl OrderingPolicy for BatchOrdering {
    fn ordering(
        &self,
        held: &HybridBayesNet,
        new_factors: &HybridGaussianFactorGraph,
    ) -> Result<Ordering> {
        Ordering::constrained(&held.to_factor_graph()?, new_factors)
    }
}
