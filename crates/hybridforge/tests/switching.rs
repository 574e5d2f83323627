//! End-to-end tests on the 1-D switching system.
//!
//! These tests drive the public API the way an estimation front end would:
//! build the switching problem, linearize it, then eliminate it in one batch
//! or step by step through the smoother.

use approx::assert_relative_eq;

use hybridforge::prelude::*;
use hybridforge::symbol_shorthand::x;
use hybridforge::{
    eliminate_partial_sequential, eliminate_sequential, EliminationConfig, HybridFactor,
    DEFAULT_RANK_TOLERANCE,
};
use hybridforge_test::scenarios::{
    INCREMENTAL_MEASUREMENTS, INCREMENTAL_MODES, INCREMENTAL_STEPS, PROBABILITY_MEASUREMENTS,
    PROBABILITY_STEPS,
};
use hybridforge_test::switching::assignment;
use hybridforge_test::{
    discrete_sequence, init_tracing, specific_problem, switching, Switching, SwitchingParams,
};

/// Feeds `problem` to a fresh smoother one step at a time.
fn smooth(problem: &Switching, config: HybridConfig, max_leaves: Option<usize>) -> HybridSmoother {
    let mut smoother = HybridSmoother::with_config(config);
    for k in 0..problem.steps {
        let new_factors = problem.step(k).linearize(&problem.point_until(k)).unwrap();
        let ordering = smoother.ordering_for(&new_factors).unwrap();
        smoother.update(new_factors, &ordering, max_leaves).unwrap();
    }
    smoother
}

fn batch(problem: &Switching, config: &EliminationConfig) -> HybridBayesNet {
    let ordering = Ordering::continuous_first(&problem.linearized).unwrap();
    eliminate_sequential(&problem.linearized, &ordering, config).unwrap()
}

fn incremental_problem(steps: usize) -> Switching {
    let params = SwitchingParams::new(steps)
        .with_measurements(&INCREMENTAL_MEASUREMENTS)
        .with_transition("1/1 1/1");
    switching(&params).unwrap()
}

fn assert_positions(problem: &Switching, values: &HybridValues, expected: &[f64]) {
    let estimate = problem.linearization_point.retract(values.continuous());
    for (k, &z) in expected.iter().enumerate().take(problem.steps) {
        assert_relative_eq!(estimate[&x(k as u64)][0], z, epsilon = 1e-6);
    }
}

#[test]
fn test_continuous_prob_primes_match_specific_problems() {
    init_tracing();
    let params =
        SwitchingParams::new(PROBABILITY_STEPS).with_measurements(&PROBABILITY_MEASUREMENTS);
    let problem = switching(&params).unwrap();
    let graph = &problem.linearized;

    let ordering = Ordering::new(graph.continuous_keys());
    let (bayes_net, remaining) =
        eliminate_partial_sequential(graph, &ordering, &EliminationConfig::default()).unwrap();
    assert!(remaining.iter().all(|f| f.continuous_keys().is_empty()));

    let prob_primes = graph.continuous_prob_primes(&bayes_net).unwrap();
    for index in 0..1 << (PROBABILITY_STEPS - 1) {
        let sequence = discrete_sequence(PROBABILITY_STEPS, index);
        let plain = specific_problem(&params, &sequence).unwrap();
        let solution = plain.optimize(DEFAULT_RANK_TOLERANCE).unwrap();
        let expected = plain.prob_prime(&solution).unwrap();

        let actual = *prob_primes.evaluate(&assignment(&sequence)).unwrap();
        assert_relative_eq!(actual, expected, epsilon = 1e-8);
    }
}

#[test]
fn test_incremental_with_pruning_recovers_modes() {
    init_tracing();
    let problem = incremental_problem(INCREMENTAL_STEPS);
    let smoother = smooth(&problem, HybridConfig::default(), Some(3));

    let values = smoother.hybrid_bayes_net().optimize().unwrap();
    assert_eq!(
        values.discrete(),
        &assignment(&INCREMENTAL_MODES[..INCREMENTAL_STEPS - 1])
    );
    assert_positions(&problem, &values, &INCREMENTAL_MEASUREMENTS);

    let joint = smoother.hybrid_bayes_net().discrete_joint().unwrap();
    assert!(joint.nonzero_count().unwrap() <= 3);
}

#[test]
fn test_batch_recovers_modes() {
    init_tracing();
    let steps = 8;
    let problem = incremental_problem(steps);
    let values = batch(&problem, &EliminationConfig::default()).optimize().unwrap();

    assert_eq!(values.discrete(), &assignment(&INCREMENTAL_MODES[..steps - 1]));
    assert_positions(&problem, &values, &INCREMENTAL_MEASUREMENTS);
}

#[test]
fn test_incremental_matches_batch_without_pruning() {
    init_tracing();
    let params = SwitchingParams::new(6).with_measurements(&[0.0, 0.4, 1.6, 1.7, 2.9, 3.1]);
    let problem = switching(&params).unwrap();

    let smoother = smooth(&problem, HybridConfig::default(), None);
    let batch_net = batch(&problem, &EliminationConfig::default());

    let incremental = smoother.hybrid_bayes_net().optimize().unwrap();
    let batched = batch_net.optimize().unwrap();
    assert_eq!(incremental.discrete(), batched.discrete());
    assert!(incremental.continuous().equals(batched.continuous(), 1e-6));

    let a = smoother.hybrid_bayes_net().discrete_joint().unwrap().normalize().unwrap();
    let b = batch_net.discrete_joint().unwrap().normalize().unwrap();
    for assignment in DiscreteValues::cartesian_product(&problem.modes()) {
        assert_relative_eq!(
            a.evaluate(&assignment).unwrap(),
            b.evaluate(&assignment).unwrap(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn test_long_incremental_matches_batch_without_pruning() {
    init_tracing();
    let problem = incremental_problem(INCREMENTAL_STEPS);
    let expected = assignment(&INCREMENTAL_MODES[..INCREMENTAL_STEPS - 1]);

    let smoother = smooth(&problem, HybridConfig::default(), None);
    let incremental = smoother.hybrid_bayes_net().optimize().unwrap();
    let batched = batch(&problem, &EliminationConfig::default()).optimize().unwrap();

    assert_eq!(incremental.discrete(), &expected);
    assert_eq!(batched.discrete(), &expected);
    assert!(incremental.continuous().equals(batched.continuous(), 1e-6));
    assert_positions(&problem, &incremental, &INCREMENTAL_MEASUREMENTS);
}

#[test]
fn test_pruning_keeps_heaviest_hypotheses() {
    init_tracing();
    let problem = incremental_problem(6);
    let full = batch(&problem, &EliminationConfig::default());
    let pruned = full.prune(4, EliminationMode::MaxProduct).unwrap();

    let full_joint = full.discrete_joint().unwrap();
    let pruned_joint = pruned.discrete_joint().unwrap();
    assert!(pruned_joint.nonzero_count().unwrap() < full_joint.nonzero_count().unwrap());

    let assignments = DiscreteValues::cartesian_product(&problem.modes());
    let kept_min = assignments
        .iter()
        .filter(|a| pruned_joint.evaluate(a).unwrap() > 0.0)
        .map(|a| full_joint.evaluate(a).unwrap())
        .fold(f64::INFINITY, f64::min);
    let dropped_max = assignments
        .iter()
        .filter(|a| pruned_joint.evaluate(a).unwrap() == 0.0)
        .map(|a| full_joint.evaluate(a).unwrap())
        .fold(0.0, f64::max);
    assert!(kept_min >= dropped_max);

    let (a, b) = (pruned.optimize().unwrap(), full.optimize().unwrap());
    assert_eq!(a.discrete(), b.discrete());
    assert!(a.continuous().equals(b.continuous(), 1e-9));
}

#[test]
fn test_sum_product_posterior_matches_brute_force() {
    init_tracing();
    let params =
        SwitchingParams::new(PROBABILITY_STEPS).with_measurements(&[0.0, 0.7, 1.2, 1.4]);
    let problem = switching(&params).unwrap();
    let keys: Vec<Key> = (0..PROBABILITY_STEPS as u64).map(x).collect();

    let assignments = DiscreteValues::cartesian_product(&problem.modes());
    let weights: Vec<f64> = assignments
        .iter()
        .map(|a| {
            let sequence: Vec<usize> = problem.modes().iter().map(|k| a[&k.key]).collect();
            let plain = specific_problem(&params, &sequence).unwrap();
            let net = plain.eliminate_sequential(&keys, DEFAULT_RANK_TOLERANCE).unwrap();
            let solution = net.optimize().unwrap();
            let prior: f64 = problem
                .linearized
                .iter()
                .filter_map(|f| match f {
                    HybridFactor::Discrete(d) => Some(d.evaluate(a).unwrap()),
                    _ => None,
                })
                .product();
            prior * (-plain.error(&solution).unwrap() - net.log_det()).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();

    let posterior = problem
        .linearized
        .discrete_posterior(&EliminationConfig::default())
        .unwrap();
    for (a, w) in assignments.iter().zip(&weights) {
        assert_relative_eq!(posterior.evaluate(a).unwrap(), w / total, epsilon = 1e-9);
    }
}

#[test]
fn test_sum_product_smoother_matches_posterior() {
    init_tracing();
    let params =
        SwitchingParams::new(PROBABILITY_STEPS).with_measurements(&[0.0, 0.7, 1.2, 1.4]);
    let problem = switching(&params).unwrap();
    let config = HybridConfig::new().with_mode(EliminationMode::SumProduct);

    let smoother = smooth(&problem, config.clone(), None);
    let joint = smoother.hybrid_bayes_net().discrete_joint().unwrap().normalize().unwrap();
    let posterior = problem.linearized.discrete_posterior(&config.elimination).unwrap();

    for a in DiscreteValues::cartesian_product(&problem.modes()) {
        assert_relative_eq!(
            joint.evaluate(&a).unwrap(),
            posterior.evaluate(&a).unwrap(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn test_parallel_elimination_matches_serial() {
    init_tracing();
    let problem = incremental_problem(7);
    let serial = batch(
        &problem,
        &EliminationConfig {
            parallel: false,
            ..EliminationConfig::default()
        },
    );
    let parallel = batch(
        &problem,
        &EliminationConfig {
            parallel: true,
            parallel_threshold: 2,
            ..EliminationConfig::default()
        },
    );
    let (a, b) = (serial.optimize().unwrap(), parallel.optimize().unwrap());
    assert_eq!(a.discrete(), b.discrete());
    assert!(a.continuous().equals(b.continuous(), 1e-9));
}
