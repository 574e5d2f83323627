//! Integration tests for configuration-driven smoothing.

use hybridforge::prelude::*;
use hybridforge_test::scenarios::{INCREMENTAL_MEASUREMENTS, INCREMENTAL_MODES};
use hybridforge_test::switching::assignment;
use hybridforge_test::{init_tracing, switching, SwitchingParams};

fn run(config: HybridConfig, steps: usize) -> HybridSmoother {
    let params = SwitchingParams::new(steps)
        .with_measurements(&INCREMENTAL_MEASUREMENTS)
        .with_transition("1/1 1/1");
    let problem = switching(&params).unwrap();
    let mut smoother = HybridSmoother::with_config(config);
    for k in 0..steps {
        let new_factors = problem.step(k).linearize(&problem.point_until(k)).unwrap();
        let ordering = smoother.ordering_for(&new_factors).unwrap();
        smoother.update(new_factors, &ordering, None).unwrap();
    }
    smoother
}

#[test]
fn test_toml_budget_drives_pruning() {
    init_tracing();
    let config = HybridConfig::from_toml_str(
        r#"
        [elimination]
        mode = "max_product"
        parallel = false

        [smoother]
        max_leaves = 2
        "#,
    )
    .unwrap();
    config.validate().unwrap();

    let smoother = run(config, 8);
    let net = smoother.hybrid_bayes_net();
    assert!(net.discrete_joint().unwrap().nonzero_count().unwrap() <= 2);
    assert_eq!(
        net.optimize().unwrap().discrete(),
        &assignment(&INCREMENTAL_MODES[..7])
    );
    assert_eq!(smoother.update_count(), 8);
}

#[test]
fn test_yaml_floor_drives_pruning() {
    init_tracing();
    let config = HybridConfig::from_yaml_str(
        r#"
elimination:
  mode: sum_product
  parallel_threshold: 4
smoother:
  prune_floor: 0.001
"#,
    )
    .unwrap();
    config.validate().unwrap();
    assert_eq!(config.elimination.mode, EliminationMode::SumProduct);

    let smoother = run(config, 6);
    let joint = smoother
        .hybrid_bayes_net()
        .discrete_joint()
        .unwrap()
        .normalize()
        .unwrap();
    let modes: Vec<DiscreteKey> = joint.keys().to_vec();
    let (best, total) = DiscreteValues::cartesian_product(&modes).into_iter().fold(
        (DiscreteValues::new(), 0.0),
        |(best, total), a| {
            let p = joint.evaluate(&a).unwrap();
            let best = if best.is_empty() || p > joint.evaluate(&best).unwrap() {
                a
            } else {
                best
            };
            (best, total + p)
        },
    );
    assert_eq!(best, assignment(&INCREMENTAL_MODES[..5]));
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_invalid_config_rejected() {
    let config = HybridConfig::from_toml_str(
        r#"
        [smoother]
        max_leaves = 0
        "#,
    )
    .unwrap();
    assert!(config.validate().is_err());

    let config = HybridConfig::new().with_prune_floor(1.5);
    assert!(config.validate().is_err());
}
