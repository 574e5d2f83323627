//! Tests for discrete factors and elimination.

use approx::assert_relative_eq;

use super::*;
use crate::assignment::DiscreteValues;
use crate::error::HybridError;
use crate::key::Key;

fn m(i: u64) -> DiscreteKey {
    DiscreteKey::new(Key::symbol('m', i), 2)
}

fn at(pairs: &[(DiscreteKey, usize)]) -> DiscreteValues {
    DiscreteValues::from_pairs(pairs.iter().map(|(k, v)| (k.key, *v)))
}

// ============================================================================
// DecisionTreeFactor
// ============================================================================

mod factor {
    use super::*;

    #[test]
    fn test_rejects_negative_values() {
        let err = DecisionTreeFactor::new(&[m(0)], vec![0.5, -0.1]).unwrap_err();
        assert!(matches!(err, HybridError::InvalidArgument(_)));
    }

    #[test]
    fn test_keys_are_sorted() {
        let f = DecisionTreeFactor::new(&[m(1), m(0)], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(f.keys(), &[m(0), m(1)]);
        assert_eq!(f.evaluate(&at(&[(m(1), 1), (m(0), 0)])).unwrap(), 2.0);
    }

    #[test]
    fn test_multiply_and_sum_out() {
        let prior = DecisionTreeFactor::new(&[m(0)], vec![0.4, 0.6]).unwrap();
        let transition =
            DecisionTreeFactor::new(&[m(0), m(1)], vec![0.9, 0.1, 0.2, 0.8]).unwrap();

        let joint = prior.multiply(&transition).unwrap();
        assert_eq!(joint.keys(), &[m(0), m(1)]);
        assert_relative_eq!(joint.sum().unwrap(), 1.0, epsilon = 1e-12);

        let marginal = joint.sum_out(m(0).key).unwrap();
        assert_eq!(marginal.keys(), &[m(1)]);
        assert_relative_eq!(marginal.evaluate(&at(&[(m(1), 0)])).unwrap(), 0.48, epsilon = 1e-12);
        assert_relative_eq!(marginal.evaluate(&at(&[(m(1), 1)])).unwrap(), 0.52, epsilon = 1e-12);
    }

    #[test]
    fn test_max_out() {
        let f = DecisionTreeFactor::new(&[m(0), m(1)], vec![0.1, 0.7, 0.5, 0.2]).unwrap();
        let maxed = f.max_out(m(1).key).unwrap();
        assert_eq!(maxed.evaluate(&at(&[(m(0), 0)])).unwrap(), 0.7);
        assert_eq!(maxed.evaluate(&at(&[(m(0), 1)])).unwrap(), 0.5);
    }

    #[test]
    fn test_sum_out_unknown_key() {
        let f = DecisionTreeFactor::new(&[m(0)], vec![0.5, 0.5]).unwrap();
        assert!(matches!(
            f.sum_out(m(3).key),
            Err(HybridError::KeyMismatch(_))
        ));
    }

    #[test]
    fn test_sum_out_key_the_tree_ignores() {
        let f = DecisionTreeFactor::constant_over(&[m(0), m(1)], 0.25).unwrap();
        let marginal = f.sum_out(m(1).key).unwrap();
        assert_eq!(marginal.keys(), &[m(0)]);
        assert_relative_eq!(marginal.evaluate(&at(&[(m(0), 1)])).unwrap(), 0.5);
    }

    #[test]
    fn test_divide_by_zero_is_zero() {
        let a = DecisionTreeFactor::new(&[m(0)], vec![0.0, 1.0]).unwrap();
        let b = DecisionTreeFactor::new(&[m(0)], vec![0.0, 2.0]).unwrap();
        let q = a.divide(&b).unwrap();
        assert_eq!(q.evaluate(&at(&[(m(0), 0)])).unwrap(), 0.0);
        assert_eq!(q.evaluate(&at(&[(m(0), 1)])).unwrap(), 0.5);
    }

    #[test]
    fn test_cardinality_conflict() {
        let a = DecisionTreeFactor::new(&[m(0)], vec![0.5, 0.5]).unwrap();
        let wide = DiscreteKey::new(m(0).key, 3);
        let b = DecisionTreeFactor::new(&[wide], vec![0.2, 0.3, 0.5]).unwrap();
        assert!(matches!(a.multiply(&b), Err(HybridError::KeyMismatch(_))));
    }

    #[test]
    fn test_error_is_negative_log() {
        let f = DecisionTreeFactor::new(&[m(0)], vec![0.0, 0.5]).unwrap();
        assert_relative_eq!(f.error(&at(&[(m(0), 1)])).unwrap(), 2f64.ln());
        assert!(f.error(&at(&[(m(0), 0)])).unwrap().is_infinite());
    }

    #[test]
    fn test_prune_and_count() {
        let f = DecisionTreeFactor::new(&[m(0), m(1)], vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let pruned = f.prune(2).unwrap();
        assert_eq!(pruned.nonzero_count().unwrap(), 2);
        assert_relative_eq!(pruned.sum().unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(pruned.evaluate(&at(&[(m(0), 0), (m(1), 0)])).unwrap(), 0.0);
    }

    #[test]
    fn test_max_marginal_keeps_listed_keys() {
        let f = DecisionTreeFactor::new(&[m(0), m(1)], vec![0.0, 0.0, 0.3, 0.4]).unwrap();
        let mm = f.max_marginal(&[m(0)]).unwrap();
        assert_eq!(mm.keys(), &[m(0)]);
        assert_eq!(mm.evaluate(&at(&[(m(0), 0)])).unwrap(), 0.0);
        assert_eq!(mm.evaluate(&at(&[(m(0), 1)])).unwrap(), 0.4);
    }

    #[test]
    fn test_restrict() {
        let f = DecisionTreeFactor::new(&[m(0), m(1)], vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let r = f.restrict(&at(&[(m(0), 1)])).unwrap();
        assert_eq!(r.keys(), &[m(1)]);
        assert_eq!(r.evaluate(&at(&[(m(1), 1)])).unwrap(), 0.4);
    }
}

// ============================================================================
// DiscreteConditional
// ============================================================================

mod conditional {
    use super::*;

    #[test]
    fn test_signature_rows_are_normalized() {
        let cond = DiscreteConditional::from_signature(m(1), &[m(0)], "1/3 2/2").unwrap();
        assert_eq!(cond.parents(), &[m(0)]);
        assert_relative_eq!(cond.evaluate(&at(&[(m(0), 0), (m(1), 0)])).unwrap(), 0.25);
        assert_relative_eq!(cond.evaluate(&at(&[(m(0), 1), (m(1), 1)])).unwrap(), 0.5);
    }

    #[test]
    fn test_signature_shape_errors() {
        assert!(matches!(
            DiscreteConditional::from_signature(m(1), &[m(0)], "1/1"),
            Err(HybridError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            DiscreteConditional::from_signature(m(0), &[], "1/1/1"),
            Err(HybridError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            DiscreteConditional::from_signature(m(0), &[], "1/x"),
            Err(HybridError::InvalidArgument(_))
        ));
        assert!(matches!(
            DiscreteConditional::from_signature(m(0), &[], "0/0"),
            Err(HybridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_argmax_prefers_smallest_on_tie() {
        let cond = DiscreteConditional::from_signature(m(1), &[m(0)], "1/1 1/4").unwrap();
        assert_eq!(cond.argmax(&at(&[(m(0), 0)])).unwrap(), 0);
        assert_eq!(cond.argmax(&at(&[(m(0), 1)])).unwrap(), 1);
    }

    #[test]
    fn test_argmax_missing_parent() {
        let cond = DiscreteConditional::from_signature(m(1), &[m(0)], "1/2 2/1").unwrap();
        assert!(matches!(
            cond.argmax(&DiscreteValues::new()),
            Err(HybridError::KeyMismatch(_))
        ));
    }

    #[test]
    fn test_to_factor_round_trips_values() {
        let cond = DiscreteConditional::from_signature(m(1), &[m(0)], "1/3 2/2").unwrap();
        let f = cond.to_factor().unwrap();
        assert_eq!(f.keys(), &[m(0), m(1)]);
        assert_relative_eq!(f.sum().unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_uniform() {
        let cond = DiscreteConditional::uniform(DiscreteKey::new(Key::new(7), 4));
        assert_eq!(cond.evaluate(&DiscreteValues::from_pairs([(Key::new(7), 3)])).unwrap(), 0.25);
        assert_eq!(cond.argmax(&DiscreteValues::new()).unwrap(), 0);
    }
}

// ============================================================================
// Elimination
// ============================================================================

mod elimination {
    use super::*;

    fn chain() -> Vec<DecisionTreeFactor> {
        vec![
            DecisionTreeFactor::new(&[m(0)], vec![0.4, 0.6]).unwrap(),
            DecisionTreeFactor::new(&[m(0), m(1)], vec![0.9, 0.1, 0.2, 0.8]).unwrap(),
        ]
    }

    #[test]
    fn test_sum_product_gives_true_conditional() {
        let (cond, marginal) =
            eliminate_discrete(&chain(), m(0), EliminationMode::SumProduct).unwrap();

        assert_eq!(cond.frontal(), m(0));
        assert_eq!(cond.parents(), &[m(1)]);
        // P(m0 = 0 | m1 = 0) = 0.36 / 0.48
        assert_relative_eq!(
            cond.evaluate(&at(&[(m(0), 0), (m(1), 0)])).unwrap(),
            0.75,
            epsilon = 1e-12
        );
        assert_relative_eq!(marginal.sum().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_max_product_keeps_best_branch() {
        let (cond, marginal) =
            eliminate_discrete(&chain(), m(0), EliminationMode::MaxProduct).unwrap();

        assert_relative_eq!(marginal.evaluate(&at(&[(m(1), 0)])).unwrap(), 0.36, epsilon = 1e-12);
        assert_relative_eq!(marginal.evaluate(&at(&[(m(1), 1)])).unwrap(), 0.48, epsilon = 1e-12);
        assert_eq!(cond.argmax(&at(&[(m(1), 0)])).unwrap(), 0);
        assert_eq!(cond.argmax(&at(&[(m(1), 1)])).unwrap(), 1);
    }

    #[test]
    fn test_no_factors_gives_uniform() {
        let (cond, marginal) = eliminate_discrete(&[], m(4), EliminationMode::SumProduct).unwrap();
        assert!(marginal.keys().is_empty());
        assert_relative_eq!(marginal.sum().unwrap(), 2.0);
        assert_relative_eq!(cond.evaluate(&at(&[(m(4), 1)])).unwrap(), 0.5);
    }

    #[test]
    fn test_default_mode_is_max_product() {
        assert_eq!(EliminationMode::default(), EliminationMode::MaxProduct);
    }
}
