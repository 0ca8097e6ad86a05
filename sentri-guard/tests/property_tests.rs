//! Property-based tests for threshold evaluation and the drift statistics.
//!
//! ## Test Categories
//!
//! ### 1. Threshold evaluation
//! - Critical bounds are consulted before warning bounds
//! - Delta comparisons are symmetric in the sign of the change
//! - Non-finite metrics always evaluate to ERROR
//!
//! ### 2. Drift and distribution statistics
//! - PSI and Jensen-Shannon divergence are non-negative and zero for equal inputs
//! - KS statistic and p-value stay within `[0, 1]`
//! - Quantile bin proportions sum to one

use proptest::prelude::*;
use sentri_guard::core::{
    evaluate, evaluate_directed, CheckStatus, Direction, ThresholdBound, ThresholdKind,
    ThresholdSet,
};
use sentri_guard::stats::{self, Binning};

fn upper_bounds(critical: f64, warning: f64) -> ThresholdSet {
    ThresholdSet {
        absolute_critical: Some(ThresholdBound::Scalar(critical)),
        absolute_warning: Some(ThresholdBound::Scalar(warning)),
        delta_critical: Some(ThresholdBound::Scalar(critical)),
        delta_warning: Some(ThresholdBound::Scalar(warning)),
    }
}

fn sample(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1_000.0f64..1_000.0, len)
}

proptest! {
    #[test]
    fn prop_status_follows_bounds(
        warning in 0.0f64..10.0,
        gap in 0.0f64..10.0,
        value in -50.0f64..50.0,
    ) {
        let critical = warning + gap;
        let eval = evaluate(value, &upper_bounds(critical, warning), ThresholdKind::Absolute);
        let expected = if value > critical {
            CheckStatus::Fail
        } else if value > warning {
            CheckStatus::Warning
        } else {
            CheckStatus::Pass
        };
        prop_assert_eq!(eval.status, expected);
        if expected == CheckStatus::Fail {
            prop_assert_eq!(eval.exceeded_threshold, Some(critical));
        }
    }

    #[test]
    fn prop_delta_ignores_sign(
        warning in 0.0f64..1.0,
        gap in 0.0f64..1.0,
        change in 0.0f64..5.0,
    ) {
        let set = upper_bounds(warning + gap, warning);
        let up = evaluate(change, &set, ThresholdKind::Delta);
        let down = evaluate(-change, &set, ThresholdKind::Delta);
        prop_assert_eq!(up, down);
    }

    #[test]
    fn prop_lower_direction_mirrors_upper(
        bound in -10.0f64..10.0,
        value in -20.0f64..20.0,
    ) {
        let set = ThresholdSet {
            absolute_critical: Some(ThresholdBound::Scalar(bound)),
            ..Default::default()
        };
        let lower = evaluate_directed(value, &set, ThresholdKind::Absolute, Direction::Lower);
        prop_assert_eq!(lower.status == CheckStatus::Fail, value < bound);
    }

    #[test]
    fn prop_psi_and_js_are_non_negative(
        baseline in sample(10..200),
        current in sample(10..200),
        bins in 2usize..20,
    ) {
        let binning = Binning::from_baseline(&baseline, bins).unwrap();
        let expected = binning.proportions(&baseline);
        let actual = binning.proportions(&current);
        prop_assert!((expected.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        prop_assert!((actual.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        prop_assert!(stats::psi(&expected, &actual) >= 0.0);
        prop_assert!(stats::jensen_shannon(&expected, &actual) >= 0.0);
        prop_assert!(stats::psi(&expected, &expected).abs() < 1e-12);
    }

    #[test]
    fn prop_ks_is_bounded(a in sample(2..100), b in sample(2..100)) {
        let ks = stats::ks_two_sample(&a, &b).unwrap();
        prop_assert!((0.0..=1.0).contains(&ks.statistic));
        prop_assert!((0.0..=1.0).contains(&ks.p_value));
        let same = stats::ks_two_sample(&a, &a).unwrap();
        prop_assert_eq!(same.statistic, 0.0);
    }
}

#[test]
fn test_non_finite_metrics_are_errors() {
    let set = upper_bounds(1.0, 0.5);
    for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        for kind in [ThresholdKind::Absolute, ThresholdKind::Delta] {
            assert_eq!(evaluate(value, &set, kind).status, CheckStatus::Error);
        }
    }
}
