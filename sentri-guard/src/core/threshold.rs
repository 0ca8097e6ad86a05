//! Threshold configuration and the evaluator that turns a metric into a verdict.
//!
//! A [`ThresholdSet`] carries up to four bounds. Absolute bounds compare the
//! metric itself, delta bounds compare the magnitude of its change between two
//! periods. Critical bounds are always consulted before warning bounds, and a
//! value that sits exactly on a scalar bound does not trip it.
//!
//! Most checks treat a bound as a maximum (FAIL above). Correlation and
//! distribution checks treat it as a minimum (FAIL below); see [`Direction`].
//!
//! # Examples
//!
//! ```rust
//! use sentri_guard::core::{evaluate, CheckStatus, ThresholdBound, ThresholdKind, ThresholdSet};
//!
//! let thresholds = ThresholdSet {
//!     absolute_critical: Some(ThresholdBound::Scalar(0.10)),
//!     absolute_warning: Some(ThresholdBound::Scalar(0.05)),
//!     ..Default::default()
//! };
//!
//! assert_eq!(evaluate(0.07, &thresholds, ThresholdKind::Absolute).status, CheckStatus::Warning);
//! assert_eq!(evaluate(0.05, &thresholds, ThresholdKind::Absolute).status, CheckStatus::Pass);
//! ```

use crate::core::{CheckStatus, Severity};
use crate::prelude::*;
use serde::{Deserialize, Serialize};

/// A single bound: a scalar limit or a closed `[min, max]` interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdBound {
    Scalar(f64),
    Range([f64; 2]),
}

impl ThresholdBound {
    /// Returns the violated bound value, or `None` if `value` is acceptable.
    fn violated_by(&self, value: f64, direction: Direction) -> Option<f64> {
        match *self {
            ThresholdBound::Scalar(limit) => match direction {
                Direction::Upper if value > limit => Some(limit),
                Direction::Lower if value < limit => Some(limit),
                _ => None,
            },
            ThresholdBound::Range([min, max]) => {
                if value < min {
                    Some(min)
                } else if value > max {
                    Some(max)
                } else {
                    None
                }
            }
        }
    }

    fn values(&self) -> Vec<f64> {
        match *self {
            ThresholdBound::Scalar(v) => vec![v],
            ThresholdBound::Range([a, b]) => vec![a, b],
        }
    }
}

/// The four optional bounds configured for a column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_critical: Option<ThresholdBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_warning: Option<ThresholdBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_critical: Option<ThresholdBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_warning: Option<ThresholdBound>,
}

impl ThresholdSet {
    /// Returns true if no bound is configured.
    pub fn is_empty(&self) -> bool {
        !self.has_absolute() && !self.has_delta()
    }

    pub fn has_absolute(&self) -> bool {
        self.absolute_critical.is_some() || self.absolute_warning.is_some()
    }

    pub fn has_delta(&self) -> bool {
        self.delta_critical.is_some() || self.delta_warning.is_some()
    }

    /// Fills the absolute bounds with defaults when neither is configured.
    pub fn with_absolute_defaults(mut self, critical: f64, warning: Option<f64>) -> Self {
        if !self.has_absolute() {
            self.absolute_critical = Some(ThresholdBound::Scalar(critical));
            self.absolute_warning = warning.map(ThresholdBound::Scalar);
        }
        self
    }

    fn bounds(&self, kind: ThresholdKind) -> (Option<&ThresholdBound>, Option<&ThresholdBound>) {
        match kind {
            ThresholdKind::Absolute => {
                (self.absolute_critical.as_ref(), self.absolute_warning.as_ref())
            }
            ThresholdKind::Delta => (self.delta_critical.as_ref(), self.delta_warning.as_ref()),
        }
    }

    /// Scalar warning bound for `kind`, falling back to the critical bound.
    pub fn trigger_level(&self, kind: ThresholdKind) -> Option<f64> {
        let (critical, warning) = self.bounds(kind);
        match warning.or(critical) {
            Some(ThresholdBound::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    /// Validates bound values: finite, ordered ranges, non-negative deltas.
    pub fn validate(&self, context: &str) -> Result<()> {
        let named = [
            ("absolute_critical", &self.absolute_critical, false),
            ("absolute_warning", &self.absolute_warning, false),
            ("delta_critical", &self.delta_critical, true),
            ("delta_warning", &self.delta_warning, true),
        ];
        for (name, bound, is_delta) in named {
            let Some(bound) = bound else { continue };
            if bound.values().iter().any(|v| !v.is_finite()) {
                return Err(SentriError::config(format!(
                    "{context}: threshold '{name}' must be finite"
                )));
            }
            if let ThresholdBound::Range([min, max]) = bound {
                if min > max {
                    return Err(SentriError::config(format!(
                        "{context}: threshold '{name}' range [{min}, {max}] has min greater than max"
                    )));
                }
            }
            if is_delta && bound.values().iter().any(|v| *v < 0.0) {
                return Err(SentriError::config(format!(
                    "{context}: threshold '{name}' must be non-negative"
                )));
            }
        }
        Ok(())
    }
}

/// Which pair of bounds to compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    /// Compare the metric value directly.
    Absolute,
    /// Compare the absolute change between two periods.
    Delta,
}

/// Whether a scalar bound is a maximum or a minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Values above the bound violate it.
    #[default]
    Upper,
    /// Values below the bound violate it.
    Lower,
}

/// The verdict of comparing one metric value to a [`ThresholdSet`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: CheckStatus,
    pub severity: Severity,
    pub exceeded_threshold: Option<f64>,
}

impl Evaluation {
    pub fn pass() -> Self {
        Self {
            status: CheckStatus::Pass,
            severity: Severity::Info,
            exceeded_threshold: None,
        }
    }

    pub fn warning(bound: f64) -> Self {
        Self {
            status: CheckStatus::Warning,
            severity: Severity::Warning,
            exceeded_threshold: Some(bound),
        }
    }

    pub fn critical(bound: Option<f64>) -> Self {
        Self {
            status: CheckStatus::Fail,
            severity: Severity::Critical,
            exceeded_threshold: bound,
        }
    }

    pub fn error() -> Self {
        Self {
            status: CheckStatus::Error,
            severity: Severity::Error,
            exceeded_threshold: None,
        }
    }

    /// Picks the more severe of two evaluations, keeping `self` on ties.
    pub fn worst(self, other: Evaluation) -> Evaluation {
        if other.status.rank() > self.status.rank() {
            other
        } else {
            self
        }
    }
}

/// Evaluates `value` against `thresholds` treating every scalar bound as a maximum.
pub fn evaluate(value: f64, thresholds: &ThresholdSet, kind: ThresholdKind) -> Evaluation {
    evaluate_directed(value, thresholds, kind, Direction::Upper)
}

/// Evaluates `value` with an explicit bound direction.
///
/// Delta comparisons use `|value|`. Non-finite input yields an ERROR verdict.
pub fn evaluate_directed(
    value: f64,
    thresholds: &ThresholdSet,
    kind: ThresholdKind,
    direction: Direction,
) -> Evaluation {
    if !value.is_finite() {
        return Evaluation::error();
    }
    let value = match kind {
        ThresholdKind::Absolute => value,
        ThresholdKind::Delta => value.abs(),
    };
    let (critical, warning) = thresholds.bounds(kind);

    if let Some(bound) = critical.and_then(|b| b.violated_by(value, direction)) {
        return Evaluation::critical(Some(bound));
    }
    if let Some(bound) = warning.and_then(|b| b.violated_by(value, direction)) {
        return Evaluation::warning(bound);
    }
    Evaluation::pass()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(critical: Option<f64>, warning: Option<f64>) -> ThresholdSet {
        ThresholdSet {
            absolute_critical: critical.map(ThresholdBound::Scalar),
            absolute_warning: warning.map(ThresholdBound::Scalar),
            ..Default::default()
        }
    }

    #[test]
    fn test_critical_before_warning() {
        let t = scalar(Some(0.10), Some(0.05));
        let eval = evaluate(0.2, &t, ThresholdKind::Absolute);
        assert_eq!(eval.status, CheckStatus::Fail);
        assert_eq!(eval.severity, Severity::Critical);
        assert_eq!(eval.exceeded_threshold, Some(0.10));

        let eval = evaluate(0.07, &t, ThresholdKind::Absolute);
        assert_eq!(eval.status, CheckStatus::Warning);
        assert_eq!(eval.exceeded_threshold, Some(0.05));
    }

    #[test]
    fn test_boundary_is_strict() {
        let t = scalar(Some(0.05), None);
        let eval = evaluate(0.05, &t, ThresholdKind::Absolute);
        assert_eq!(eval, Evaluation::pass());
    }

    #[test]
    fn test_delta_uses_magnitude() {
        let t = ThresholdSet {
            delta_critical: Some(ThresholdBound::Scalar(0.1)),
            ..Default::default()
        };
        assert_eq!(
            evaluate(-0.2, &t, ThresholdKind::Delta).status,
            CheckStatus::Fail
        );
        // absolute kind ignores delta bounds
        assert_eq!(
            evaluate(-0.2, &t, ThresholdKind::Absolute).status,
            CheckStatus::Pass
        );
    }

    #[test]
    fn test_range_bound_reports_violated_side() {
        let t = ThresholdSet {
            absolute_critical: Some(ThresholdBound::Range([10.0, 20.0])),
            ..Default::default()
        };
        assert_eq!(
            evaluate(5.0, &t, ThresholdKind::Absolute).exceeded_threshold,
            Some(10.0)
        );
        assert_eq!(
            evaluate(25.0, &t, ThresholdKind::Absolute).exceeded_threshold,
            Some(20.0)
        );
        assert_eq!(
            evaluate(20.0, &t, ThresholdKind::Absolute).status,
            CheckStatus::Pass
        );
    }

    #[test]
    fn test_lower_direction() {
        let t = scalar(Some(0.8), Some(0.9));
        let eval = evaluate_directed(0.85, &t, ThresholdKind::Absolute, Direction::Lower);
        assert_eq!(eval.status, CheckStatus::Warning);
        let eval = evaluate_directed(0.5, &t, ThresholdKind::Absolute, Direction::Lower);
        assert_eq!(eval.status, CheckStatus::Fail);
        let eval = evaluate_directed(0.95, &t, ThresholdKind::Absolute, Direction::Lower);
        assert_eq!(eval.status, CheckStatus::Pass);
    }

    #[test]
    fn test_non_finite_is_error() {
        let t = scalar(Some(1.0), None);
        assert_eq!(
            evaluate(f64::NAN, &t, ThresholdKind::Absolute),
            Evaluation::error()
        );
        assert_eq!(
            evaluate(f64::INFINITY, &t, ThresholdKind::Delta),
            Evaluation::error()
        );
    }

    #[test]
    fn test_empty_set_always_passes() {
        let t = ThresholdSet::default();
        assert!(t.is_empty());
        assert_eq!(evaluate(1e9, &t, ThresholdKind::Absolute), Evaluation::pass());
    }

    #[test]
    fn test_deserialize_scalar_and_range() {
        let t: ThresholdSet =
            serde_json::from_str(r#"{"absolute_critical": [1, 2], "delta_warning": 0.5}"#)
                .unwrap();
        assert_eq!(t.absolute_critical, Some(ThresholdBound::Range([1.0, 2.0])));
        assert_eq!(t.delta_warning, Some(ThresholdBound::Scalar(0.5)));
        assert!(serde_json::from_str::<ThresholdSet>(r#"{"critical": 1}"#).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let negative_delta = ThresholdSet {
            delta_warning: Some(ThresholdBound::Scalar(-1.0)),
            ..Default::default()
        };
        assert!(negative_delta.validate("completeness.amount").is_err());

        let inverted = ThresholdSet {
            absolute_warning: Some(ThresholdBound::Range([5.0, 1.0])),
            ..Default::default()
        };
        assert!(inverted.validate("statistical.amount").is_err());

        assert!(scalar(Some(0.1), Some(0.05)).validate("ok").is_ok());
    }

    #[test]
    fn test_worst_prefers_higher_rank() {
        let worst = Evaluation::warning(0.1).worst(Evaluation::critical(Some(0.2)));
        assert_eq!(worst.status, CheckStatus::Fail);
        let worst = Evaluation::error().worst(Evaluation::critical(None));
        assert_eq!(worst.status, CheckStatus::Error);
    }

    #[test]
    fn test_defaults_only_fill_when_absent() {
        let t = ThresholdSet::default().with_absolute_defaults(0.25, Some(0.1));
        assert_eq!(t.absolute_critical, Some(ThresholdBound::Scalar(0.25)));
        let t = scalar(None, Some(0.3)).with_absolute_defaults(0.25, Some(0.1));
        assert_eq!(t.absolute_critical, None);
        assert_eq!(t.absolute_warning, Some(ThresholdBound::Scalar(0.3)));
    }
}
