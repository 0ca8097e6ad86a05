//! Distribution drift scoring against a baseline period.

use super::{context, finite};
use crate::config::{ColumnMap, DriftMethod, PeriodSelector};
use crate::core::{evaluate, Check, ColumnScope, ResultRecord, ThresholdBound, ThresholdKind};
use crate::prelude::*;
use crate::stats::{self, Binning};
use async_trait::async_trait;

const DEFAULT_BINS: usize = 10;
const MIN_SAMPLE: usize = 10;
const DEFAULT_CRITICAL: f64 = 0.25;
const DEFAULT_WARNING: f64 = 0.10;

/// Scores how far the current period's distribution has moved from the
/// baseline (by default the first period in the slice).
///
/// Bin edges are quantiles of the baseline; the outer bins are open so
/// current values beyond the baseline range are still counted. Thresholds are
/// non-negative maximums, so an unchanged distribution always passes.
#[derive(Debug, Clone)]
pub struct DriftCheck {
    columns: ColumnMap,
}

impl DriftCheck {
    pub const NAME: &'static str = "drift";

    pub fn new(columns: ColumnMap) -> Result<Self> {
        for (column, settings) in &columns {
            if let Some(bins) = settings.bins.filter(|b| *b < 2) {
                return Err(SentriError::config(format!(
                    "{}: bins must be at least 2, got {bins}",
                    context(Self::NAME, column)
                )));
            }
            let thresholds = settings.threshold_set();
            let absolute = [
                ("absolute_critical", thresholds.absolute_critical),
                ("absolute_warning", thresholds.absolute_warning),
            ];
            for (name, bound) in absolute {
                match bound {
                    Some(ThresholdBound::Range(_)) => {
                        return Err(SentriError::config(format!(
                            "{}: threshold '{name}' must be a single maximum, not a range",
                            context(Self::NAME, column)
                        )))
                    }
                    Some(ThresholdBound::Scalar(limit)) if limit < 0.0 => {
                        return Err(SentriError::config(format!(
                            "{}: threshold '{name}' must be non-negative, got {limit}",
                            context(Self::NAME, column)
                        )))
                    }
                    _ => {}
                }
            }
        }
        Ok(Self { columns })
    }
}

fn interpretation(score: f64) -> &'static str {
    if score < DEFAULT_WARNING {
        "no significant drift"
    } else if score < DEFAULT_CRITICAL {
        "moderate drift"
    } else {
        "significant drift"
    }
}

#[async_trait]
impl Check for DriftCheck {
    fn check_type(&self) -> &str {
        Self::NAME
    }

    fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>> {
        let default = Some(PeriodSelector::First);
        let Some(baseline_date) = scope.comparison_period(default) else {
            return Ok(vec![scope.no_comparison_record(default)]);
        };
        let current = scope.current_frame()?.numeric_values(scope.column)?;
        let baseline = scope
            .frame
            .period(baseline_date)?
            .numeric_values(scope.column)?;
        for (label, sample) in [("current", &current), ("baseline", &baseline)] {
            if sample.len() < MIN_SAMPLE {
                return Err(SentriError::insufficient(
                    format!("drift {label} sample too small"),
                    MIN_SAMPLE,
                    sample.len(),
                ));
            }
        }

        let method = scope.settings.drift_method;
        let binning = Binning::from_baseline(&baseline, scope.settings.bins.unwrap_or(DEFAULT_BINS))?;
        let expected = binning.proportions(&baseline);
        let actual = binning.proportions(&current);
        let score = match method {
            DriftMethod::Psi => stats::psi(&expected, &actual),
            DriftMethod::Ks => stats::ks_two_sample(&current, &baseline)?.statistic,
            DriftMethod::JensenShannon => stats::jensen_shannon(&expected, &actual),
        };
        let score = finite(method.as_str(), score)?;

        let thresholds = scope
            .settings
            .threshold_set()
            .with_absolute_defaults(DEFAULT_CRITICAL, Some(DEFAULT_WARNING));
        let evaluation = evaluate(score, &thresholds, ThresholdKind::Absolute);
        Ok(vec![scope
            .record()
            .metric(score)
            .thresholds(thresholds)
            .evaluation(evaluation)
            .value("method", method.as_str())
            .value("bin_count", binning.bin_count())
            .value("baseline_date", baseline_date.to_string())
            .value("current_count", current.len())
            .value("baseline_count", baseline.len())
            .value("interpretation", interpretation(score))
            .build()])
    }
}
