//! Null-fraction check.

use super::require_thresholds;
use crate::config::ColumnMap;
use crate::core::{evaluate, Check, ColumnScope, Frame, ResultRecord, ThresholdKind};
use crate::prelude::*;
use async_trait::async_trait;

/// Measures the fraction of null values in the current period.
///
/// When a comparison period is configured, the change in null fraction is
/// also evaluated against the delta thresholds.
#[derive(Debug, Clone)]
pub struct CompletenessCheck {
    columns: ColumnMap,
}

impl CompletenessCheck {
    pub const NAME: &'static str = "completeness";

    pub fn new(columns: ColumnMap) -> Result<Self> {
        require_thresholds(Self::NAME, &columns)?;
        Ok(Self { columns })
    }
}

fn null_fraction(frame: &Frame, column: &str) -> Result<(usize, usize)> {
    Ok((frame.null_count(column)?, frame.num_rows()))
}

#[async_trait]
impl Check for CompletenessCheck {
    fn check_type(&self) -> &str {
        Self::NAME
    }

    fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>> {
        let thresholds = scope.settings.threshold_set();
        let (nulls, total) = null_fraction(&scope.current_frame()?, scope.column)?;
        let fraction = nulls as f64 / total as f64;

        let mut evaluation = evaluate(fraction, &thresholds, ThresholdKind::Absolute);
        let mut builder = scope
            .record()
            .metric(fraction)
            .value("null_count", nulls)
            .value("total_count", total)
            .number("null_percentage", fraction * 100.0);

        if scope.settings.comparison().is_some() {
            match scope.comparison_period(None) {
                Some(date) => {
                    let (prev_nulls, prev_total) =
                        null_fraction(&scope.frame.period(date)?, scope.column)?;
                    let previous = prev_nulls as f64 / prev_total as f64;
                    let delta = fraction - previous;
                    evaluation =
                        evaluation.worst(evaluate(delta, &thresholds, ThresholdKind::Delta));
                    builder = builder
                        .value("comparison_date", date.to_string())
                        .number("comparison_null_fraction", previous)
                        .number("delta", delta);
                }
                None => {
                    builder = builder.message("comparison period not available; delta skipped");
                }
            }
        }

        Ok(vec![builder.evaluation(evaluation).build()])
    }
}
