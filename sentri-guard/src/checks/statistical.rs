//! Descriptive statistics check.

use super::finite;
use crate::config::{ColumnMap, StatMeasure};
use crate::core::{evaluate, Check, ColumnScope, Evaluation, ResultRecord, ThresholdKind};
use crate::prelude::*;
use crate::stats;
use async_trait::async_trait;

/// Computes each configured measure over the current period's non-null
/// values and emits one record per measure.
///
/// Columns without `measures` compute mean, std and median.
///
/// With a comparison period the relative change
/// `(current - previous) / |previous|` is evaluated against the delta bounds.
#[derive(Debug, Clone)]
pub struct StatisticalCheck {
    columns: ColumnMap,
}

impl StatisticalCheck {
    pub const NAME: &'static str = "statistical";

    pub const DEFAULT_MEASURES: [StatMeasure; 3] =
        [StatMeasure::Mean, StatMeasure::Std, StatMeasure::Median];

    pub fn new(mut columns: ColumnMap) -> Result<Self> {
        for settings in columns.values_mut() {
            if settings.measures.is_empty() {
                settings.measures = Self::DEFAULT_MEASURES.to_vec();
            }
        }
        Ok(Self { columns })
    }
}

/// Value of `measure` over `values`; `None` when undefined for the sample.
pub(crate) fn measure_value(measure: StatMeasure, values: &[f64]) -> Option<f64> {
    match measure {
        StatMeasure::Mean => stats::mean(values),
        StatMeasure::Median => stats::median(values),
        StatMeasure::Std => stats::std_dev(values),
        StatMeasure::Sum => Some(stats::sum(values)),
        StatMeasure::Count => Some(values.len() as f64),
        StatMeasure::Min => stats::min(values),
        StatMeasure::Max => stats::max(values),
        StatMeasure::Skew => (!values.is_empty()).then(|| stats::skewness(values)),
        StatMeasure::Kurtosis => (!values.is_empty()).then(|| stats::kurtosis(values)),
    }
}

#[async_trait]
impl Check for StatisticalCheck {
    fn check_type(&self) -> &str {
        Self::NAME
    }

    fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>> {
        let values = scope.current_frame()?.numeric_values(scope.column)?;
        let comparison = if scope.settings.comparison().is_some() {
            match scope.comparison_period(None) {
                Some(date) => Some((date, scope.frame.period(date)?.numeric_values(scope.column)?)),
                None => None,
            }
        } else {
            None
        };

        let mut records = Vec::with_capacity(scope.settings.measures.len());
        for measure in &scope.settings.measures {
            let thresholds = scope.settings.thresholds.for_measure(*measure);
            let builder = scope
                .record()
                .thresholds(thresholds.clone())
                .value("measure", measure.as_str())
                .value("sample_size", values.len());

            let Some(value) = measure_value(*measure, &values) else {
                let err = SentriError::insufficient(
                    format!("not enough values to compute {measure}"),
                    if *measure == StatMeasure::Std { 2 } else { 1 },
                    values.len(),
                );
                records.push(builder.evaluation(Evaluation::error()).error(&err).build());
                continue;
            };

            let value = match finite(measure.as_str(), value) {
                Ok(value) => value,
                Err(err) => {
                    records.push(builder.evaluation(Evaluation::error()).error(&err).build());
                    continue;
                }
            };

            let mut evaluation = evaluate(value, &thresholds, ThresholdKind::Absolute);
            let mut builder = builder.metric(value);
            match &comparison {
                Some((date, previous_values)) => {
                    let previous = measure_value(*measure, previous_values);
                    builder = builder
                        .value("comparison_date", date.to_string())
                        .maybe_number("comparison_value", previous);
                    if let Some(previous) = previous.filter(|p| *p != 0.0) {
                        let delta = (value - previous) / previous.abs();
                        if let Err(err) = finite(&format!("{measure} delta"), delta) {
                            records.push(builder.evaluation(Evaluation::error()).error(&err).build());
                            continue;
                        }
                        evaluation =
                            evaluation.worst(evaluate(delta, &thresholds, ThresholdKind::Delta));
                        builder = builder.number("delta", delta);
                    }
                }
                None if scope.settings.comparison().is_some() => {
                    builder = builder.message("comparison period not available; delta skipped");
                }
                None => {}
            }
            records.push(builder.evaluation(evaluation).build());
        }
        Ok(records)
    }
}
