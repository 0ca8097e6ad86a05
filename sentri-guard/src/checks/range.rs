//! Min/max bounds check.

use super::context;
use crate::config::ColumnMap;
use crate::core::{evaluate, Check, ColumnScope, Evaluation, ResultRecord, ThresholdKind};
use crate::prelude::*;
use crate::stats;
use async_trait::async_trait;

/// Reports the fraction of non-null values outside `[min_value, max_value]`.
///
/// Without fraction thresholds any violation fails the column.
#[derive(Debug, Clone)]
pub struct RangeCheck {
    columns: ColumnMap,
}

impl RangeCheck {
    pub const NAME: &'static str = "range";

    pub fn new(columns: ColumnMap) -> Result<Self> {
        for (column, settings) in &columns {
            if !settings.enabled {
                continue;
            }
            match (settings.min_value, settings.max_value) {
                (None, None) => {
                    return Err(SentriError::config(format!(
                        "{}: min_value or max_value is required",
                        context(Self::NAME, column)
                    )))
                }
                (Some(min), Some(max)) if min > max => {
                    return Err(SentriError::config(format!(
                        "{}: min_value {min} is greater than max_value {max}",
                        context(Self::NAME, column)
                    )))
                }
                _ => {}
            }
        }
        Ok(Self { columns })
    }
}

#[async_trait]
impl Check for RangeCheck {
    fn check_type(&self) -> &str {
        Self::NAME
    }

    fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>> {
        let settings = scope.settings;
        let values = scope.current_frame()?.numeric_values(scope.column)?;

        let below: Vec<f64> = match settings.min_value {
            Some(min) => values.iter().copied().filter(|v| *v < min).collect(),
            None => Vec::new(),
        };
        let above: Vec<f64> = match settings.max_value {
            Some(max) => values.iter().copied().filter(|v| *v > max).collect(),
            None => Vec::new(),
        };
        let violations = below.len() + above.len();
        let fraction = if values.is_empty() {
            0.0
        } else {
            violations as f64 / values.len() as f64
        };

        let thresholds = settings.threshold_set();
        let evaluation = if thresholds.has_absolute() {
            evaluate(fraction, &thresholds, ThresholdKind::Absolute)
        } else if violations > 0 {
            Evaluation::critical(None)
        } else {
            Evaluation::pass()
        };

        let mut builder = scope
            .record()
            .metric(fraction)
            .evaluation(evaluation)
            .value("out_of_range_count", violations)
            .value("total_count", values.len())
            .number("out_of_range_percentage", fraction * 100.0)
            .maybe_number("dataset_min", stats::min(&values))
            .maybe_number("dataset_max", stats::max(&values))
            .maybe_number("configured_min", settings.min_value)
            .maybe_number("configured_max", settings.max_value)
            .sample("below_min_sample", below)
            .sample("above_max_sample", above);
        if values.is_empty() {
            builder = builder.message("no non-null values in current period");
        }
        Ok(vec![builder.build()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnCheckConfig;
    use crate::core::{CheckStatus, Severity};
    use crate::test_helpers::{absolute, columns, dataset, dates, floats, run_check, strings};

    fn bounded(min: Option<f64>, max: Option<f64>) -> ColumnCheckConfig {
        ColumnCheckConfig {
            min_value: min,
            max_value: max,
            ..Default::default()
        }
    }

    fn data(values: &[Option<f64>]) -> crate::core::Dataset {
        let days = vec!["2024-03-01"; values.len()];
        dataset(vec![("date", dates(&days)), ("price", floats(values))])
    }

    #[tokio::test]
    async fn test_any_violation_fails_without_thresholds() {
        let check = RangeCheck::new(columns(vec![("price", bounded(Some(0.0), Some(10.0)))])).unwrap();
        let records = run_check(
            &check,
            data(&[Some(-1.0), Some(5.0), Some(11.0), Some(3.0), None]),
        )
        .await;
        let record = &records[0];
        assert_eq!(record.status, CheckStatus::Fail);
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.metric_value, Some(0.5));
        assert_eq!(record.metric("out_of_range_count"), Some(2.0));
        assert_eq!(record.metric("dataset_min"), Some(-1.0));
        assert_eq!(record.metric("dataset_max"), Some(11.0));
        assert_eq!(record.additional_metrics["below_min_sample"], serde_json::json!([-1.0]));
        assert_eq!(record.additional_metrics["above_max_sample"], serde_json::json!([11.0]));
    }

    #[tokio::test]
    async fn test_fraction_thresholds() {
        let mut settings = bounded(None, Some(10.0));
        settings.thresholds =
            crate::config::ThresholdSpec::Uniform(absolute(Some(0.5), Some(0.2)));
        let check = RangeCheck::new(columns(vec![("price", settings)])).unwrap();
        let records = run_check(
            &check,
            data(&[Some(1.0), Some(2.0), Some(30.0), Some(4.0)]),
        )
        .await;
        assert_eq!(records[0].metric_value, Some(0.25));
        assert_eq!(records[0].status, CheckStatus::Warning);
    }

    #[tokio::test]
    async fn test_all_null_passes_with_zero() {
        let check = RangeCheck::new(columns(vec![("price", bounded(Some(0.0), None))])).unwrap();
        let records = run_check(&check, data(&[None, None])).await;
        assert_eq!(records[0].status, CheckStatus::Pass);
        assert_eq!(records[0].metric_value, Some(0.0));
        assert_eq!(records[0].additional_metrics["dataset_min"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_filter_leaving_no_rows_is_insufficient_data() {
        let mut settings = bounded(Some(0.0), Some(10.0));
        settings.filter_condition = Some("price < 0".into());
        let check = RangeCheck::new(columns(vec![("price", settings)])).unwrap();
        let records = run_check(&check, data(&[Some(1.0), Some(2.0)])).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, CheckStatus::Error);
        assert_eq!(records[0].error_type(), Some("InsufficientDataError"));
        assert_eq!(records[0].metric_value, None);
    }

    #[tokio::test]
    async fn test_filtered_rows_without_dates_are_insufficient_data() {
        let data = dataset(vec![
            ("date", strings(&[Some("2024-03-01"), None, None])),
            ("price", floats(&[Some(1.0), Some(50.0), Some(60.0)])),
        ]);
        let mut settings = bounded(Some(0.0), Some(10.0));
        settings.filter_condition = Some("price > 10".into());
        let check = RangeCheck::new(columns(vec![("price", settings)])).unwrap();
        let records = run_check(&check, data).await;
        assert_eq!(records[0].status, CheckStatus::Error);
        assert_eq!(records[0].error_type(), Some("InsufficientDataError"));
        assert_eq!(records[0].metric("row_count"), Some(2.0));
        assert_eq!(records[0].date, None);
    }

    #[test]
    fn test_requires_a_bound() {
        assert!(RangeCheck::new(columns(vec![("price", bounded(None, None))])).is_err());
        assert!(RangeCheck::new(columns(vec![("price", bounded(Some(5.0), Some(1.0)))])).is_err());
    }
}
