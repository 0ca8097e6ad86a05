//! Two-sample Kolmogorov-Smirnov comparison against a baseline period.

use crate::config::{ColumnMap, PeriodSelector};
use crate::core::{evaluate_directed, Check, ColumnScope, Direction, ResultRecord, ThresholdKind};
use crate::prelude::*;
use crate::stats;
use async_trait::async_trait;

const DEFAULT_MIN_P_VALUE: f64 = 0.05;

/// Tests whether the current period's values come from the same distribution
/// as the baseline period's. The metric is the KS p-value; a p-value below
/// the configured minimum fails.
#[derive(Debug, Clone)]
pub struct DistributionCheck {
    columns: ColumnMap,
}

impl DistributionCheck {
    pub const NAME: &'static str = "distribution";

    pub fn new(columns: ColumnMap) -> Result<Self> {
        Ok(Self { columns })
    }
}

#[async_trait]
impl Check for DistributionCheck {
    fn check_type(&self) -> &str {
        Self::NAME
    }

    fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>> {
        let default = Some(PeriodSelector::Previous);
        let Some(baseline_date) = scope.comparison_period(default) else {
            return Ok(vec![scope.no_comparison_record(default)]);
        };
        let current = scope.current_frame()?.numeric_values(scope.column)?;
        let baseline = scope
            .frame
            .period(baseline_date)?
            .numeric_values(scope.column)?;
        let ks = stats::ks_two_sample(&current, &baseline)?;

        let thresholds = scope
            .settings
            .threshold_set()
            .with_absolute_defaults(DEFAULT_MIN_P_VALUE, None);
        let evaluation =
            evaluate_directed(ks.p_value, &thresholds, ThresholdKind::Absolute, Direction::Lower);
        Ok(vec![scope
            .record()
            .metric(ks.p_value)
            .thresholds(thresholds)
            .evaluation(evaluation)
            .number("ks_statistic", ks.statistic)
            .number("p_value", ks.p_value)
            .value("current_count", current.len())
            .value("baseline_count", baseline.len())
            .value("baseline_date", baseline_date.to_string())
            .build()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnCheckConfig;
    use crate::core::CheckStatus;
    use crate::test_helpers::{columns, dataset, dates, floats, run_check};

    fn two_periods(before: &[f64], after: &[f64]) -> crate::core::Dataset {
        let mut days = vec!["2024-02-01"; before.len()];
        days.extend(vec!["2024-02-02"; after.len()]);
        let values: Vec<Option<f64>> = before.iter().chain(after).map(|v| Some(*v)).collect();
        dataset(vec![("date", dates(&days)), ("latency", floats(&values))])
    }

    #[tokio::test]
    async fn test_shifted_distribution_fails() {
        let before: Vec<f64> = (0..30).map(f64::from).collect();
        let after: Vec<f64> = (100..130).map(f64::from).collect();
        let check = DistributionCheck::new(columns(vec![("latency", ColumnCheckConfig::default())])).unwrap();
        let records = run_check(&check, two_periods(&before, &after)).await;
        let record = &records[0];
        assert_eq!(record.status, CheckStatus::Fail);
        assert_eq!(record.metric("ks_statistic"), Some(1.0));
        assert!(record.metric_value.unwrap() < 0.05);
        assert_eq!(record.exceeded_threshold, Some(0.05));
    }

    #[tokio::test]
    async fn test_identical_distribution_passes() {
        let values: Vec<f64> = (0..30).map(f64::from).collect();
        let check = DistributionCheck::new(columns(vec![("latency", ColumnCheckConfig::default())])).unwrap();
        let records = run_check(&check, two_periods(&values, &values)).await;
        assert_eq!(records[0].status, CheckStatus::Pass);
        assert_eq!(records[0].metric("ks_statistic"), Some(0.0));
        assert_eq!(records[0].metric("baseline_count"), Some(30.0));
    }

    #[tokio::test]
    async fn test_small_sample_is_error() {
        let check = DistributionCheck::new(columns(vec![("latency", ColumnCheckConfig::default())])).unwrap();
        let records = run_check(&check, two_periods(&[1.0, 2.0], &[3.0])).await;
        assert_eq!(records[0].status, CheckStatus::Error);
        assert_eq!(records[0].error_type(), Some("InsufficientDataError"));
    }
}
