//! Identifier churn between two periods.

use super::require_thresholds;
use crate::config::{ColumnMap, PeriodSelector};
use crate::core::{evaluate, Check, ColumnScope, Frame, ResultRecord, ThresholdKind};
use crate::prelude::*;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Measures how many identifiers appeared or disappeared since the comparison
/// period, relative to all identifiers seen in either period.
#[derive(Debug, Clone)]
pub struct TurnoverCheck {
    columns: ColumnMap,
}

impl TurnoverCheck {
    pub const NAME: &'static str = "turnover";

    pub fn new(columns: ColumnMap) -> Result<Self> {
        require_thresholds(Self::NAME, &columns)?;
        Ok(Self { columns })
    }
}

fn id_set(frame: &Frame, column: &str) -> Result<BTreeSet<String>> {
    Ok(frame.text(column)?.into_iter().flatten().collect())
}

#[async_trait]
impl Check for TurnoverCheck {
    fn check_type(&self) -> &str {
        Self::NAME
    }

    fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>> {
        let default = Some(PeriodSelector::Previous);
        let Some(previous_date) = scope.comparison_period(default) else {
            return Ok(vec![scope.no_comparison_record(default)]);
        };

        let current = id_set(&scope.current_frame()?, scope.column)?;
        let previous = id_set(&scope.frame.period(previous_date)?, scope.column)?;
        let added: Vec<&String> = current.difference(&previous).collect();
        let dropped: Vec<&String> = previous.difference(&current).collect();
        let union = current.union(&previous).count();
        let rate = if union == 0 {
            0.0
        } else {
            (added.len() + dropped.len()) as f64 / union as f64
        };

        let evaluation = evaluate(rate, &scope.settings.threshold_set(), ThresholdKind::Absolute);
        Ok(vec![scope
            .record()
            .metric(rate)
            .evaluation(evaluation)
            .value("added_count", added.len())
            .value("dropped_count", dropped.len())
            .value("total_unique_ids", union)
            .number("turnover_percentage", rate * 100.0)
            .value("previous_date", previous_date.to_string())
            .value("current_date", scope.current.to_string())
            .sample("added_ids_sample", added.into_iter().cloned())
            .sample("dropped_ids_sample", dropped.into_iter().cloned())
            .build()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnCheckConfig;
    use crate::core::CheckStatus;
    use crate::test_helpers::{absolute, columns, dataset, dates, run_check, strings};

    fn check() -> TurnoverCheck {
        TurnoverCheck::new(columns(vec![(
            "customer",
            ColumnCheckConfig::with_thresholds(absolute(Some(0.5), Some(0.3))),
        )]))
        .unwrap()
    }

    #[tokio::test]
    async fn test_turnover_rate() {
        let data = dataset(vec![
            (
                "date",
                dates(&["2024-01-01", "2024-01-01", "2024-01-01", "2024-01-02", "2024-01-02", "2024-01-02"]),
            ),
            (
                "customer",
                strings(&[Some("a"), Some("b"), Some("c"), Some("b"), Some("c"), Some("d")]),
            ),
        ]);
        let records = run_check(&check(), data).await;
        let record = &records[0];
        // added d, dropped a, union {a, b, c, d}
        assert_eq!(record.metric_value, Some(0.5));
        assert_eq!(record.status, CheckStatus::Warning);
        assert_eq!(record.metric("added_count"), Some(1.0));
        assert_eq!(record.metric("dropped_count"), Some(1.0));
        assert_eq!(record.metric("total_unique_ids"), Some(4.0));
        assert_eq!(record.additional_metrics["added_ids_sample"], serde_json::json!(["d"]));
        assert_eq!(record.additional_metrics["previous_date"], "2024-01-01");
    }

    #[tokio::test]
    async fn test_single_period_has_no_comparison() {
        let data = dataset(vec![
            ("date", dates(&["2024-01-01", "2024-01-01"])),
            ("customer", strings(&[Some("a"), Some("b")])),
        ]);
        let records = run_check(&check(), data).await;
        assert_eq!(records[0].status, CheckStatus::Pass);
        assert_eq!(records[0].metric_value, None);
        assert!(records[0].additional_metrics.contains_key("message"));
    }
}
