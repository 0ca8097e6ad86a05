//! Duplicate-value check.

use super::require_thresholds;
use crate::config::ColumnMap;
use crate::core::{evaluate, Check, ColumnScope, ResultRecord, ThresholdKind};
use crate::prelude::*;
use async_trait::async_trait;
use std::collections::BTreeMap;

const DUPLICATE_SAMPLE_SIZE: usize = 20;

/// Counts surplus occurrences of non-null values in the current period.
///
/// A value seen three times contributes two duplicates.
#[derive(Debug, Clone)]
pub struct UniquenessCheck {
    columns: ColumnMap,
}

impl UniquenessCheck {
    pub const NAME: &'static str = "uniqueness";

    pub fn new(columns: ColumnMap) -> Result<Self> {
        require_thresholds(Self::NAME, &columns)?;
        Ok(Self { columns })
    }
}

#[async_trait]
impl Check for UniquenessCheck {
    fn check_type(&self) -> &str {
        Self::NAME
    }

    fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>> {
        let current = scope.current_frame()?;
        let values = current.text(scope.column)?;
        let total_rows = values.len();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for value in values.into_iter().flatten() {
            *counts.entry(value).or_default() += 1;
        }
        let duplicate_count: usize = counts.values().map(|c| c - 1).sum();
        let duplicated: Vec<&String> = counts
            .iter()
            .filter(|(_, c)| **c > 1)
            .map(|(v, _)| v)
            .take(DUPLICATE_SAMPLE_SIZE)
            .collect();
        let percentage = if total_rows == 0 {
            0.0
        } else {
            duplicate_count as f64 / total_rows as f64 * 100.0
        };

        let evaluation = evaluate(
            duplicate_count as f64,
            &scope.settings.threshold_set(),
            ThresholdKind::Absolute,
        );
        Ok(vec![scope
            .record()
            .metric(duplicate_count as f64)
            .evaluation(evaluation)
            .value("total_rows", total_rows)
            .value("unique_count", counts.len())
            .value("duplicate_count", duplicate_count)
            .number("duplicate_percentage", percentage)
            .sample("duplicated_values_sample", duplicated.into_iter().cloned())
            .build()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnCheckConfig;
    use crate::core::CheckStatus;
    use crate::test_helpers::{absolute, columns, dataset, dates, run_check, strings};

    #[tokio::test]
    async fn test_counts_surplus_occurrences() {
        let data = dataset(vec![
            ("date", dates(&["2024-01-01"; 6])),
            (
                "order_id",
                strings(&[Some("a"), Some("b"), Some("a"), Some("a"), Some("c"), None]),
            ),
        ]);
        let check = UniquenessCheck::new(columns(vec![(
            "order_id",
            ColumnCheckConfig::with_thresholds(absolute(Some(1.0), None)),
        )]))
        .unwrap();
        let records = run_check(&check, data).await;
        let record = &records[0];
        assert_eq!(record.metric_value, Some(2.0));
        assert_eq!(record.status, CheckStatus::Fail);
        assert_eq!(record.metric("unique_count"), Some(3.0));
        assert_eq!(record.metric("total_rows"), Some(6.0));
        assert_eq!(
            record.additional_metrics["duplicated_values_sample"],
            serde_json::json!(["a"])
        );
    }

    #[tokio::test]
    async fn test_only_current_period_is_counted() {
        let data = dataset(vec![
            ("date", dates(&["2024-01-01", "2024-01-01", "2024-01-02", "2024-01-02"])),
            ("order_id", strings(&[Some("a"), Some("a"), Some("a"), Some("b")])),
        ]);
        let check = UniquenessCheck::new(columns(vec![(
            "order_id",
            ColumnCheckConfig::with_thresholds(absolute(Some(0.0), None)),
        )]))
        .unwrap();
        let records = run_check(&check, data).await;
        assert_eq!(records[0].metric_value, Some(0.0));
        assert_eq!(records[0].status, CheckStatus::Pass);
        assert_eq!(records[0].date.map(|d| d.to_string()).as_deref(), Some("2024-01-02"));
    }
}
