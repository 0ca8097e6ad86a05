//! Category share shifts between two periods.

use super::require_thresholds;
use crate::config::{ColumnMap, PeriodSelector};
use crate::core::{evaluate, Check, ColumnScope, Frame, ResultRecord, ThresholdKind};
use crate::prelude::*;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

const TOP_CATEGORIES: usize = 10;

/// Compares the relative frequency of each category with the comparison
/// period. The metric is the largest absolute change in share.
#[derive(Debug, Clone)]
pub struct FrequencyCheck {
    columns: ColumnMap,
}

impl FrequencyCheck {
    pub const NAME: &'static str = "frequency";

    pub fn new(columns: ColumnMap) -> Result<Self> {
        require_thresholds(Self::NAME, &columns)?;
        Ok(Self { columns })
    }
}

/// Share of each non-null category.
fn shares(frame: &Frame, column: &str) -> Result<BTreeMap<String, f64>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in frame.text(column)?.into_iter().flatten() {
        *counts.entry(value).or_default() += 1;
    }
    let total: usize = counts.values().sum();
    Ok(counts
        .into_iter()
        .map(|(k, c)| (k, c as f64 / total as f64))
        .collect())
}

#[async_trait]
impl Check for FrequencyCheck {
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

        let current = shares(&scope.current_frame()?, scope.column)?;
        let previous = shares(&scope.frame.period(previous_date)?, scope.column)?;
        let categories: BTreeSet<&String> = current.keys().chain(previous.keys()).collect();

        let mut changes: Vec<(&String, f64)> = categories
            .into_iter()
            .map(|c| {
                let now = current.get(c).copied().unwrap_or(0.0);
                let before = previous.get(c).copied().unwrap_or(0.0);
                (c, now - before)
            })
            .collect();
        // Largest magnitude first; ties keep category order.
        changes.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        let max_change = changes.first().map(|(_, d)| d.abs()).unwrap_or(0.0);

        let mut top_current: Vec<(&String, &f64)> = current.iter().collect();
        top_current.sort_by(|a, b| b.1.total_cmp(a.1));
        let current_distribution: serde_json::Map<String, serde_json::Value> = top_current
            .into_iter()
            .take(TOP_CATEGORIES)
            .map(|(k, v)| (k.clone(), json!(crate::stats::round6(*v))))
            .collect();
        let largest_changes: Vec<serde_json::Value> = changes
            .iter()
            .take(TOP_CATEGORIES)
            .map(|(c, d)| json!({ "category": c, "change": crate::stats::round6(*d) }))
            .collect();

        let evaluation = evaluate(
            max_change,
            &scope.settings.threshold_set(),
            ThresholdKind::Absolute,
        );
        Ok(vec![scope
            .record()
            .metric(max_change)
            .evaluation(evaluation)
            .value("previous_date", previous_date.to_string())
            .value("category_count", current.len())
            .value(
                "max_change_category",
                changes.first().map(|(c, _)| c.to_string()),
            )
            .value("current_distribution", current_distribution)
            .value("largest_changes", largest_changes)
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
    async fn test_max_share_change() {
        let data = dataset(vec![
            (
                "date",
                dates(&[
                    "2024-01-01", "2024-01-01", "2024-01-01", "2024-01-01",
                    "2024-01-02", "2024-01-02", "2024-01-02", "2024-01-02",
                ]),
            ),
            (
                "channel",
                strings(&[
                    Some("web"), Some("web"), Some("store"), Some("store"),
                    Some("web"), Some("web"), Some("web"), None,
                ]),
            ),
        ]);
        let check = FrequencyCheck::new(columns(vec![(
            "channel",
            ColumnCheckConfig::with_thresholds(absolute(Some(0.4), Some(0.2))),
        )]))
        .unwrap();
        let records = run_check(&check, data).await;
        let record = &records[0];
        // web 0.5 -> 1.0, store 0.5 -> 0.0
        assert_eq!(record.metric_value, Some(0.5));
        assert_eq!(record.status, CheckStatus::Fail);
        assert_eq!(record.additional_metrics["max_change_category"], "store");
        assert_eq!(record.metric("category_count"), Some(1.0));
        assert_eq!(record.additional_metrics["current_distribution"]["web"], 1.0);
        assert_eq!(record.additional_metrics["largest_changes"].as_array().unwrap().len(), 2);
    }
}
