//! The standardized result record and its builder.

use crate::config::ColumnCheckConfig;
use crate::core::{CheckStatus, Evaluation, Severity, ThresholdSet};
use crate::prelude::*;
use crate::stats::round6;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Maximum number of sample values stored in `additional_metrics`.
pub const MAX_SAMPLE_SIZE: usize = 100;

/// One verdict for a (check type, column, period).
///
/// Field names are part of the output contract consumed by formatters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub check_type: String,
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_alias: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_applied: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub metric_value: Option<f64>,
    pub thresholds: ThresholdSet,
    pub status: CheckStatus,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exceeded_threshold: Option<f64>,
    pub additional_metrics: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl ResultRecord {
    /// An ERROR record for one column.
    pub fn column_error(
        check_type: &str,
        column: &str,
        settings: &ColumnCheckConfig,
        date: Option<NaiveDate>,
        error: &SentriError,
    ) -> Self {
        RecordBuilder::new(check_type, column, settings)
            .date(date)
            .evaluation(Evaluation::error())
            .error(error)
            .build()
    }

    /// An ERROR record covering a whole check type.
    pub fn check_type_error(check_type: &str, error: &SentriError) -> Self {
        let mut additional_metrics = BTreeMap::new();
        additional_metrics.insert("error_message".to_string(), Value::from(error.to_string()));
        additional_metrics.insert("error_type".to_string(), Value::from(error.kind().as_str()));
        Self {
            check_type: check_type.to_string(),
            column: None,
            column_alias: None,
            date: None,
            filter_applied: None,
            description: None,
            metric_value: None,
            thresholds: ThresholdSet::default(),
            status: CheckStatus::Error,
            severity: Severity::Error,
            exceeded_threshold: None,
            additional_metrics,
            timestamp: Utc::now(),
        }
    }

    /// The `error_type` label of an ERROR record.
    pub fn error_type(&self) -> Option<&str> {
        self.additional_metrics.get("error_type").and_then(Value::as_str)
    }

    /// A named numeric entry from `additional_metrics`.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.additional_metrics.get(key).and_then(Value::as_f64)
    }
}

/// Assembles a [`ResultRecord`] from column settings, a metric and a verdict.
///
/// Numeric values are rounded to six decimals; non-finite values become null.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: ResultRecord,
}

impl RecordBuilder {
    pub fn new(check_type: &str, column: &str, settings: &ColumnCheckConfig) -> Self {
        Self {
            record: ResultRecord {
                check_type: check_type.to_string(),
                column: Some(column.to_string()),
                column_alias: settings.column_alias.clone(),
                date: None,
                filter_applied: settings.filter_condition.clone(),
                description: settings.description.clone(),
                metric_value: None,
                thresholds: settings.threshold_set(),
                status: CheckStatus::Pass,
                severity: Severity::Info,
                exceeded_threshold: None,
                additional_metrics: BTreeMap::new(),
                timestamp: Utc::now(),
            },
        }
    }

    pub fn date(mut self, date: Option<NaiveDate>) -> Self {
        self.record.date = date;
        self
    }

    pub fn metric(mut self, value: f64) -> Self {
        self.record.metric_value = value.is_finite().then(|| round6(value));
        self
    }

    /// Replaces the reported thresholds, e.g. with defaults or a per-measure set.
    pub fn thresholds(mut self, thresholds: ThresholdSet) -> Self {
        self.record.thresholds = thresholds;
        self
    }

    pub fn evaluation(mut self, evaluation: Evaluation) -> Self {
        self.record.status = evaluation.status;
        self.record.severity = evaluation.severity;
        self.record.exceeded_threshold = evaluation.exceeded_threshold.map(round6);
        self
    }

    /// Adds a numeric entry, rounded.
    pub fn number(mut self, key: &str, value: f64) -> Self {
        let value = if value.is_finite() {
            Value::from(round6(value))
        } else {
            Value::Null
        };
        self.record.additional_metrics.insert(key.to_string(), value);
        self
    }

    /// Adds an optional numeric entry; `None` is stored as null.
    pub fn maybe_number(self, key: &str, value: Option<f64>) -> Self {
        match value {
            Some(v) => self.number(key, v),
            None => self.value(key, Value::Null),
        }
    }

    /// Adds an arbitrary JSON entry.
    pub fn value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.record.additional_metrics.insert(key.to_string(), value.into());
        self
    }

    /// Adds up to [`MAX_SAMPLE_SIZE`] values.
    pub fn sample<T: Into<Value>>(self, key: &str, values: impl IntoIterator<Item = T>) -> Self {
        let sample: Vec<Value> = values
            .into_iter()
            .take(MAX_SAMPLE_SIZE)
            .map(Into::into)
            .collect();
        self.value(key, Value::Array(sample))
    }

    pub fn message(self, message: impl Into<String>) -> Self {
        self.value("message", Value::from(message.into()))
    }

    pub fn error(self, error: &SentriError) -> Self {
        self.value("error_message", error.to_string())
            .value("error_type", error.kind().as_str())
    }

    /// Finishes the record. An ERROR verdict without an attached error (a
    /// non-finite metric) is labelled as a calculation error.
    pub fn build(self) -> ResultRecord {
        if self.record.status == CheckStatus::Error
            && !self.record.additional_metrics.contains_key("error_type")
        {
            let err = SentriError::calculation("metric value is not a finite number");
            return self.error(&err).record;
        }
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdSpec;
    use crate::core::ThresholdBound;

    fn settings() -> ColumnCheckConfig {
        ColumnCheckConfig {
            thresholds: ThresholdSpec::Uniform(ThresholdSet {
                absolute_critical: Some(ThresholdBound::Scalar(0.1)),
                ..Default::default()
            }),
            filter_condition: Some("region = 'eu'".into()),
            column_alias: Some("Order amount".into()),
            description: Some("amount must be present".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_builder_pulls_column_metadata() {
        let record = RecordBuilder::new("completeness", "amount", &settings())
            .metric(0.12345678)
            .evaluation(Evaluation::critical(Some(0.1)))
            .number("null_count", 3.0)
            .build();
        assert_eq!(record.column.as_deref(), Some("amount"));
        assert_eq!(record.column_alias.as_deref(), Some("Order amount"));
        assert_eq!(record.filter_applied.as_deref(), Some("region = 'eu'"));
        assert_eq!(record.metric_value, Some(0.123457));
        assert_eq!(record.status, CheckStatus::Fail);
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.metric("null_count"), Some(3.0));
        assert_eq!(
            record.thresholds.absolute_critical,
            Some(ThresholdBound::Scalar(0.1))
        );
    }

    #[test]
    fn test_non_finite_metric_is_null() {
        let record = RecordBuilder::new("statistical", "amount", &settings())
            .metric(f64::NAN)
            .number("ratio", f64::INFINITY)
            .build();
        assert_eq!(record.metric_value, None);
        assert_eq!(record.additional_metrics["ratio"], Value::Null);
    }

    #[test]
    fn test_sample_is_capped() {
        let record = RecordBuilder::new("turnover", "id", &settings())
            .sample("added_ids_sample", (0..500).map(|i| i.to_string()))
            .build();
        assert_eq!(
            record.additional_metrics["added_ids_sample"]
                .as_array()
                .unwrap()
                .len(),
            MAX_SAMPLE_SIZE
        );
    }

    #[test]
    fn test_error_records() {
        let err = SentriError::filter("x >", "unexpected end of input");
        let record = ResultRecord::column_error("range", "amount", &settings(), None, &err);
        assert_eq!(record.status, CheckStatus::Error);
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.metric_value, None);
        assert_eq!(record.error_type(), Some("FilterError"));

        let record = ResultRecord::check_type_error(
            "drift",
            &SentriError::Timeout {
                check_type: "drift".into(),
                seconds: 5,
            },
        );
        assert_eq!(record.column, None);
        assert_eq!(record.error_type(), Some("TimeoutError"));
    }

    #[test]
    fn test_serialized_field_names() {
        let record = RecordBuilder::new("uniqueness", "id", &ColumnCheckConfig::default())
            .metric(1.0)
            .build();
        let json = serde_json::to_value(&record).unwrap();
        for key in [
            "check_type",
            "column",
            "date",
            "metric_value",
            "thresholds",
            "status",
            "severity",
            "additional_metrics",
            "timestamp",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["status"], "PASS");
        assert!(json.get("exceeded_threshold").is_none());
    }

    #[test]
    fn test_error_verdict_always_carries_error_type() {
        let record = RecordBuilder::new("drift", "score", &ColumnCheckConfig::default())
            .metric(f64::NAN)
            .evaluation(Evaluation::error())
            .build();
        assert_eq!(record.metric_value, None);
        assert_eq!(record.error_type(), Some("CalculationError"));
        assert!(record.additional_metrics.contains_key("error_message"));
    }
}
