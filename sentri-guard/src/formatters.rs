//! Rendering of a validation run for people and machines.
//!
//! # Examples
//!
//! ```rust
//! use sentri_guard::config::Metadata;
//! use sentri_guard::core::{RunOutcome, RunSummary};
//! use sentri_guard::formatters::{HumanFormatter, JsonFormatter, RunFormatter};
//!
//! let metadata = Metadata::new("orders", "order_date", "order_id");
//! let outcome = RunOutcome { records: Vec::new(), summary: RunSummary::default() };
//!
//! let json = JsonFormatter::new().format(&metadata, &outcome).unwrap();
//! assert!(json.contains("\"results\""));
//! let text = HumanFormatter::new().format(&metadata, &outcome).unwrap();
//! assert!(text.contains("orders"));
//! ```

use crate::config::Metadata;
use crate::core::{CheckStatus, ResultRecord, RunOutcome};
use crate::prelude::*;
use chrono::Utc;
use serde_json::json;
use std::fmt::Write;

/// Options shared by all formatters.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include PASS records in the detailed listing.
    pub include_passed: bool,
    /// Maximum number of records to list (`None` for all).
    pub max_records: Option<usize>,
    /// Whether to use ANSI colors (human formatter).
    pub use_colors: bool,
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_passed: true,
            max_records: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Plain output without colors or timestamps, listing only problems.
    pub fn ci() -> Self {
        Self {
            include_passed: false,
            max_records: Some(50),
            use_colors: false,
            include_timestamps: false,
        }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_passed(mut self, include: bool) -> Self {
        self.include_passed = include;
        self
    }

    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    fn select<'a>(&self, records: &'a [ResultRecord]) -> Vec<&'a ResultRecord> {
        records
            .iter()
            .filter(|r| self.include_passed || !r.status.is_pass())
            .take(self.max_records.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Converts a run into an output document.
pub trait RunFormatter {
    fn format(&self, metadata: &Metadata, outcome: &RunOutcome) -> Result<String>;
}

/// `{metadata, summary, results}` JSON document.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl RunFormatter for JsonFormatter {
    fn format(&self, metadata: &Metadata, outcome: &RunOutcome) -> Result<String> {
        let mut meta = serde_json::to_value(metadata)?;
        if self.config.include_timestamps {
            meta["generated_at"] = json!(Utc::now().to_rfc3339());
        }
        let document = json!({
            "metadata": meta,
            "summary": outcome.summary,
            "results": self.config.select(&outcome.records),
        });
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(rendered)
    }
}

/// Console summary followed by the non-passing records.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.config.use_colors {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn status_label(&self, status: CheckStatus) -> String {
        let color = match status {
            CheckStatus::Pass => "32",
            CheckStatus::Warning => "33",
            CheckStatus::Fail => "31",
            CheckStatus::Error => "35",
        };
        self.paint(status.as_str(), color)
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl RunFormatter for HumanFormatter {
    fn format(&self, metadata: &Metadata, outcome: &RunOutcome) -> Result<String> {
        let mut output = String::new();
        let summary = &outcome.summary;
        let counts = &summary.counts;

        writeln!(output)?;
        let headline = if counts.failed > 0 || counts.errors > 0 {
            self.paint("Validation FAILED", "31")
        } else if counts.warnings > 0 {
            self.paint("Validation PASSED with warnings", "33")
        } else {
            self.paint("Validation PASSED", "32")
        };
        writeln!(output, "{headline}")?;
        writeln!(output)?;
        writeln!(output, "Check: {}", metadata.name)?;
        if let Some(description) = &metadata.description {
            writeln!(output, "Description: {description}")?;
        }
        if self.config.include_timestamps {
            writeln!(output, "Generated: {}", Utc::now().to_rfc3339())?;
        }

        writeln!(output)?;
        writeln!(output, "Summary:")?;
        writeln!(output, "   Total:    {}", counts.total)?;
        writeln!(output, "   Passed:   {}", counts.passed)?;
        writeln!(output, "   Warnings: {}", counts.warnings)?;
        writeln!(output, "   Failed:   {}", counts.failed)?;
        writeln!(output, "   Errors:   {}", counts.errors)?;
        writeln!(output, "   Pass rate: {:.2}%", summary.pass_rate)?;

        if !summary.by_check_type.is_empty() {
            writeln!(output)?;
            writeln!(output, "By check type:")?;
            for (check_type, c) in &summary.by_check_type {
                writeln!(
                    output,
                    "   {check_type:<14} pass {:>3}  warn {:>3}  fail {:>3}  error {:>3}",
                    c.passed, c.warnings, c.failed, c.errors
                )?;
            }
        }

        let selected = self.config.select(&outcome.records);
        if !selected.is_empty() {
            writeln!(output)?;
            writeln!(output, "Results:")?;
            for record in &selected {
                let column = record.column_alias.as_ref().or(record.column.as_ref());
                let date = record
                    .date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let metric = record
                    .metric_value
                    .map(|m| format!("{m:.4}"))
                    .unwrap_or_else(|| "null".to_string());
                writeln!(
                    output,
                    "   [{}] {} / {} @ {}: {}",
                    self.status_label(record.status),
                    record.check_type,
                    column.map(String::as_str).unwrap_or("*"),
                    date,
                    metric
                )?;
                if let Some(bound) = record.exceeded_threshold {
                    writeln!(output, "      exceeded threshold {bound}")?;
                }
                if let Some(message) = record
                    .additional_metrics
                    .get("error_message")
                    .or_else(|| record.additional_metrics.get("message"))
                    .and_then(|v| v.as_str())
                {
                    writeln!(output, "      {message}")?;
                }
            }
            let listed = selected.len();
            let eligible = outcome
                .records
                .iter()
                .filter(|r| self.config.include_passed || !r.status.is_pass())
                .count();
            if eligible > listed {
                writeln!(output, "   ... and {} more", eligible - listed)?;
            }
        }

        writeln!(output)?;
        Ok(output)
    }
}
