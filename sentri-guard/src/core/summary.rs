//! Aggregation of a run's records and the exit-code policy.

use crate::core::{CheckStatus, ResultRecord, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts of each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
    pub errors: usize,
}

impl StatusCounts {
    fn add(&mut self, status: CheckStatus) {
        self.total += 1;
        match status {
            CheckStatus::Pass => self.passed += 1,
            CheckStatus::Warning => self.warnings += 1,
            CheckStatus::Fail => self.failed += 1,
            CheckStatus::Error => self.errors += 1,
        }
    }

    /// `passed / (passed + warnings + failed)` as a percentage rounded to two
    /// decimals. ERROR records are excluded from the denominator; the rate is
    /// 0 when nothing was evaluated.
    pub fn pass_rate(&self) -> f64 {
        let evaluated = self.passed + self.warnings + self.failed;
        if evaluated == 0 {
            return 0.0;
        }
        let rate = self.passed as f64 / evaluated as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub pass_rate: f64,
    /// True when any record carries CRITICAL severity.
    pub has_critical: bool,
    pub by_check_type: BTreeMap<String, StatusCounts>,
}

impl RunSummary {
    pub fn from_records(records: &[ResultRecord]) -> Self {
        let mut counts = StatusCounts::default();
        let mut by_check_type: BTreeMap<String, StatusCounts> = BTreeMap::new();
        let mut has_critical = false;
        for record in records {
            counts.add(record.status);
            by_check_type
                .entry(record.check_type.clone())
                .or_default()
                .add(record.status);
            has_critical |= record.severity == Severity::Critical;
        }
        Self {
            counts,
            pass_rate: counts.pass_rate(),
            has_critical,
            by_check_type,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.total
    }
}

/// Decides whether a run should be reported as failed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPolicy {
    #[serde(default = "default_true")]
    pub exit_on_critical: bool,
    #[serde(default)]
    pub exit_on_warning: bool,
    #[serde(default = "default_true")]
    pub exit_on_error: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            exit_on_critical: true,
            exit_on_warning: false,
            exit_on_error: true,
        }
    }
}

impl ExitPolicy {
    pub fn should_fail(&self, summary: &RunSummary) -> bool {
        (self.exit_on_critical && summary.has_critical)
            || (self.exit_on_warning && summary.counts.warnings > 0)
            || (self.exit_on_error && summary.counts.errors > 0)
    }

    /// 1 when the policy fails the run, otherwise 0.
    pub fn exit_code(&self, summary: &RunSummary) -> i32 {
        i32::from(self.should_fail(summary))
    }
}
