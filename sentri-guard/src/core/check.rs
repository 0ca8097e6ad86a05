//! The check abstraction and the per-column pipeline every check shares.
//!
//! A check is constructed from its column settings and then run against a
//! [`CheckContext`]. For each enabled column the default [`Check::run`]:
//!
//! 1. verifies the column (and any partner columns) exist,
//! 2. applies the column's filter predicate to a fresh view of the dataset,
//! 3. short-circuits an empty slice into one ERROR record,
//! 4. hands the slice to [`Check::evaluate_column`].
//!
//! Any error in steps 1-4 becomes one ERROR record for that column and the
//! loop moves on to the next column.

use crate::config::{ColumnCheckConfig, ColumnMap, PeriodSelector};
use crate::core::{Dataset, Evaluation, Frame, RecordBuilder, ResultRecord};
use crate::logging::{truncate_field, LogConfig};
use crate::prelude::*;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Everything a check needs to run: the shared dataset and key column names.
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub dataset: Arc<Dataset>,
    pub date_column: String,
    pub id_column: String,
    pub log: LogConfig,
}

impl CheckContext {
    pub fn new(
        dataset: Arc<Dataset>,
        date_column: impl Into<String>,
        id_column: impl Into<String>,
    ) -> Self {
        Self {
            dataset,
            date_column: date_column.into(),
            id_column: id_column.into(),
            log: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// The filtered slice for one configured column.
#[derive(Debug)]
pub struct ColumnScope<'a> {
    pub check_type: &'a str,
    pub column: &'a str,
    pub settings: &'a ColumnCheckConfig,
    pub id_column: &'a str,
    /// Rows remaining after the column's filter.
    pub frame: Frame,
    /// Latest period present in `frame`.
    pub current: NaiveDate,
}

impl ColumnScope<'_> {
    /// A record builder pre-filled with column metadata and the current period.
    pub fn record(&self) -> RecordBuilder {
        RecordBuilder::new(self.check_type, self.column, self.settings).date(Some(self.current))
    }

    /// Rows of the current period.
    pub fn current_frame(&self) -> Result<Frame> {
        self.frame.period(self.current)
    }

    /// Resolves the comparison period, falling back to `default` when the
    /// column does not configure one.
    pub fn comparison_period(&self, default: Option<PeriodSelector>) -> Option<NaiveDate> {
        let selector = self.settings.comparison().or(default)?;
        self.frame.resolve_period(selector, self.current)
    }

    /// PASS/INFO record used when a required comparison period is absent.
    pub fn no_comparison_record(&self, selector: Option<PeriodSelector>) -> ResultRecord {
        let wanted = self
            .settings
            .comparison()
            .or(selector)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "previous".to_string());
        self.record()
            .message(format!(
                "no '{wanted}' comparison period available; {} period(s) present",
                self.frame.periods().len()
            ))
            .value("period_count", self.frame.periods().len())
            .build()
    }
}

/// A validation algorithm applied to the columns configured for one check type.
///
/// Implementations are constructed once per run by the
/// [`CheckRegistry`](crate::checks::CheckRegistry) and must not keep state
/// between columns.
#[async_trait]
pub trait Check: Debug + Send + Sync {
    /// The check type name, as used in configuration.
    fn check_type(&self) -> &str;

    /// Column settings in configuration order.
    fn columns(&self) -> &ColumnMap;

    /// Additional columns that must exist for `settings` to be evaluated.
    fn required_columns<'a>(
        &self,
        _settings: &'a ColumnCheckConfig,
        _ctx: &'a CheckContext,
    ) -> Vec<&'a str> {
        Vec::new()
    }

    /// Computes the records for one non-empty filtered slice.
    fn evaluate_column(&self, scope: &ColumnScope<'_>) -> Result<Vec<ResultRecord>>;

    /// Runs every enabled column. Never fails: errors become ERROR records.
    async fn run(&self, ctx: &CheckContext) -> Vec<ResultRecord> {
        run_columns(self, ctx).await
    }
}

/// The default column loop behind [`Check::run`].
#[instrument(skip(check, ctx), fields(check.name = %check.check_type(), check.columns = check.columns().len()))]
pub async fn run_columns<C: Check + ?Sized>(check: &C, ctx: &CheckContext) -> Vec<ResultRecord> {
    let mut records = Vec::new();
    for (column, settings) in check.columns() {
        if !settings.enabled {
            debug!(check.name = %check.check_type(), check.column = %column, "Column disabled, skipping");
            continue;
        }
        match run_column(check, ctx, column, settings).await {
            Ok(column_records) => records.extend(column_records),
            Err(e) => {
                debug!(
                    check.name = %check.check_type(),
                    check.column = %column,
                    error.kind = %e.kind(),
                    error = %e,
                    "Column check failed"
                );
                records.push(ResultRecord::column_error(
                    check.check_type(),
                    column,
                    settings,
                    None,
                    &e,
                ));
            }
        }
    }
    records
}

async fn run_column<C: Check + ?Sized>(
    check: &C,
    ctx: &CheckContext,
    column: &str,
    settings: &ColumnCheckConfig,
) -> Result<Vec<ResultRecord>> {
    let check_type = check.check_type();
    let mut required = vec![column];
    required.extend(check.required_columns(settings, ctx));
    for name in required {
        if !ctx.dataset.has_column(name) {
            let err = SentriError::ColumnNotFound {
                column: name.to_string(),
            };
            let available: Vec<String> = ctx
                .dataset
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect();
            return Ok(vec![RecordBuilder::new(check_type, column, settings)
                .evaluation(Evaluation::error())
                .error(&err)
                .value("available_columns", available)
                .build()]);
        }
    }

    crate::log_slice!(
        ctx.log,
        check.name = %check_type,
        check.column = %column,
        filter.predicate = %truncate_field(
            settings.filter_condition.as_deref().unwrap_or(""),
            ctx.log.max_field_length
        ),
        "Preparing column slice"
    );
    let frame = ctx
        .dataset
        .filtered(&ctx.date_column, settings.filter_condition.as_deref())
        .await?;

    let Some(current) = frame.current_period() else {
        let message = if frame.is_empty() {
            "no rows remain after filtering"
        } else {
            "no rows with a date remain after filtering"
        };
        let err = SentriError::insufficient(message, 1, 0);
        return Ok(vec![RecordBuilder::new(check_type, column, settings)
            .evaluation(Evaluation::error())
            .error(&err)
            .value("row_count", frame.num_rows())
            .build()]);
    };

    let scope = ColumnScope {
        check_type,
        column,
        settings,
        id_column: &ctx.id_column,
        frame,
        current,
    };
    let records = match check.evaluate_column(&scope) {
        Ok(records) => records,
        Err(e) => vec![ResultRecord::column_error(
            check_type,
            column,
            settings,
            Some(current),
            &e,
        )],
    };
    for record in &records {
        crate::log_column!(
            ctx.log,
            check.name = %check_type,
            check.column = %column,
            result.status = %record.status,
            result.metric = ?record.metric_value,
            "Column evaluated"
        );
    }
    Ok(records)
}
