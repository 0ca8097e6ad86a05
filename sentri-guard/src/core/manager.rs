//! Orchestration of a full validation run.
//!
//! The [`CheckManager`] builds every configured check through an explicit
//! [`CheckRegistry`], then fans the check types out over a bounded pool of
//! tokio tasks. Each task sends its records to a single collector over a
//! channel; the collector stores them in configuration order so the final
//! sequence is stable regardless of completion order.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sentri_guard::checks::CheckRegistry;
//! use sentri_guard::config::{ExecutionConfig, ValidationConfig};
//! use sentri_guard::core::CheckManager;
//! use sentri_guard::sources::{CsvSource, DataSource};
//! use std::sync::Arc;
//!
//! # async fn example() -> sentri_guard::prelude::Result<()> {
//! let config = ValidationConfig::from_path("checks.yaml")?;
//! let dataset = CsvSource::new("data/*.csv").load().await?;
//!
//! let manager = CheckManager::new(Arc::new(CheckRegistry::builtin()), ExecutionConfig::parallel(4));
//! let outcome = manager.run(dataset, &config.metadata, &config.checks).await?;
//! println!("pass rate: {}%", outcome.summary.pass_rate);
//! # Ok(())
//! # }
//! ```

use crate::checks::CheckRegistry;
use crate::config::{ChecksConfig, ExecutionConfig, Metadata};
use crate::core::{Check, CheckContext, CheckStatus, Dataset, ResultRecord, RunSummary};
use crate::logging::LogConfig;
use crate::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, instrument, warn};

/// Records of a run plus their aggregation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub records: Vec<ResultRecord>,
    pub summary: RunSummary,
}

impl RunOutcome {
    /// Records with a FAIL verdict, in run order.
    pub fn failed(&self) -> impl Iterator<Item = &ResultRecord> {
        self.with_status(CheckStatus::Fail)
    }

    /// Records with a WARNING verdict, in run order.
    pub fn warnings(&self) -> impl Iterator<Item = &ResultRecord> {
        self.with_status(CheckStatus::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ResultRecord> {
        self.with_status(CheckStatus::Error)
    }

    fn with_status(&self, status: CheckStatus) -> impl Iterator<Item = &ResultRecord> {
        self.records.iter().filter(move |r| r.status == status)
    }
}

enum Planned {
    Ready(Arc<dyn Check>),
    Failed(ResultRecord),
}

/// Runs configured check types against a dataset.
#[derive(Debug, Clone)]
pub struct CheckManager {
    registry: Arc<CheckRegistry>,
    execution: ExecutionConfig,
    log: LogConfig,
}

impl CheckManager {
    pub fn new(registry: Arc<CheckRegistry>, execution: ExecutionConfig) -> Self {
        Self {
            registry,
            execution,
            log: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn execution(&self) -> &ExecutionConfig {
        &self.execution
    }

    /// Validates `dataset` against `checks`.
    ///
    /// Returns an error only for fatal configuration problems found before
    /// dispatch (missing key columns, unparseable dates, invalid check
    /// settings). Everything that goes wrong afterwards is reported as ERROR
    /// records in the outcome.
    #[instrument(skip(self, dataset, metadata, checks), fields(
        run.name = %metadata.name,
        run.check_types = checks.len(),
        run.rows = dataset.num_rows(),
        run.workers = self.execution.worker_count()
    ))]
    pub async fn run(
        &self,
        dataset: Dataset,
        metadata: &Metadata,
        checks: &ChecksConfig,
    ) -> Result<RunOutcome> {
        let start = Instant::now();
        self.execution.validate()?;
        if !dataset.has_column(&metadata.id_column) {
            return Err(SentriError::config(format!(
                "id column '{}' not found in dataset",
                metadata.id_column
            )));
        }
        let dataset = Arc::new(dataset.with_date_column(&metadata.date_column)?);

        let plan = self.plan(checks)?;
        let ctx = CheckContext::new(dataset, &metadata.date_column, &metadata.id_column)
            .with_log_config(self.log.clone());
        let records = self.dispatch(plan, ctx).await;

        let summary = RunSummary::from_records(&records);
        info!(
            run.records = summary.total(),
            run.passed = summary.counts.passed,
            run.warnings = summary.counts.warnings,
            run.failed = summary.counts.failed,
            run.errors = summary.counts.errors,
            run.pass_rate = summary.pass_rate,
            run.duration_ms = start.elapsed().as_millis() as u64,
            "Validation run completed"
        );
        Ok(RunOutcome { records, summary })
    }

    /// Runs a single configured check type.
    ///
    /// `check_type` must be one of the keys of `checks`; any other name is a
    /// configuration error. The outcome covers that check type only.
    pub async fn run_check(
        &self,
        dataset: Dataset,
        metadata: &Metadata,
        checks: &ChecksConfig,
        check_type: &str,
    ) -> Result<RunOutcome> {
        let key = check_type.trim().to_lowercase();
        let columns = checks.get(&key).ok_or_else(|| {
            SentriError::config(format!(
                "check type '{check_type}' is not configured; configured: {}",
                checks.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
            ))
        })?;
        let single: ChecksConfig = [(key, columns.clone())].into_iter().collect();
        self.run(dataset, metadata, &single).await
    }

    /// Constructs every check before anything is dispatched.
    fn plan(&self, checks: &ChecksConfig) -> Result<Vec<(String, Planned)>> {
        let mut plan = Vec::with_capacity(checks.len());
        for (check_type, columns) in checks {
            let planned = match self.registry.create(check_type, columns.clone())? {
                Some(check) => Planned::Ready(check),
                None => {
                    warn!(check.name = %check_type, "Unknown check type");
                    let err = SentriError::CheckFailed {
                        check_type: check_type.clone(),
                        message: format!(
                            "unknown check type; available: {}",
                            self.registry.names().collect::<Vec<_>>().join(", ")
                        ),
                    };
                    Planned::Failed(ResultRecord::check_type_error(check_type, &err))
                }
            };
            plan.push((check_type.clone(), planned));
        }
        Ok(plan)
    }

    async fn dispatch(&self, plan: Vec<(String, Planned)>, ctx: CheckContext) -> Vec<ResultRecord> {
        let mut slots: Vec<Option<Vec<ResultRecord>>> = Vec::with_capacity(plan.len());
        slots.resize_with(plan.len(), || None);

        let semaphore = Arc::new(Semaphore::new(self.execution.worker_count()));
        let timeout = Duration::from_secs(self.execution.timeout_per_check);
        let (tx, mut rx) = mpsc::channel::<(usize, Vec<ResultRecord>)>(plan.len().max(1));
        let mut names = Vec::with_capacity(plan.len());

        for (slot, (check_type, planned)) in plan.into_iter().enumerate() {
            names.push(check_type.clone());
            let check = match planned {
                Planned::Ready(check) => check,
                Planned::Failed(record) => {
                    slots[slot] = Some(vec![record]);
                    continue;
                }
            };
            let tx = tx.clone();
            let semaphore = Arc::clone(&semaphore);
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let records = match semaphore.acquire_owned().await {
                    Ok(_permit) => run_isolated(check, ctx, &check_type, timeout).await,
                    Err(e) => vec![ResultRecord::check_type_error(
                        &check_type,
                        &SentriError::Internal(format!("worker pool closed: {e}")),
                    )],
                };
                // The receiver lives until every sender is dropped.
                let _ = tx.send((slot, records)).await;
            });
        }
        drop(tx);

        while let Some((slot, records)) = rx.recv().await {
            slots[slot] = Some(records);
        }

        slots
            .into_iter()
            .zip(names)
            .flat_map(|(records, check_type)| {
                records.unwrap_or_else(|| {
                    vec![ResultRecord::check_type_error(
                        &check_type,
                        &SentriError::Internal("check task ended without reporting".to_string()),
                    )]
                })
            })
            .collect()
    }
}

/// Runs one check type in its own task so a panic or a timeout only affects
/// that check type.
async fn run_isolated(
    check: Arc<dyn Check>,
    ctx: CheckContext,
    check_type: &str,
    timeout: Duration,
) -> Vec<ResultRecord> {
    let start = Instant::now();
    let log = ctx.log.clone();
    debug!(check.name = %check_type, "Check started");
    let mut handle = tokio::spawn(async move { check.run(&ctx).await });

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(records)) => {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            if log.is_slow(elapsed_ms) {
                warn!(
                    check.name = %check_type,
                    check.duration_ms = elapsed_ms,
                    "Slow check"
                );
            }
            debug!(
                check.name = %check_type,
                check.records = records.len(),
                check.duration_ms = elapsed_ms,
                "Check completed"
            );
            records
        }
        Ok(Err(join_error)) => {
            let message = if join_error.is_panic() {
                "check panicked".to_string()
            } else {
                format!("check task failed: {join_error}")
            };
            warn!(check.name = %check_type, error = %message, "Check failed");
            vec![ResultRecord::check_type_error(
                check_type,
                &SentriError::CheckFailed {
                    check_type: check_type.to_string(),
                    message,
                },
            )]
        }
        Err(_) => {
            handle.abort();
            warn!(
                check.name = %check_type,
                check.timeout_secs = timeout.as_secs(),
                "Check timed out"
            );
            vec![ResultRecord::check_type_error(
                check_type,
                &SentriError::Timeout {
                    check_type: check_type.to_string(),
                    seconds: timeout.as_secs(),
                },
            )]
        }
    }
}
