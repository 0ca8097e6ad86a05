//! # Sentri - Data Quality Checks for Rust
//!
//! Sentri runs configurable data quality checks over a tabular dataset that
//! spans several periods (for example daily snapshots). Each check compares a
//! column's current period, optionally against an earlier period, and emits
//! standardized result records with a PASS / WARNING / FAIL / ERROR verdict.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sentri_guard::checks::CheckRegistry;
//! use sentri_guard::config::ValidationConfig;
//! use sentri_guard::core::CheckManager;
//! use sentri_guard::formatters::{HumanFormatter, RunFormatter};
//! use sentri_guard::sources::{CsvSource, DataSource};
//! use std::sync::Arc;
//!
//! # async fn example() -> sentri_guard::prelude::Result<()> {
//! let config = ValidationConfig::from_yaml_str(r#"
//! metadata:
//!   name: daily_orders
//!   date_column: order_date
//!   id_column: order_id
//! checks:
//!   completeness:
//!     customer_email:
//!       thresholds:
//!         absolute_warning: 0.01
//!         absolute_critical: 0.05
//!   drift:
//!     amount:
//!       drift_method: psi
//! "#)?;
//!
//! let dataset = CsvSource::new("data/orders_*.csv").load().await?;
//! let manager = CheckManager::new(Arc::new(CheckRegistry::builtin()), config.execution.clone());
//! let outcome = manager.run(dataset, &config.metadata, &config.checks).await?;
//!
//! print!("{}", HumanFormatter::new().format(&config.metadata, &outcome)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Check Types
//!
//! - **completeness**: null fraction, optionally compared with an earlier period
//! - **uniqueness**: duplicate count
//! - **range**: share of values outside `[min_value, max_value]`
//! - **turnover**: identifiers added or dropped between periods
//! - **value_spike**: per-identifier jumps between periods
//! - **frequency**: shifts in category shares
//! - **correlation**: Pearson correlation over time or between two columns
//! - **statistical**: mean, median, std, sum, count, min, max, skew, kurtosis
//! - **distribution**: two-sample Kolmogorov-Smirnov test
//! - **drift**: PSI, KS statistic or Jensen-Shannon divergence on quantile bins
//!
//! ## Error Handling
//!
//! Configuration problems abort a run before anything executes. Everything
//! else is isolated: a failing column produces one ERROR record for that
//! column, and a failing, panicking or timed-out check type produces one
//! ERROR record for that check type. See [`error::SentriError`].
//!
//! ## Logging
//!
//! The library emits `tracing` events and never installs a subscriber; use
//! [`logging::setup::init_logging`] or your own subscriber.

pub mod checks;
pub mod config;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod security;
pub mod sources;
pub mod stats;

#[cfg(test)]
pub mod test_helpers;
