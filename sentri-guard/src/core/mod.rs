//! Core execution types for Sentri.
//!
//! ## Overview
//!
//! - **[`Dataset`]** / **[`Frame`]**: the shared table and filtered views of it
//! - **[`evaluate`]**: the threshold evaluator producing an [`Evaluation`]
//! - **[`RecordBuilder`]**: assembles the standardized [`ResultRecord`]
//! - **[`Check`]**: the trait every check variant implements
//! - **[`CheckManager`]**: runs all configured check types and aggregates a [`RunSummary`]
//!
//! ## Architecture
//!
//! ```text
//! CheckManager
//!     ├── CheckRegistry ──> Check (per check type)
//!     │                       └── per column: filter -> Frame -> evaluate_column
//!     │                                                   └── evaluate() -> RecordBuilder
//!     └── collector ──> Vec<ResultRecord> ──> RunSummary
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sentri_guard::core::{evaluate, CheckStatus, ThresholdBound, ThresholdKind, ThresholdSet};
//!
//! let thresholds = ThresholdSet {
//!     absolute_warning: Some(ThresholdBound::Scalar(0.05)),
//!     absolute_critical: Some(ThresholdBound::Scalar(0.10)),
//!     ..Default::default()
//! };
//! assert_eq!(evaluate(0.07, &thresholds, ThresholdKind::Absolute).status, CheckStatus::Warning);
//! ```

mod check;
mod dataset;
mod manager;
mod record;
mod status;
mod summary;
mod threshold;

pub use check::{run_columns, Check, CheckContext, ColumnScope};
pub use dataset::{date_from_days, Dataset, Frame};
pub use manager::{CheckManager, RunOutcome};
pub use record::{RecordBuilder, ResultRecord, MAX_SAMPLE_SIZE};
pub use status::{CheckStatus, Severity};
pub use summary::{ExitPolicy, RunSummary, StatusCounts};
pub use threshold::{
    evaluate, evaluate_directed, Direction, Evaluation, ThresholdBound, ThresholdKind,
    ThresholdSet,
};
