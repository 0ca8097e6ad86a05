//! Error types for the sentri-guard check engine.
//!
//! Errors fall into three tiers. Configuration errors abort a run before any
//! check is dispatched. Column-level errors (filter, data type, insufficient
//! data, calculation, missing column) are turned into ERROR result records for
//! one column. Check-type errors (timeouts, panics) become one ERROR record for
//! the whole check type. [`SentriError::kind`] exposes the tier-specific label
//! that lands in a record's `additional_metrics.error_type`.

use std::fmt;
use thiserror::Error;

/// The main error type for sentri-guard.
#[derive(Error, Debug)]
pub enum SentriError {
    /// Invalid configuration discovered before execution.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A filter predicate could not be compiled or applied.
    #[error("Filter error for predicate '{predicate}': {message}")]
    Filter { predicate: String, message: String },

    /// The column holds values of a type the check cannot process.
    #[error("Data type error for column '{column}': expected {expected}, found {found}")]
    DataType {
        column: String,
        expected: String,
        found: String,
    },

    /// Not enough samples to compute a metric or run a statistical test.
    #[error("Insufficient data: {message} (required {required}, found {found})")]
    InsufficientData {
        message: String,
        required: usize,
        found: usize,
    },

    /// A numeric computation produced an undefined result.
    #[error("Calculation error: {0}")]
    Calculation(String),

    /// A configured column does not exist in the dataset.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// A check type exceeded its execution budget.
    #[error("Check '{check_type}' timed out after {seconds}s")]
    Timeout { check_type: String, seconds: u64 },

    /// A check type failed unexpectedly while running.
    #[error("Check '{check_type}' failed unexpectedly: {message}")]
    CheckFailed { check_type: String, message: String },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from YAML deserialization.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error from JSON (de)serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Another error with a message describing what was being attempted.
    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<SentriError>,
    },
}

/// A type alias for `Result<T, SentriError>`.
pub type Result<T> = std::result::Result<T, SentriError>;

/// Stable classification of an error, written into ERROR records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Filter,
    DataType,
    InsufficientData,
    Calculation,
    MissingColumn,
    Timeout,
    Check,
    Internal,
}

impl ErrorKind {
    /// The label used in `additional_metrics.error_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Filter => "FilterError",
            ErrorKind::DataType => "DataTypeError",
            ErrorKind::InsufficientData => "InsufficientDataError",
            ErrorKind::Calculation => "CalculationError",
            ErrorKind::MissingColumn => "MissingColumnError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Check => "CheckError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SentriError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a filter error for the given predicate.
    pub fn filter(predicate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Filter {
            predicate: predicate.into(),
            message: message.into(),
        }
    }

    /// Creates a data type error.
    pub fn data_type(
        column: impl Into<String>,
        expected: impl Into<String>,
        found: impl fmt::Display,
    ) -> Self {
        Self::DataType {
            column: column.into(),
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Creates an insufficient data error.
    pub fn insufficient(message: impl Into<String>, required: usize, found: usize) -> Self {
        Self::InsufficientData {
            message: message.into(),
            required,
            found,
        }
    }

    /// Creates a calculation error.
    pub fn calculation(message: impl Into<String>) -> Self {
        Self::Calculation(message.into())
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SentriError::Configuration(_) | SentriError::Yaml(_) | SentriError::Json(_) => {
                ErrorKind::Configuration
            }
            SentriError::Filter { .. } => ErrorKind::Filter,
            SentriError::DataType { .. } => ErrorKind::DataType,
            SentriError::InsufficientData { .. } => ErrorKind::InsufficientData,
            SentriError::Calculation(_) => ErrorKind::Calculation,
            SentriError::ColumnNotFound { .. } => ErrorKind::MissingColumn,
            SentriError::Timeout { .. } => ErrorKind::Timeout,
            SentriError::CheckFailed { .. } => ErrorKind::Check,
            SentriError::DataFusion(_)
            | SentriError::Arrow(_)
            | SentriError::Io(_)
            | SentriError::Internal(_) => ErrorKind::Internal,
            SentriError::Context { source, .. } => source.kind(),
        }
    }

    /// Returns true when the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

impl From<fmt::Error> for SentriError {
    fn from(e: fmt::Error) -> Self {
        SentriError::Internal(format!("formatting failed: {e}"))
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<SentriError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                SentriError::Configuration(inner) => {
                    SentriError::Configuration(format!("{msg}: {inner}"))
                }
                SentriError::Yaml(inner) => SentriError::Configuration(format!("{msg}: {inner}")),
                SentriError::Json(inner) => SentriError::Configuration(format!("{msg}: {inner}")),
                SentriError::Internal(inner) => SentriError::Internal(format!("{msg}: {inner}")),
                other => SentriError::Context {
                    message: msg,
                    source: Box::new(other),
                },
            }
        })
    }
}
