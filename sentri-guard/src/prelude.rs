//! Prelude for commonly used types and traits in sentri-guard.

pub use crate::error::{ErrorContext, ErrorKind, Result, SentriError};
pub use crate::formatters::{FormatterConfig, RunFormatter};
pub use crate::logging::LogConfig;
