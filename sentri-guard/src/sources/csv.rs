//! CSV file source.

use super::{expand_globs, DataSource};
use crate::core::Dataset;
use crate::prelude::*;
use async_trait::async_trait;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use serde_json::Value;
use tracing::{info, instrument};

/// Parsing options for CSV files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub has_header: bool,
    pub delimiter: u8,
    /// Rows sampled for schema inference.
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            schema_infer_max_records: 1000,
        }
    }
}

/// One or more CSV files (glob patterns allowed) read as a single table.
///
/// All matched files must share a schema.
#[derive(Debug, Clone)]
pub struct CsvSource {
    patterns: Vec<String>,
    options: CsvOptions,
}

impl CsvSource {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self::from_patterns(vec![pattern.into()])
    }

    pub fn from_patterns(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            options: CsvOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.options.delimiter = delimiter;
        self
    }

    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// Builds a source from the `source` section of a configuration file:
    ///
    /// ```yaml
    /// source:
    ///   type: csv
    ///   csv:
    ///     file_path: data/orders.csv
    ///     delimiter: ";"
    ///     has_header: true
    /// ```
    pub fn from_descriptor(descriptor: &Value) -> Result<Self> {
        let kind = descriptor
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("csv");
        if !kind.eq_ignore_ascii_case("csv") {
            return Err(SentriError::config(format!(
                "unsupported source type '{kind}'; only csv is available"
            )));
        }
        let section = descriptor.get("csv").unwrap_or(descriptor);
        let path = section
            .get("file_path")
            .or_else(|| section.get("path"))
            .and_then(Value::as_str)
            .ok_or_else(|| SentriError::config("source.csv.file_path is required"))?;

        let mut options = CsvOptions::default();
        if let Some(delimiter) = section.get("delimiter").and_then(Value::as_str) {
            options.delimiter = match delimiter.as_bytes() {
                [b] => *b,
                _ => {
                    return Err(SentriError::config(format!(
                        "source.csv.delimiter must be a single byte, got '{delimiter}'"
                    )))
                }
            };
        }
        if let Some(header) = section.get("has_header").and_then(Value::as_bool) {
            options.has_header = header;
        }
        Ok(Self::new(path).with_options(options))
    }
}

#[async_trait]
impl DataSource for CsvSource {
    #[instrument(skip(self), fields(source.patterns = ?self.patterns))]
    async fn load(&self) -> Result<Dataset> {
        let paths = expand_globs(&self.patterns)?;
        let ctx = SessionContext::new();
        let options = CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .schema_infer_max_records(self.options.schema_infer_max_records);
        let df = ctx.read_csv(paths.clone(), options).await?;
        let schema = df.schema().inner().clone();
        let batches = df.collect().await?;
        let dataset = Dataset::from_batches(schema, &batches)?;
        info!(
            source.files = paths.len(),
            source.rows = dataset.num_rows(),
            "Loaded CSV data"
        );
        Ok(dataset)
    }

    fn description(&self) -> String {
        format!("CSV: {}", self.patterns.join(", "))
    }
}
