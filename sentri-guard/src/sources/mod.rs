//! Data sources that load a [`Dataset`] for a validation run.
//!
//! Only local CSV files are supported; paths may be glob patterns.

use crate::core::Dataset;
use crate::prelude::*;
use async_trait::async_trait;
use std::fmt::Debug;

mod csv;

pub use csv::{CsvOptions, CsvSource};

/// Something that can produce the dataset a run validates.
///
/// # Examples
///
/// ```rust,no_run
/// use sentri_guard::sources::{CsvSource, DataSource};
///
/// # async fn example() -> sentri_guard::prelude::Result<()> {
/// let source = CsvSource::new("data/orders_*.csv");
/// let dataset = source.load().await?;
/// println!("{} rows from {}", dataset.num_rows(), source.description());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DataSource: Debug + Send + Sync {
    /// Reads the source into memory.
    async fn load(&self) -> Result<Dataset>;

    /// Returns a human-readable description of this data source.
    fn description(&self) -> String;
}

/// Expands glob patterns into the files they match, in pattern order.
pub(crate) fn expand_globs(patterns: &[String]) -> Result<Vec<String>> {
    use glob::glob;

    let mut paths = Vec::new();
    for pattern in patterns {
        let matches = glob(pattern).map_err(|e| {
            SentriError::config(format!("invalid glob pattern '{pattern}': {e}"))
        })?;

        for entry in matches {
            let path = entry.map_err(|e| SentriError::Io(e.into_error()))?;
            if path.is_file() {
                if let Some(path_str) = path.to_str() {
                    paths.push(path_str.to_string());
                }
            }
        }
    }

    if paths.is_empty() {
        return Err(SentriError::config(format!(
            "no files found matching {}",
            patterns.join(", ")
        )));
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_globs_without_matches() {
        let err = expand_globs(&["/definitely/not/here/*.csv".to_string()]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_expand_globs_matches_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x\n1\n").unwrap();
        std::fs::write(dir.path().join("b.csv"), "x\n2\n").unwrap();
        std::fs::create_dir(dir.path().join("c.csv")).unwrap();
        let pattern = format!("{}/*.csv", dir.path().display());
        let paths = expand_globs(&[pattern]).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("a.csv"));
    }
}
