//! Test helpers for running checks against small in-memory tables.

use crate::config::{ColumnCheckConfig, ColumnMap};
use crate::core::{Check, CheckContext, Dataset, ResultRecord, ThresholdBound, ThresholdSet};
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{Field, Schema};
use std::sync::Arc;

/// Builds a dataset from named columns; `date` is parsed as the date column.
pub fn dataset(columns: Vec<(&str, ArrayRef)>) -> Dataset {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, array)| array).collect();
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap();
    Dataset::new(batch).unwrap().with_date_column("date").unwrap()
}

pub fn strings(values: &[Option<&str>]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

pub fn dates(values: &[&str]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

pub fn floats(values: &[Option<f64>]) -> ArrayRef {
    Arc::new(Float64Array::from(values.to_vec()))
}

/// Absolute bounds; `None` leaves a bound unset.
pub fn absolute(critical: Option<f64>, warning: Option<f64>) -> ThresholdSet {
    ThresholdSet {
        absolute_critical: critical.map(ThresholdBound::Scalar),
        absolute_warning: warning.map(ThresholdBound::Scalar),
        ..Default::default()
    }
}

pub fn columns(entries: Vec<(&str, ColumnCheckConfig)>) -> ColumnMap {
    entries
        .into_iter()
        .map(|(name, settings)| (name.to_string(), settings))
        .collect()
}

/// Runs `check` with `date` / `id` as the key columns.
pub async fn run_check(check: &dyn Check, dataset: Dataset) -> Vec<ResultRecord> {
    let ctx = CheckContext::new(Arc::new(dataset), "date", "id");
    check.run(&ctx).await
}
