//! The in-memory dataset a run validates, and filtered views over it.
//!
//! A [`Dataset`] wraps one Arrow [`RecordBatch`] whose column names have been
//! lower-cased. Filtering never touches the shared batch: each filter produces
//! a new [`Frame`] holding its own batch. Periods are the distinct values of
//! the date column, which is stored as `Date32`.

use crate::config::PeriodSelector;
use crate::prelude::*;
use crate::security::SqlSecurity;
use arrow::array::{Array, ArrayRef, AsArray, Date32Array, RecordBatch, RecordBatchOptions};
use arrow::compute::kernels::cmp::eq;
use arrow::compute::{cast_with_options, concat_batches, filter_record_batch, CastOptions};
use arrow::datatypes::{DataType, Date32Type, Field, Float64Type, Schema, SchemaRef};
use chrono::{Datelike, NaiveDate};
use datafusion::prelude::SessionContext;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Days between 0001-01-01 and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Converts a `Date32` value into a calendar date.
pub fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

fn days_from_date(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// An immutable, name-normalized table.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Wraps a batch, lower-casing every column name.
    ///
    /// Two columns whose names only differ in case are a configuration error.
    pub fn new(batch: RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let name = field.name().to_lowercase();
            if !seen.insert(name.clone()) {
                return Err(SentriError::config(format!(
                    "duplicate column '{name}' after case normalization"
                )));
            }
            fields.push(Field::clone(field).with_name(name));
        }
        let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
        let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
        let batch = RecordBatch::try_new_with_options(schema, batch.columns().to_vec(), &options)?;
        Ok(Self { batch })
    }

    /// Concatenates batches sharing `schema` into one dataset.
    pub fn from_batches(schema: SchemaRef, batches: &[RecordBatch]) -> Result<Self> {
        Self::new(concat_batches(&schema, batches)?)
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().index_of(name).is_ok()
    }

    /// Parses `column` into `Date32`.
    ///
    /// Strings must be `YYYY-MM-DD`; timestamps are truncated to their day. Anything unparseable is a
    /// configuration error because no period logic can run without dates.
    pub fn with_date_column(self, column: &str) -> Result<Self> {
        let schema = self.batch.schema();
        let index = schema.index_of(column).map_err(|_| {
            SentriError::config(format!("date column '{column}' not found in dataset"))
        })?;
        let source = self.batch.column(index);
        if source.data_type() == &DataType::Date32 {
            return Ok(self);
        }
        let parsable = matches!(
            source.data_type(),
            DataType::Utf8
                | DataType::LargeUtf8
                | DataType::Utf8View
                | DataType::Date64
                | DataType::Timestamp(_, _)
        );
        if !parsable {
            return Err(SentriError::config(format!(
                "date column '{column}' has unsupported type {}",
                source.data_type()
            )));
        }
        let options = CastOptions {
            safe: false,
            ..Default::default()
        };
        let parsed = cast_with_options(source, &DataType::Date32, &options).map_err(|e| {
            SentriError::config(format!("date column '{column}' could not be parsed: {e}"))
        })?;

        let mut fields: Vec<Field> = schema.fields().iter().map(|f| Field::clone(f)).collect();
        fields[index] = Field::new(column, DataType::Date32, true);
        let mut columns = self.batch.columns().to_vec();
        columns[index] = parsed;
        let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
        let batch = RecordBatch::try_new(schema, columns)?;
        Ok(Self { batch })
    }

    /// An unfiltered view.
    pub fn frame(&self, date_column: &str) -> Result<Frame> {
        Frame::new(self.batch.clone(), date_column)
    }

    /// A view restricted to rows matching `predicate`, compiled with DataFusion.
    ///
    /// Any failure to screen, parse, plan or execute the predicate is reported
    /// as a filter error.
    pub async fn filtered(&self, date_column: &str, predicate: Option<&str>) -> Result<Frame> {
        let Some(predicate) = predicate else {
            return self.frame(date_column);
        };
        SqlSecurity::validate_filter_predicate(predicate)?;

        let to_filter_error = |e: &dyn std::fmt::Display| SentriError::filter(predicate, e.to_string());
        let ctx = SessionContext::new();
        let df = ctx
            .read_batch(self.batch.clone())
            .map_err(|e| to_filter_error(&e))?;
        let expr = ctx
            .parse_sql_expr(predicate, df.schema())
            .map_err(|e| to_filter_error(&e))?;
        let filtered = df.filter(expr).map_err(|e| to_filter_error(&e))?;
        let schema: SchemaRef = filtered.schema().inner().clone();
        let batches = filtered.collect().await.map_err(|e| to_filter_error(&e))?;
        let batch = concat_batches(&schema, &batches).map_err(|e| to_filter_error(&e))?;

        debug!(
            filter.predicate = %predicate,
            filter.rows_in = self.batch.num_rows(),
            filter.rows_out = batch.num_rows(),
            "Applied filter"
        );
        Frame::new(batch, date_column)
    }
}

/// A filtered slice of the dataset with period helpers.
#[derive(Debug, Clone)]
pub struct Frame {
    batch: RecordBatch,
    date_index: usize,
}

impl Frame {
    fn new(batch: RecordBatch, date_column: &str) -> Result<Self> {
        let date_index = batch.schema().index_of(date_column).map_err(|_| {
            SentriError::config(format!("date column '{date_column}' not found in dataset"))
        })?;
        if batch.column(date_index).data_type() != &DataType::Date32 {
            return Err(SentriError::Internal(format!(
                "date column '{date_column}' was not parsed before use"
            )));
        }
        Ok(Self { batch, date_index })
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    fn dates(&self) -> &Date32Array {
        self.batch.column(self.date_index).as_primitive::<Date32Type>()
    }

    /// Distinct non-null periods in ascending order.
    pub fn periods(&self) -> Vec<NaiveDate> {
        let days: BTreeSet<i32> = self.dates().iter().flatten().collect();
        days.into_iter().filter_map(date_from_days).collect()
    }

    /// The latest period present.
    pub fn current_period(&self) -> Option<NaiveDate> {
        self.dates().iter().flatten().max().and_then(date_from_days)
    }

    /// Resolves a comparison directive relative to `current`.
    ///
    /// Returns `None` when the requested period does not exist or would be
    /// the current period itself.
    pub fn resolve_period(&self, selector: PeriodSelector, current: NaiveDate) -> Option<NaiveDate> {
        let periods = self.periods();
        let resolved = match selector {
            PeriodSelector::Previous => periods.iter().rev().find(|d| **d < current).copied(),
            PeriodSelector::First => periods.first().copied(),
            PeriodSelector::Date(date) => periods.iter().find(|d| **d == date).copied(),
        };
        resolved.filter(|d| *d != current)
    }

    /// Rows belonging to one period.
    pub fn period(&self, date: NaiveDate) -> Result<Frame> {
        let scalar = Date32Array::new_scalar(days_from_date(date));
        let mask = eq(self.batch.column(self.date_index), &scalar)?;
        Ok(Frame {
            batch: filter_record_batch(&self.batch, &mask)?,
            date_index: self.date_index,
        })
    }

    pub fn column(&self, name: &str) -> Result<&ArrayRef> {
        let index = self
            .batch
            .schema()
            .index_of(name)
            .map_err(|_| SentriError::ColumnNotFound {
                column: name.to_string(),
            })?;
        Ok(self.batch.column(index))
    }

    /// Number of null entries in `name`.
    pub fn null_count(&self, name: &str) -> Result<usize> {
        Ok(self.column(name)?.null_count())
    }

    /// Values of a numeric column as `f64`; NaN counts as missing.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let array = self.column(name)?;
        if !array.data_type().is_numeric() {
            return Err(SentriError::data_type(name, "numeric", array.data_type()));
        }
        let casted = arrow::compute::cast(array, &DataType::Float64)?;
        Ok(casted
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect())
    }

    /// Non-missing numeric values.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.numeric(name)?.into_iter().flatten().collect())
    }

    /// Values of any column rendered as strings.
    pub fn text(&self, name: &str) -> Result<Vec<Option<String>>> {
        let array = self.column(name)?;
        let casted = arrow::compute::cast(array, &DataType::Utf8)
            .map_err(|_| SentriError::data_type(name, "string-convertible", array.data_type()))?;
        Ok(casted
            .as_string::<i32>()
            .iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    /// First non-missing numeric value of `column` for every identifier.
    pub fn first_by_id(&self, id_column: &str, column: &str) -> Result<BTreeMap<String, f64>> {
        let ids = self.text(id_column)?;
        let values = self.numeric(column)?;
        let mut out = BTreeMap::new();
        for (id, value) in ids.into_iter().zip(values) {
            if let (Some(id), Some(value)) = (id, value) {
                out.entry(id).or_insert(value);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};

    fn sample() -> Dataset {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Order_Date", DataType::Utf8, true),
            Field::new("ID", DataType::Int64, false),
            Field::new("Amount", DataType::Float64, true),
            Field::new("Status", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![
                    "2024-01-01",
                    "2024-01-01",
                    "2024-01-02",
                    "2024-01-03",
                    "2024-01-03",
                ])),
                Arc::new(Int64Array::from(vec![1, 2, 1, 1, 2])),
                Arc::new(Float64Array::from(vec![
                    Some(10.0),
                    None,
                    Some(f64::NAN),
                    Some(12.0),
                    Some(30.0),
                ])),
                Arc::new(StringArray::from(vec!["open", "closed", "open", "closed", "open"])),
            ],
        )
        .unwrap();
        Dataset::new(batch)
            .unwrap()
            .with_date_column("order_date")
            .unwrap()
    }

    #[test]
    fn test_names_are_lowercased() {
        let ds = sample();
        assert!(ds.has_column("amount"));
        assert!(!ds.has_column("Amount"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int64, false),
            Field::new("A", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(Int64Array::from(vec![2])),
            ],
        )
        .unwrap();
        assert!(Dataset::new(batch).unwrap_err().is_fatal());
    }

    #[test]
    fn test_periods_and_selection() {
        let frame = sample().frame("order_date").unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        assert_eq!(frame.periods(), vec![d(1), d(2), d(3)]);
        let current = frame.current_period().unwrap();
        assert_eq!(current, d(3));
        assert_eq!(frame.resolve_period(PeriodSelector::Previous, current), Some(d(2)));
        assert_eq!(frame.resolve_period(PeriodSelector::First, current), Some(d(1)));
        assert_eq!(
            frame.resolve_period(PeriodSelector::Date(d(3)), current),
            None
        );
        assert_eq!(
            frame.resolve_period(PeriodSelector::Date(d(9)), current),
            None
        );
        assert_eq!(frame.period(d(1)).unwrap().num_rows(), 2);
    }

    #[test]
    fn test_numeric_treats_nan_as_missing() {
        let frame = sample().frame("order_date").unwrap();
        let values = frame.numeric("amount").unwrap();
        assert_eq!(values, vec![Some(10.0), None, None, Some(12.0), Some(30.0)]);
        let err = frame.numeric("status").unwrap_err();
        assert_eq!(err.kind().as_str(), "DataTypeError");
    }

    #[test]
    fn test_first_by_id() {
        let frame = sample().frame("order_date").unwrap();
        let by_id = frame.first_by_id("id", "amount").unwrap();
        assert_eq!(by_id.get("1"), Some(&10.0));
        assert_eq!(by_id.get("2"), Some(&30.0));
    }

    #[test]
    fn test_unparseable_dates_are_fatal() {
        let schema = Arc::new(Schema::new(vec![Field::new("d", DataType::Utf8, true)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(vec!["not a date"]))])
                .unwrap();
        let err = Dataset::new(batch).unwrap().with_date_column("d").unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_filter_creates_new_view() {
        let ds = sample();
        let frame = ds
            .filtered("order_date", Some("status = 'closed'"))
            .await
            .unwrap();
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(ds.num_rows(), 5);
    }

    #[tokio::test]
    async fn test_malformed_filter_is_filter_error() {
        let ds = sample();
        let err = ds
            .filtered("order_date", Some("amount >"))
            .await
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "FilterError");

        let err = ds
            .filtered("order_date", Some("no_such_column = 1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "FilterError");
    }
}
