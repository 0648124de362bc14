//! The raw tabular result of one warehouse query execution.
//!
//! A [`ResultTable`] wraps a single Arrow [`RecordBatch`]: named columns of
//! uniform declared type, all with equal length (Arrow enforces the length
//! invariant at construction). Multi-batch warehouse responses are
//! concatenated into one snapshot so consumers never observe a partial
//! result.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::{TableError, TableResult};

/// Immutable columnar snapshot of one query execution.
///
/// Produced only by the query executor; owned thereafter by the cache slot
/// that holds it. Never mutated in place — a re-run produces a fresh table.
#[derive(Debug, Clone)]
pub struct ResultTable {
    batch: RecordBatch,
}

impl ResultTable {
    /// Build a table from a warehouse response.
    ///
    /// Concatenates `batches` into one snapshot (an empty response yields a
    /// zero-row table with the given schema) and rejects duplicate column
    /// names, which would make name-based access ambiguous.
    pub fn try_new(schema: SchemaRef, batches: &[RecordBatch]) -> TableResult<Self> {
        let mut seen = HashSet::new();
        for field in schema.fields() {
            if !seen.insert(field.name().as_str()) {
                return Err(TableError::DuplicateColumn(field.name().clone()));
            }
        }
        let batch = concat_batches(&schema, batches)?;
        Ok(Self { batch })
    }

    /// Wrap an already-assembled batch, applying the same name checks.
    pub fn from_batch(batch: RecordBatch) -> TableResult<Self> {
        Self::try_new(batch.schema(), std::slice::from_ref(&batch))
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// The underlying schema.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// The underlying batch.
    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Column by name, or a [`TableError::MissingColumn`].
    pub fn column(&self, name: &str) -> TableResult<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// String column by name.
    pub fn str_column(&self, name: &str) -> TableResult<&StringArray> {
        let col = self.column(name)?;
        col.as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| TableError::WrongType {
                column: name.to_string(),
                expected: "Utf8",
                actual: col.data_type().to_string(),
            })
    }

    /// Date column by name.
    pub fn date_column(&self, name: &str) -> TableResult<&Date32Array> {
        let col = self.column(name)?;
        col.as_any()
            .downcast_ref::<Date32Array>()
            .ok_or_else(|| TableError::WrongType {
                column: name.to_string(),
                expected: "Date32",
                actual: col.data_type().to_string(),
            })
    }

    /// Numeric column materialized as `f64`, accepting `Int64` or `Float64`.
    ///
    /// Metric columns arrive zero-filled from the dense-frame queries, so a
    /// null here means an unmatched frame row and reads as `0.0`.
    pub fn numeric_column(&self, name: &str) -> TableResult<Vec<f64>> {
        let col = self.column(name)?;
        match col.data_type() {
            DataType::Float64 => {
                let arr = col
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .expect("checked Float64");
                Ok((0..arr.len())
                    .map(|i| if arr.is_null(i) { 0.0 } else { arr.value(i) })
                    .collect())
            }
            DataType::Int64 => {
                let arr = col
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .expect("checked Int64");
                #[allow(clippy::cast_precision_loss)]
                Ok((0..arr.len())
                    .map(|i| if arr.is_null(i) { 0.0 } else { arr.value(i) as f64 })
                    .collect())
            }
            other => Err(TableError::WrongType {
                column: name.to_string(),
                expected: "Int64 or Float64",
                actual: other.to_string(),
            }),
        }
    }

    /// Share the table behind an [`Arc`] for cache storage.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("company", DataType::Utf8, false),
            Field::new("trips", DataType::Int64, true),
            Field::new("sales", DataType::Float64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["Flash Cab", "Sun Taxi"])),
                Arc::new(Int64Array::from(vec![Some(10), None])),
                Arc::new(Float64Array::from(vec![100.5, 20.25])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_columns_equal_length() {
        let table = ResultTable::from_batch(sample_batch()).unwrap();
        for col in table.batch().columns() {
            assert_eq!(col.len(), table.num_rows());
        }
    }

    #[test]
    fn test_concat_preserves_rows() {
        let batch = sample_batch();
        let table = ResultTable::try_new(batch.schema(), &[batch.clone(), batch]).unwrap();
        assert_eq!(table.num_rows(), 4);
        assert_eq!(table.num_columns(), 3);
    }

    #[test]
    fn test_empty_response_yields_zero_rows() {
        let schema = sample_batch().schema();
        let table = ResultTable::try_new(schema, &[]).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 3);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int64, false),
            Field::new("a", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(Int64Array::from(vec![2])),
            ],
        )
        .unwrap();
        let err = ResultTable::try_new(schema, &[batch]).unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn(ref name) if name == "a"));
    }

    #[test]
    fn test_numeric_column_accepts_int_and_float() {
        let table = ResultTable::from_batch(sample_batch()).unwrap();
        assert_eq!(table.numeric_column("trips").unwrap(), vec![10.0, 0.0]);
        assert_eq!(table.numeric_column("sales").unwrap(), vec![100.5, 20.25]);
        assert!(matches!(
            table.numeric_column("company"),
            Err(TableError::WrongType { .. })
        ));
    }

    #[test]
    fn test_missing_column() {
        let table = ResultTable::from_batch(sample_batch()).unwrap();
        assert!(matches!(
            table.str_column("driver"),
            Err(TableError::MissingColumn(ref name)) if name == "driver"
        ));
    }
}
