//! Delimited-text export of any table for user download.
//!
//! Pure and side-effect free: columns in display order, a header row, one
//! record per row. Floats use Rust's shortest round-trip formatting, so
//! parsing the output reproduces the original values exactly.

use arrow::array::{Array, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::array::TimestampNanosecondArray;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow::temporal_conversions::{date32_to_datetime, timestamp_ns_to_datetime};

use crate::error::{TableError, TableResult};

/// Serialize `batch` to CSV text.
///
/// Supports the column types a warehouse result can carry: strings,
/// integers, floats, `Date32`, and nanosecond timestamps. Null cells export
/// as empty fields.
pub fn to_csv(batch: &RecordBatch) -> TableResult<String> {
    let schema = batch.schema();
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);

        let header: Vec<&str> = schema
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect();
        writer.write_record(&header)?;

        for row in 0..batch.num_rows() {
            let mut record = Vec::with_capacity(batch.num_columns());
            for (idx, column) in batch.columns().iter().enumerate() {
                record.push(format_cell(schema.field(idx).name(), column, row)?);
            }
            writer.write_record(&record)?;
        }
        writer
            .flush()
            .map_err(|e| TableError::Csv(csv::Error::from(e)))?;
    }
    Ok(String::from_utf8(buf).expect("csv output is valid utf8"))
}

fn format_cell(name: &str, column: &dyn Array, row: usize) -> TableResult<String> {
    if column.is_null(row) {
        return Ok(String::new());
    }
    match column.data_type() {
        DataType::Utf8 => {
            let arr = column
                .as_any()
                .downcast_ref::<StringArray>()
                .expect("checked Utf8");
            Ok(arr.value(row).to_string())
        }
        DataType::Int64 => {
            let arr = column
                .as_any()
                .downcast_ref::<Int64Array>()
                .expect("checked Int64");
            Ok(arr.value(row).to_string())
        }
        DataType::Float64 => {
            let arr = column
                .as_any()
                .downcast_ref::<Float64Array>()
                .expect("checked Float64");
            Ok(arr.value(row).to_string())
        }
        DataType::Date32 => {
            let arr = column
                .as_any()
                .downcast_ref::<Date32Array>()
                .expect("checked Date32");
            let date = date32_to_datetime(arr.value(row)).ok_or_else(|| {
                TableError::UnsupportedExport {
                    column: name.to_string(),
                    data_type: "Date32 (out of range)".to_string(),
                }
            })?;
            Ok(date.format("%Y-%m-%d").to_string())
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            let arr = column
                .as_any()
                .downcast_ref::<TimestampNanosecondArray>()
                .expect("checked Timestamp");
            let ts = timestamp_ns_to_datetime(arr.value(row)).ok_or_else(|| {
                TableError::UnsupportedExport {
                    column: name.to_string(),
                    data_type: "Timestamp (out of range)".to_string(),
                }
            })?;
            Ok(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }
        other => Err(TableError::UnsupportedExport {
            column: name.to_string(),
            data_type: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::datatypes::{Field, Schema};

    fn mixed_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("company", DataType::Utf8, false),
            Field::new("trips", DataType::Int64, false),
            Field::new("sales", DataType::Float64, false),
            Field::new("period", DataType::Date32, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["Flash Cab", "Sun, Taxi"])),
                Arc::new(Int64Array::from(vec![42, 7])),
                Arc::new(Float64Array::from(vec![1234.5, 0.1])),
                // 2021-01-01 and 2021-02-01 as days since epoch
                Arc::new(Date32Array::from(vec![18628, 18659])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_export_round_trip() {
        let batch = mixed_batch();
        let text = to_csv(&batch).unwrap();

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        assert_eq!(
            reader.headers().unwrap(),
            &csv::StringRecord::from(vec!["company", "trips", "sales", "period"])
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), batch.num_rows());
        assert_eq!(&rows[0][0], "Flash Cab");
        assert_eq!(&rows[1][0], "Sun, Taxi"); // embedded delimiter survives quoting
        assert_eq!(rows[0][1].parse::<i64>().unwrap(), 42);
        assert_eq!(rows[0][2].parse::<f64>().unwrap(), 1234.5);
        assert_eq!(rows[1][2].parse::<f64>().unwrap(), 0.1);
        assert_eq!(&rows[0][3], "2021-01-01");
        assert_eq!(&rows[1][3], "2021-02-01");
    }

    #[test]
    fn test_null_exports_as_empty_field() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("company", DataType::Utf8, false),
            Field::new("trips", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["Flash Cab", "Sun Taxi"])),
                Arc::new(Int64Array::from(vec![Some(1), None])),
            ],
        )
        .unwrap();
        let text = to_csv(&batch).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["company,trips", "Flash Cab,1", "Sun Taxi,"]);
    }

    #[test]
    fn test_unsupported_type_is_an_error() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "flag",
            DataType::Boolean,
            false,
        )]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(arrow::array::BooleanArray::from(vec![true]))],
        )
        .unwrap();
        assert!(matches!(
            to_csv(&batch),
            Err(TableError::UnsupportedExport { .. })
        ));
    }
}
