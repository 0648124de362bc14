//! Embedded `DataFusion`-backed warehouse.
//!
//! Used for local runs and tests in place of a remote columnar warehouse.
//! Implements the same contract: SQL in, columnar snapshot out, optional
//! write-truncate destination table, and the `cell_index` geospatial
//! capability registered as a scalar UDF.
//!
//! The public surface stays blocking per the dashboard's single-threaded
//! request model; a current-thread tokio runtime owned by the warehouse
//! drives `DataFusion` internally.

use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::error::DataFusionError;
use datafusion::logical_expr::{ColumnarValue, ScalarUDF, Volatility};
use datafusion::prelude::{create_udf, SessionContext};
use tokio::runtime::Runtime;

use crate::client::{Warehouse, WarehouseResponse};
use crate::error::WarehouseError;

/// In-process warehouse over registered in-memory tables.
pub struct DataFusionWarehouse {
    ctx: SessionContext,
    runtime: Runtime,
}

impl std::fmt::Debug for DataFusionWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFusionWarehouse").finish_non_exhaustive()
    }
}

impl DataFusionWarehouse {
    /// Create an empty warehouse with the `cell_index` UDF registered.
    pub fn new() -> Result<Self, WarehouseError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| WarehouseError::Runtime(e.to_string()))?;
        let ctx = SessionContext::new();
        ctx.register_udf(cell_index_udf());
        Ok(Self { ctx, runtime })
    }

    /// Register (or replace) a named table from in-memory batches.
    pub fn register_table(
        &self,
        name: &str,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<(), WarehouseError> {
        let table = MemTable::try_new(schema, vec![batches])
            .map_err(|e| WarehouseError::Execution(e.to_string()))?;
        let _ = self
            .ctx
            .deregister_table(name)
            .map_err(|e| WarehouseError::Execution(e.to_string()))?;
        self.ctx
            .register_table(name, Arc::new(table))
            .map_err(|e| WarehouseError::Execution(e.to_string()))?;
        tracing::debug!(table = name, "registered warehouse table");
        Ok(())
    }

    async fn run_sql(&self, sql: &str) -> Result<WarehouseResponse, WarehouseError> {
        let df = self
            .ctx
            .sql(sql)
            .await
            .map_err(|e| WarehouseError::Planning(e.to_string()))?;
        let schema: SchemaRef = Arc::new(df.schema().as_arrow().clone());
        let batches = df
            .collect()
            .await
            .map_err(|e| WarehouseError::Execution(e.to_string()))?;
        Ok(WarehouseResponse { schema, batches })
    }
}

impl Warehouse for DataFusionWarehouse {
    fn execute(
        &self,
        sql: &str,
        destination: Option<&str>,
    ) -> Result<WarehouseResponse, WarehouseError> {
        self.runtime.block_on(async {
            let response = self.run_sql(sql).await?;
            let Some(dest) = destination else {
                return Ok(response);
            };

            // Write-truncate: replace the destination wholesale, then read
            // back from it so the caller sees the destination's state, not
            // the in-flight stream.
            let as_dest_error = |e: DataFusionError| WarehouseError::Destination {
                destination: dest.to_string(),
                message: e.to_string(),
            };
            let table = MemTable::try_new(
                Arc::clone(&response.schema),
                vec![response.batches],
            )
            .map_err(as_dest_error)?;
            let _ = self.ctx.deregister_table(dest).map_err(as_dest_error)?;
            self.ctx
                .register_table(dest, Arc::new(table))
                .map_err(as_dest_error)?;

            self.run_sql(&format!("SELECT * FROM {dest}")).await
        })
    }
}

/// `cell_index(lat, lng, res) -> Utf8`: the warehouse-side geospatial
/// binning capability.
///
/// Deterministically maps a coordinate to a fixed-resolution cell
/// identifier. Consumers treat the identifier as opaque; only
/// [`decode_cell_center`] (for surfaces owned by this warehouse) knows the
/// encoding.
fn cell_index_udf() -> ScalarUDF {
    let fun = Arc::new(
        |args: &[ColumnarValue]| -> datafusion::error::Result<ColumnarValue> {
            let arrays = ColumnarValue::values_to_arrays(args)?;
            let lat = downcast_f64(&arrays[0], "lat")?;
            let lng = downcast_f64(&arrays[1], "lng")?;
            let res = arrays[2]
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| {
                    DataFusionError::Execution("cell_index: res must be BIGINT".to_string())
                })?;

            let mut cells: Vec<Option<String>> = Vec::with_capacity(lat.len());
            for i in 0..lat.len() {
                if lat.is_null(i) || lng.is_null(i) || res.is_null(i) {
                    cells.push(None);
                } else {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let resolution = res.value(i).clamp(0, 15) as u8;
                    cells.push(Some(encode_cell(lat.value(i), lng.value(i), resolution)));
                }
            }
            Ok(ColumnarValue::Array(Arc::new(StringArray::from(cells))))
        },
    );
    create_udf(
        "cell_index",
        vec![DataType::Float64, DataType::Float64, DataType::Int64],
        DataType::Utf8,
        Volatility::Immutable,
        fun,
    )
}

fn downcast_f64<'a>(
    array: &'a Arc<dyn Array>,
    name: &str,
) -> datafusion::error::Result<&'a Float64Array> {
    array.as_any().downcast_ref::<Float64Array>().ok_or_else(|| {
        DataFusionError::Execution(format!("cell_index: {name} must be DOUBLE"))
    })
}

/// Bins per degree at a resolution. Doubles with each resolution step;
/// resolution 8 gives 1/16-degree cells (~7 km at Chicago's latitude).
fn bins_per_degree(resolution: u8) -> f64 {
    f64::from(1u32 << u32::from(resolution.saturating_sub(4).min(16)))
}

fn encode_cell(lat: f64, lng: f64, resolution: u8) -> String {
    let bins = bins_per_degree(resolution);
    #[allow(clippy::cast_possible_truncation)]
    let lat_bin = (lat * bins).floor() as i64;
    #[allow(clippy::cast_possible_truncation)]
    let lng_bin = (lng * bins).floor() as i64;
    format!("{resolution}:{lat_bin}:{lng_bin}")
}

/// Center coordinate of a cell produced by this warehouse's `cell_index`.
///
/// Returns `None` for identifiers minted elsewhere.
#[must_use]
pub fn decode_cell_center(cell: &str) -> Option<(f64, f64)> {
    let mut parts = cell.split(':');
    let resolution: u8 = parts.next()?.parse().ok()?;
    let lat_bin: i64 = parts.next()?.parse().ok()?;
    let lng_bin: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let bins = bins_per_degree(resolution);
    #[allow(clippy::cast_precision_loss)]
    let center = |bin: i64| (bin as f64 + 0.5) / bins;
    Some((center(lat_bin), center(lng_bin)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};

    fn sample_table() -> (SchemaRef, RecordBatch) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("company", DataType::Utf8, false),
            Field::new("total", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(StringArray::from(vec!["Flash Cab", "Sun Taxi"])),
                Arc::new(Float64Array::from(vec![10.0, 20.0])),
            ],
        )
        .unwrap();
        (schema, batch)
    }

    #[test]
    fn test_execute_simple_query() {
        let warehouse = DataFusionWarehouse::new().unwrap();
        let (schema, batch) = sample_table();
        warehouse.register_table("trips", schema, vec![batch]).unwrap();

        let response = warehouse
            .execute("SELECT company FROM trips ORDER BY company", None)
            .unwrap();
        assert_eq!(response.schema.fields().len(), 1);
        assert_eq!(response.batches.iter().map(RecordBatch::num_rows).sum::<usize>(), 2);
    }

    #[test]
    fn test_malformed_query_is_planning_error() {
        let warehouse = DataFusionWarehouse::new().unwrap();
        let err = warehouse.execute("SELEC nonsense", None).unwrap_err();
        assert!(matches!(err, WarehouseError::Planning(_)));
    }

    #[test]
    fn test_destination_write_truncate() {
        let warehouse = DataFusionWarehouse::new().unwrap();
        let (schema, batch) = sample_table();
        warehouse.register_table("trips", schema, vec![batch]).unwrap();

        let first = warehouse
            .execute("SELECT company FROM trips", Some("dest_companies"))
            .unwrap();
        assert_eq!(first.batches.iter().map(RecordBatch::num_rows).sum::<usize>(), 2);

        // Second run replaces, never appends.
        let second = warehouse
            .execute(
                "SELECT company FROM trips WHERE company = 'Sun Taxi'",
                Some("dest_companies"),
            )
            .unwrap();
        assert_eq!(second.batches.iter().map(RecordBatch::num_rows).sum::<usize>(), 1);

        let read_back = warehouse
            .execute("SELECT * FROM dest_companies", None)
            .unwrap();
        assert_eq!(
            read_back.batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
            1
        );
    }

    #[test]
    fn test_cell_index_udf_bins_coordinates() {
        let warehouse = DataFusionWarehouse::new().unwrap();
        let schema = Arc::new(Schema::new(vec![
            Field::new("lat", DataType::Float64, true),
            Field::new("lng", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(Float64Array::from(vec![
                    Some(41.88),
                    Some(41.881),
                    Some(41.95),
                    None,
                ])),
                Arc::new(Float64Array::from(vec![
                    Some(-87.68),
                    Some(-87.679),
                    Some(-87.68),
                    Some(-87.0),
                ])),
            ],
        )
        .unwrap();
        warehouse.register_table("coords", schema, vec![batch]).unwrap();

        let response = warehouse
            .execute("SELECT cell_index(lat, lng, 8) AS cell FROM coords", None)
            .unwrap();
        let all = arrow::compute::concat_batches(&response.schema, &response.batches).unwrap();
        let cells = all
            .column_by_name("cell")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        // Nearby coordinates share a cell; distant ones do not; null passes through.
        assert_eq!(cells.value(0), cells.value(1));
        assert_ne!(cells.value(0), cells.value(2));
        assert!(cells.is_null(3));
    }

    #[test]
    fn test_cell_encoding_is_deterministic_and_decodable() {
        let a = encode_cell(41.8379, -87.6828, 8);
        let b = encode_cell(41.8379, -87.6828, 8);
        assert_eq!(a, b);

        let (lat, lng) = decode_cell_center(&a).unwrap();
        // Center lies within one cell width of the input.
        let width = 1.0 / bins_per_degree(8);
        assert!((lat - 41.8379).abs() < width);
        assert!((lng - -87.6828).abs() < width);

        assert!(decode_cell_center("8815a91a1").is_none());
        assert!(decode_cell_center("8:1:2:3").is_none());
    }
}
