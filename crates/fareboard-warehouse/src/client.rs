//! The warehouse collaborator contract.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use crate::error::WarehouseError;

/// Raw response of one warehouse execution.
///
/// The schema travels separately so a zero-row result still describes its
/// columns.
#[derive(Debug, Clone)]
pub struct WarehouseResponse {
    /// Schema of the result.
    pub schema: SchemaRef,
    /// Result batches; may be empty.
    pub batches: Vec<RecordBatch>,
}

/// External warehouse collaborator.
///
/// `execute` blocks the calling flow until the warehouse responds or errors;
/// there is no cancellation — a long-running query finishes or fails on the
/// warehouse side regardless of local state.
///
/// When `destination` is given the warehouse materializes the result into
/// that table with write-truncate semantics (each run fully replaces prior
/// contents, never appends) and the returned response is a read-back of the
/// destination after the write, i.e. a consistent snapshot.
///
/// Query correctness is the warehouse's responsibility; implementations
/// perform no local validation of the SQL text.
pub trait Warehouse: Send + Sync {
    /// Run `sql`, optionally materializing into `destination` first.
    fn execute(
        &self,
        sql: &str,
        destination: Option<&str>,
    ) -> Result<WarehouseResponse, WarehouseError>;
}
