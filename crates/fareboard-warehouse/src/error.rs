//! Warehouse and executor error types.

use thiserror::Error;

use fareboard_core::TableError;

/// A warehouse call failed.
///
/// Always carries a human-readable cause; the pipeline surfaces it to the
/// user and leaves the targeted cache slot untouched.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The query did not plan (malformed SQL, unknown table or function).
    #[error("query planning failed: {0}")]
    Planning(String),

    /// The query planned but failed during execution.
    #[error("query execution failed: {0}")]
    Execution(String),

    /// Writing or reading back the destination table failed.
    #[error("destination '{destination}' error: {message}")]
    Destination {
        /// The destination table name.
        destination: String,
        /// What went wrong.
        message: String,
    },

    /// The embedded runtime could not be set up.
    #[error("warehouse runtime error: {0}")]
    Runtime(String),
}

/// A query pipeline run failed.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The warehouse call itself failed.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// The warehouse responded, but the result violated a table invariant.
    #[error("malformed warehouse response: {0}")]
    Table(#[from] TableError),
}
