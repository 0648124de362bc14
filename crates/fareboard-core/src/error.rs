//! Table-level error types.
//!
//! Provides [`TableError`] for malformed or unsupported tabular data, plus
//! a convenience [`TableResult`] alias. Derivation errors live in
//! [`crate::view::ViewError`].

use thiserror::Error;

/// Result alias for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Errors raised at the boundary between the warehouse and the tabular model.
///
/// A well-formed warehouse response never triggers these; they are defensive
/// checks so malformed output surfaces as an error instead of garbage.
#[derive(Debug, Error)]
pub enum TableError {
    /// Two columns in one result share a name.
    #[error("duplicate column name '{0}' in query result")]
    DuplicateColumn(String),

    /// A column referenced by name is not present.
    #[error("column '{0}' not found")]
    MissingColumn(String),

    /// A column exists but holds a different type than requested.
    #[error("column '{column}' has type {actual}, expected {expected}")]
    WrongType {
        /// Column name.
        column: String,
        /// The type the caller asked for.
        expected: &'static str,
        /// The type actually present.
        actual: String,
    },

    /// A column type has no delimited-text representation.
    #[error("column '{column}' of type {data_type} cannot be exported")]
    UnsupportedExport {
        /// Column name.
        column: String,
        /// The unsupported Arrow type.
        data_type: String,
    },

    /// An Arrow error propagated from batch construction.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Writing delimited text failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
