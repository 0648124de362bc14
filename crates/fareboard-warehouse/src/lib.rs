//! Warehouse access for the Fareboard dashboard.
//!
//! The warehouse is an external collaborator with a narrow contract: it
//! accepts SQL text plus an optional destination table with write-truncate
//! semantics, and returns a columnar result or an error. This crate owns
//! that contract ([`Warehouse`]), the [`QueryExecutor`] that turns a
//! [`QueryDefinition`] into a cached [`fareboard_core::ResultTable`], the
//! dashboard's query catalog, and an embedded `DataFusion`-backed warehouse
//! used for local runs and tests.

pub mod client;
pub mod error;
pub mod executor;
pub mod local;
pub mod queries;

pub use client::{Warehouse, WarehouseResponse};
pub use error::{QueryError, WarehouseError};
pub use executor::{QueryDefinition, QueryExecutor};
pub use local::DataFusionWarehouse;
