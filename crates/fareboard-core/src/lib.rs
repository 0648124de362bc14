//! Core tabular model for the Fareboard dashboard.
//!
//! Everything heavy (aggregation, grouping, geospatial binning) runs on the
//! warehouse; this crate owns what comes back:
//!
//! - [`ResultTable`] — one immutable columnar snapshot per query run
//! - [`SessionCache`] — named slots holding the latest snapshot each
//! - [`view`] — pure derivations (top-N restriction, period coercion,
//!   column selection) feeding one visualization each
//! - [`export`] — delimited-text serialization for user download
//!
//! Derived views are never cached: they are recomputed from the current
//! slot contents on every render request.

pub mod cache;
pub mod error;
pub mod export;
pub mod table;
pub mod view;

pub use cache::SessionCache;
pub use error::TableError;
pub use table::ResultTable;
pub use view::{
    derive_full_series, derive_top_series, derive_weighted_cells, CellParams, DerivedView,
    PeriodGranularity, ViewError, ViewParams,
};
