//! Derived views: pure transformations from a raw result to the table one
//! visualization consumes.
//!
//! A derived view is a deterministic function of `(ResultTable, params)` —
//! no hidden state, nothing cached. Render requests recompute from the
//! current cache slot contents every time, so a re-run of the backing query
//! is picked up automatically.
//!
//! The deriver assumes dense frames: the source queries emit the complete
//! entity × period cross-product with metrics coalesced to zero, so no
//! re-densification happens here.

mod derive;
mod temporal;

pub use derive::{
    derive_full_series, derive_top_series, derive_weighted_cells, CellParams, DerivedView,
    PERIOD_COLUMN,
};
pub use temporal::PeriodGranularity;

use thiserror::Error;

use crate::error::TableError;

/// Result alias for view derivation.
pub type ViewResult<T> = Result<T, ViewError>;

/// A derivation assumption was violated.
///
/// Carries the view name so the user can tell which visualization is
/// affected; other slots and views stay usable.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A column named in the parameters is absent or mistyped.
    #[error("view '{view}': {source}")]
    Column {
        /// The view being derived.
        view: String,
        /// The underlying column lookup failure.
        #[source]
        source: TableError,
    },

    /// A period value did not parse under the view's format string.
    ///
    /// Parse failure on any row is an error, never a silent drop.
    #[error("view '{view}': period '{value}' does not match format '{format}'")]
    BadPeriod {
        /// The view being derived.
        view: String,
        /// The offending cell value.
        value: String,
        /// The format string in effect.
        format: &'static str,
    },

    /// `top_n` must be at least 1.
    #[error("view '{view}': top_n must be at least 1")]
    InvalidTopN {
        /// The view being derived.
        view: String,
    },

    /// The raw result already has a column named like the derived period
    /// column, so appending it would be ambiguous.
    #[error("view '{view}': result already has a '{column}' column")]
    ColumnClash {
        /// The view being derived.
        view: String,
        /// The clashing name.
        column: String,
    },

    /// An Arrow error during batch reshaping.
    #[error("view '{view}': arrow error: {source}")]
    Arrow {
        /// The view being derived.
        view: String,
        /// The underlying Arrow failure.
        #[source]
        source: arrow::error::ArrowError,
    },
}

/// Parameters for the series derivations.
///
/// `metric_column` is what gets plotted; `ranking_column` is what ranks
/// entities for the top-N restriction (the two differ for e.g. the
/// per-customer average, which is ranked by total sales).
#[derive(Debug, Clone)]
pub struct ViewParams {
    /// Name used in errors and prompts.
    pub name: String,
    /// Categorical column identifying the entity (company, payment type).
    pub entity_column: String,
    /// Numeric column the visualization plots.
    pub metric_column: String,
    /// Numeric column that ranks entities within the window.
    pub ranking_column: String,
    /// Textual period column to coerce.
    pub period_column: String,
    /// Period format of `period_column`.
    pub granularity: PeriodGranularity,
    /// Entity count to keep; default 3.
    pub top_n: usize,
    /// Inclusive lower bound on the ranking window. `None` ranks over the
    /// full series. The final view always spans the full series either way.
    pub window_start: Option<chrono::NaiveDate>,
}

impl ViewParams {
    /// Parameters for a top-N series view with the default `top_n` of 3.
    #[must_use]
    pub fn top_series(
        name: impl Into<String>,
        entity_column: impl Into<String>,
        metric_column: impl Into<String>,
        ranking_column: impl Into<String>,
        period_column: impl Into<String>,
        granularity: PeriodGranularity,
    ) -> Self {
        Self {
            name: name.into(),
            entity_column: entity_column.into(),
            metric_column: metric_column.into(),
            ranking_column: ranking_column.into(),
            period_column: period_column.into(),
            granularity,
            top_n: 3,
            window_start: None,
        }
    }

    /// Restrict the ranking window to periods at or after `start`.
    #[must_use]
    pub fn with_window(mut self, start: chrono::NaiveDate) -> Self {
        self.window_start = Some(start);
        self
    }

    /// Override the entity count.
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}
