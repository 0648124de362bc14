//! The derivation functions behind each visualization.
//!
//! All three are pure: same raw table and parameters, same derived view.
//! The top-N restriction ranks entities inside a time window but the
//! resulting view spans the full unwindowed series for those entities.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Date32Array, StringArray};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::table::ResultTable;
use crate::view::temporal::days_since_epoch;
use crate::view::{PeriodGranularity, ViewError, ViewParams, ViewResult};

/// Name of the coerced `Date32` column appended by the series derivations.
pub const PERIOD_COLUMN: &str = "period";

/// Parameters for the weighted-cell derivation backing the map layer.
#[derive(Debug, Clone)]
pub struct CellParams {
    /// Name used in errors and prompts.
    pub name: String,
    /// Opaque spatial index column (e.g. the warehouse `cell_index` output).
    pub index_column: String,
    /// Numeric weight column.
    pub weight_column: String,
}

/// The table one visualization consumes, computed on demand.
#[derive(Debug, Clone)]
pub struct DerivedView {
    batch: RecordBatch,
    entities: Vec<String>,
}

impl DerivedView {
    /// The derived batch.
    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Entities present in the view, in ranking (or first-appearance) order.
    /// Empty for the weighted-cell derivation.
    #[must_use]
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }
}

/// Restrict a series to the top-N entities by windowed ranking-metric sum.
///
/// Entities are ranked by the sum of `ranking_column` over rows whose
/// period falls at or after `window_start`; the view then keeps every row —
/// all periods — for the `min(top_n, distinct entities)` winners. Ties on
/// the sum break by entity name ascending, so the selection is
/// deterministic regardless of input row order.
///
/// The coerced period lands in an appended [`PERIOD_COLUMN`] `Date32`
/// column.
pub fn derive_top_series(raw: &ResultTable, params: &ViewParams) -> ViewResult<DerivedView> {
    if params.top_n == 0 {
        return Err(ViewError::InvalidTopN {
            view: params.name.clone(),
        });
    }

    let entities = str_column(raw, params, &params.entity_column)?;
    let dates = coerce_periods(raw, params)?;
    let ranking = raw
        .numeric_column(&params.ranking_column)
        .map_err(|source| ViewError::Column {
            view: params.name.clone(),
            source,
        })?;

    // Every distinct entity is a candidate, even with no in-window rows.
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for row in 0..raw.num_rows() {
        if entities.is_null(row) {
            continue;
        }
        let entry = sums.entry(entities.value(row)).or_insert(0.0);
        let in_window = params.window_start.map_or(true, |start| dates[row] >= start);
        if in_window {
            *entry += ranking[row];
        }
    }

    let mut ranked: Vec<(&str, f64)> = sums.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked.truncate(params.top_n);

    let selected: Vec<String> = ranked.iter().map(|(name, _)| (*name).to_string()).collect();
    let keep: HashSet<&str> = ranked.iter().map(|(name, _)| *name).collect();

    tracing::debug!(
        view = %params.name,
        entities = ?selected,
        "top-n selection complete"
    );

    let mask: Vec<bool> = (0..raw.num_rows())
        .map(|row| !entities.is_null(row) && keep.contains(entities.value(row)))
        .collect();
    let kept_dates: Vec<NaiveDate> = dates
        .iter()
        .zip(&mask)
        .filter_map(|(date, keep)| keep.then_some(*date))
        .collect();

    let filtered = filter_record_batch(raw.batch(), &BooleanArray::from(mask)).map_err(
        |source| ViewError::Arrow {
            view: params.name.clone(),
            source,
        },
    )?;
    let batch = append_period_column(&params.name, &filtered, &kept_dates)?;

    Ok(DerivedView {
        batch,
        entities: selected,
    })
}

/// Coerce the period column and keep every entity — the stacked-area and
/// ratio views, where selection already happened warehouse-side.
///
/// Performs no arithmetic: ratio and percentage columns are consumed as
/// computed by the warehouse.
pub fn derive_full_series(raw: &ResultTable, params: &ViewParams) -> ViewResult<DerivedView> {
    let entities = str_column(raw, params, &params.entity_column)?;
    raw.numeric_column(&params.metric_column)
        .map_err(|source| ViewError::Column {
            view: params.name.clone(),
            source,
        })?;
    let dates = coerce_periods(raw, params)?;
    let batch = append_period_column(&params.name, raw.batch(), &dates)?;

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for row in 0..raw.num_rows() {
        if entities.is_null(row) {
            continue;
        }
        let name = entities.value(row);
        if seen.insert(name) {
            order.push(name.to_string());
        }
    }

    Ok(DerivedView {
        batch,
        entities: order,
    })
}

/// Select the spatial index and weight columns backing the map layer.
///
/// The index is treated as an opaque cell identifier; how the warehouse
/// maps coordinates to cells is its own capability.
pub fn derive_weighted_cells(raw: &ResultTable, params: &CellParams) -> ViewResult<DerivedView> {
    let as_column_error = |source| ViewError::Column {
        view: params.name.clone(),
        source,
    };
    raw.str_column(&params.index_column).map_err(as_column_error)?;
    raw.numeric_column(&params.weight_column)
        .map_err(as_column_error)?;

    let schema = raw.schema();
    let indices: Vec<usize> = [&params.index_column, &params.weight_column]
        .iter()
        .map(|name| schema.index_of(name).expect("column checked above"))
        .collect();
    let batch = raw
        .batch()
        .project(&indices)
        .map_err(|source| ViewError::Arrow {
            view: params.name.clone(),
            source,
        })?;

    Ok(DerivedView {
        batch,
        entities: Vec::new(),
    })
}

fn str_column<'a>(
    raw: &'a ResultTable,
    params: &ViewParams,
    name: &str,
) -> ViewResult<&'a StringArray> {
    raw.str_column(name).map_err(|source| ViewError::Column {
        view: params.name.clone(),
        source,
    })
}

/// Parse every period cell under the view's granularity. Any failure —
/// including a null cell — is an error for the whole derivation.
fn coerce_periods(raw: &ResultTable, params: &ViewParams) -> ViewResult<Vec<NaiveDate>> {
    let column = raw
        .str_column(&params.period_column)
        .map_err(|source| ViewError::Column {
            view: params.name.clone(),
            source,
        })?;
    let granularity: PeriodGranularity = params.granularity;

    let mut dates = Vec::with_capacity(column.len());
    for row in 0..column.len() {
        if column.is_null(row) {
            return Err(ViewError::BadPeriod {
                view: params.name.clone(),
                value: "NULL".to_string(),
                format: granularity.format_str(),
            });
        }
        let text = column.value(row);
        let date = granularity
            .parse(text)
            .ok_or_else(|| ViewError::BadPeriod {
                view: params.name.clone(),
                value: text.to_string(),
                format: granularity.format_str(),
            })?;
        dates.push(date);
    }
    Ok(dates)
}

fn append_period_column(
    view: &str,
    batch: &RecordBatch,
    dates: &[NaiveDate],
) -> ViewResult<RecordBatch> {
    if batch.column_by_name(PERIOD_COLUMN).is_some() {
        return Err(ViewError::ColumnClash {
            view: view.to_string(),
            column: PERIOD_COLUMN.to_string(),
        });
    }

    let days: Vec<i32> = dates.iter().map(|date| days_since_epoch(*date)).collect();
    let mut fields: Vec<Arc<Field>> = batch.schema().fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(PERIOD_COLUMN, DataType::Date32, false)));
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    columns.push(Arc::new(Date32Array::from(days)));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(|source| {
        ViewError::Arrow {
            view: view.to_string(),
            source,
        }
    })
}
