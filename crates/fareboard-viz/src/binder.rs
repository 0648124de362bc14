//! Binds a derived view (or the empty signal) to a spec.
//!
//! The binder reads, never writes: it produces a fresh artifact and leaves
//! cached and derived data untouched. When the backing slot is empty it
//! emits a user-facing prompt instead of an empty chart.

use std::collections::HashMap;

use arrow::array::Array;
use fareboard_core::{DerivedView, ResultTable, ViewError};

use crate::chart::{ChartData, MapCell, MapLayer, Series};
use crate::spec::{MapSpec, VizSpec};

/// What the display surface receives.
#[derive(Debug, Clone)]
pub enum RenderedOutput {
    /// A chart to draw.
    Chart(ChartData),
    /// A geospatial layer to draw.
    Map(MapLayer),
    /// Instruction to run the prerequisite query; drawn as text.
    Prompt(String),
}

impl RenderedOutput {
    /// Returns `true` for the "run the query first" instruction.
    #[must_use]
    pub const fn is_prompt(&self) -> bool {
        matches!(self, Self::Prompt(_))
    }
}

/// Bind a derived view to a chart spec.
///
/// `None` means the backing query has not run this session; the output is a
/// prompt naming the widget. Column errors identify the widget by title.
pub fn bind_chart(
    view: Option<&DerivedView>,
    spec: &VizSpec,
) -> Result<RenderedOutput, ViewError> {
    let Some(view) = view else {
        return Ok(RenderedOutput::Prompt(run_first(&spec.title)));
    };

    let table = reopen(view, &spec.title)?;
    let as_column_error = |source| ViewError::Column {
        view: spec.title.clone(),
        source,
    };
    let x = table.date_column(&spec.x).map_err(as_column_error)?;
    let y = table.numeric_column(&spec.y).map_err(as_column_error)?;
    let color = table.str_column(&spec.color).map_err(as_column_error)?;

    let mut points_by_name: HashMap<&str, Vec<(f64, f64)>> = HashMap::new();
    let mut appearance: Vec<&str> = Vec::new();
    for row in 0..table.num_rows() {
        if color.is_null(row) || x.is_null(row) {
            continue;
        }
        let name = color.value(row);
        if !points_by_name.contains_key(name) {
            appearance.push(name);
        }
        points_by_name
            .entry(name)
            .or_default()
            .push((f64::from(x.value(row)), y[row]));
    }

    // Legend order follows the derivation's ranking when it has one.
    let order: Vec<&str> = if view.entities().is_empty() {
        appearance
    } else {
        view.entities().iter().map(String::as_str).collect()
    };

    let mut series = Vec::with_capacity(order.len());
    for name in order {
        let Some(mut points) = points_by_name.remove(name) else {
            continue;
        };
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        series.push(Series {
            name: name.to_string(),
            points,
        });
    }

    Ok(RenderedOutput::Chart(ChartData {
        kind: spec.kind,
        title: spec.title.clone(),
        height: spec.height,
        y_label: spec.y.clone(),
        series,
    }))
}

/// Bind a weighted-cell view to the geospatial layer spec.
pub fn bind_map(view: Option<&DerivedView>, spec: &MapSpec) -> Result<RenderedOutput, ViewError> {
    let Some(view) = view else {
        return Ok(RenderedOutput::Prompt(run_first(&spec.title)));
    };

    let table = reopen(view, &spec.title)?;
    let as_column_error = |source| ViewError::Column {
        view: spec.title.clone(),
        source,
    };
    let index = table.str_column(&spec.index_column).map_err(as_column_error)?;
    let weight = table
        .numeric_column(&spec.weight_column)
        .map_err(as_column_error)?;

    let mut cells = Vec::with_capacity(table.num_rows());
    for row in 0..table.num_rows() {
        if index.is_null(row) {
            continue;
        }
        cells.push(MapCell {
            cell: index.value(row).to_string(),
            weight: weight[row],
        });
    }
    cells.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    Ok(RenderedOutput::Map(MapLayer {
        title: spec.title.clone(),
        viewport: spec.viewport,
        cells,
    }))
}

fn run_first(title: &str) -> String {
    format!("No data for '{title}' yet. Run the query first.")
}

/// Re-wrap the derived batch for name-based typed access.
fn reopen(view: &DerivedView, title: &str) -> Result<ResultTable, ViewError> {
    ResultTable::from_batch(view.batch().clone()).map_err(|source| ViewError::Column {
        view: title.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;

    use fareboard_core::view::PERIOD_COLUMN;
    use fareboard_core::{
        derive_top_series, derive_weighted_cells, CellParams, PeriodGranularity, ViewParams,
    };

    use crate::spec::{ChartKind, Viewport};

    fn derived_view() -> DerivedView {
        let schema = Arc::new(Schema::new(vec![
            Field::new("company", DataType::Utf8, false),
            Field::new("month", DataType::Utf8, false),
            Field::new("sales", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![
                    "Beta", "Beta", "Alpha", "Alpha",
                ])),
                Arc::new(StringArray::from(vec![
                    "2021-02", "2021-01", "2021-02", "2021-01",
                ])),
                Arc::new(Float64Array::from(vec![5.0, 4.0, 9.0, 8.0])),
            ],
        )
        .unwrap();
        let table = fareboard_core::ResultTable::from_batch(batch).unwrap();
        let params = ViewParams::top_series(
            "sales",
            "company",
            "sales",
            "sales",
            "month",
            PeriodGranularity::Monthly,
        );
        derive_top_series(&table, &params).unwrap()
    }

    fn line_spec() -> VizSpec {
        VizSpec::new(ChartKind::Line, PERIOD_COLUMN, "sales", "company", "sales chart")
    }

    #[test]
    fn test_empty_slot_renders_prompt() {
        let out = bind_chart(None, &line_spec()).unwrap();
        match out {
            RenderedOutput::Prompt(msg) => {
                assert!(msg.contains("sales chart"));
                assert!(msg.contains("Run the query"));
            }
            other => panic!("expected prompt, got {other:?}"),
        }
    }

    #[test]
    fn test_chart_groups_by_color_in_rank_order() {
        let view = derived_view();
        let out = bind_chart(Some(&view), &line_spec()).unwrap();
        let RenderedOutput::Chart(chart) = out else {
            panic!("expected chart");
        };
        assert_eq!(chart.kind, ChartKind::Line);
        // Alpha outranks Beta (17 vs 9), so it leads the legend.
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "Alpha");
        assert_eq!(chart.series[1].name, "Beta");
        // Points come out sorted by x even though input was reversed.
        for series in &chart.series {
            assert!(series.points[0].0 < series.points[1].0);
        }
        assert_eq!(chart.series[0].points[0].1, 8.0);
    }

    #[test]
    fn test_missing_metric_column_is_view_error() {
        let view = derived_view();
        let mut spec = line_spec();
        spec.y = "revenue".into();
        let err = bind_chart(Some(&view), &spec).unwrap_err();
        assert!(matches!(err, ViewError::Column { ref view, .. } if view == "sales chart"));
    }

    #[test]
    fn test_map_binding_sorts_by_weight() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("cell", DataType::Utf8, false),
            Field::new("trip_count", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["8:1:1", "8:2:2", "8:3:3"])),
                Arc::new(Float64Array::from(vec![3.0, 42.0, 7.0])),
            ],
        )
        .unwrap();
        let table = fareboard_core::ResultTable::from_batch(batch).unwrap();
        let params = CellParams {
            name: "density".into(),
            index_column: "cell".into(),
            weight_column: "trip_count".into(),
        };
        let view = derive_weighted_cells(&table, &params).unwrap();

        let spec = MapSpec {
            index_column: "cell".into(),
            weight_column: "trip_count".into(),
            viewport: Viewport {
                latitude: 41.8379,
                longitude: -87.6828,
                zoom: 10,
            },
            title: "pickup density".into(),
        };
        let RenderedOutput::Map(layer) = bind_map(Some(&view), &spec).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(layer.cells[0].cell, "8:2:2");
        assert_eq!(layer.max_weight(), 42.0);
        assert_eq!(layer.viewport.zoom, 10);

        assert!(bind_map(None, &spec).unwrap().is_prompt());
    }
}
