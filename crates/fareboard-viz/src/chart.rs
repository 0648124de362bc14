//! Render-ready artifacts produced by the binder.

use crate::spec::{ChartKind, Viewport};

/// One colored series: points sorted by x.
///
/// X values are days since the Unix epoch (the `Date32` representation) as
/// `f64`, which is what plotting surfaces want for axis math.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Color-channel value (entity name).
    pub name: String,
    /// `(x, y)` points sorted by x ascending.
    pub points: Vec<(f64, f64)>,
}

/// A chart ready for the display surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    /// Chart family from the [`ChartKind`] binding.
    pub kind: ChartKind,
    /// Widget title from the originating [`crate::spec::VizSpec`].
    pub title: String,
    /// Render height in display rows.
    pub height: u16,
    /// Y-axis label (the metric column name).
    pub y_label: String,
    /// Series in legend order.
    pub series: Vec<Series>,
}

impl ChartData {
    /// Bounds of all x values, or `None` for an all-empty chart.
    #[must_use]
    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))
    }

    /// Bounds of all y values, or `None` for an all-empty chart.
    #[must_use]
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.series.iter().flat_map(|s| s.points.iter().map(|p| p.1)))
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any = false;
    for v in values {
        any = true;
        min = min.min(v);
        max = max.max(v);
    }
    any.then_some((min, max))
}

/// One weighted spatial cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MapCell {
    /// Opaque cell identifier minted by the warehouse.
    pub cell: String,
    /// Numeric weight (e.g. trip count).
    pub weight: f64,
}

/// A geospatial layer ready for the display surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayer {
    /// Widget title from the originating [`crate::spec::MapSpec`].
    pub title: String,
    /// Camera position for the display surface.
    pub viewport: Viewport,
    /// Weighted cells, heaviest first.
    pub cells: Vec<MapCell>,
}

impl MapLayer {
    /// Largest weight in the layer, or `0.0` when empty.
    #[must_use]
    pub fn max_weight(&self) -> f64 {
        self.cells.iter().map(|c| c.weight).fold(0.0, f64::max)
    }
}
