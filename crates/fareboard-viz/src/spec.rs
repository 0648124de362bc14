//! Visualization specifications.
//!
//! Serde-serializable so a display surface can persist or pass them through
//! to an embedding layer together with its theme.

use serde::{Deserialize, Serialize};

/// Chart family of one widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    /// Multi-series line chart over a temporal x-axis.
    Line,
    /// Grouped bar chart, one bar group per period.
    GroupedBar,
    /// Stacked area chart over time.
    StackedArea,
}

/// Binding of a derived view onto one chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizSpec {
    /// Chart family; fixed, never inferred.
    pub kind: ChartKind,
    /// Temporal x-axis column (the coerced `Date32` period column).
    pub x: String,
    /// Numeric y-axis column.
    pub y: String,
    /// Categorical column bound to the color channel; one series per value.
    pub color: String,
    /// Widget title.
    pub title: String,
    /// Render height in display rows.
    pub height: u16,
}

impl VizSpec {
    /// Spec with the given kind and bindings at the default height.
    #[must_use]
    pub fn new(
        kind: ChartKind,
        x: impl Into<String>,
        y: impl Into<String>,
        color: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            x: x.into(),
            y: y.into(),
            color: color.into(),
            title: title.into(),
            height: 20,
        }
    }

    /// Override the render height.
    #[must_use]
    pub fn with_height(mut self, height: u16) -> Self {
        self.height = height;
        self
    }
}

/// Map camera: center coordinate and zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Center latitude.
    pub latitude: f64,
    /// Center longitude.
    pub longitude: f64,
    /// Zoom level.
    pub zoom: u8,
}

/// Binding of a weighted-cell view onto the geospatial layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSpec {
    /// Opaque spatial index column.
    pub index_column: String,
    /// Numeric weight column.
    pub weight_column: String,
    /// Initial camera position.
    pub viewport: Viewport,
    /// Widget title.
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_serde_round_trip() {
        let spec = VizSpec::new(
            ChartKind::Line,
            "period",
            "monthly_sales",
            "company",
            "monthly_sales by Top3 Companies",
        )
        .with_height(32);
        let json = serde_json::to_string(&spec).unwrap();
        let back: VizSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, ChartKind::Line);
        assert_eq!(back.height, 32);
        assert_eq!(back.color, "company");
    }

    #[test]
    fn test_map_spec_serde_round_trip() {
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
        let json = serde_json::to_string(&spec).unwrap();
        let back: MapSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.viewport, spec.viewport);
    }
}
