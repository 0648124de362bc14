//! Visualization layer for the Fareboard dashboard.
//!
//! A [`VizSpec`] or [`MapSpec`] fixes what one widget renders — chart kind,
//! axis bindings, color binding, viewport. The [`binder`] pairs a spec with
//! a derived view (or the empty signal when the backing query has not run)
//! and produces a [`RenderedOutput`] the display surface can draw without
//! touching any cached or derived data.
//!
//! Chart kinds are fixed per spec, never inferred from the data.

pub mod binder;
pub mod chart;
pub mod spec;

pub use binder::{bind_chart, bind_map, RenderedOutput};
pub use chart::{ChartData, MapCell, MapLayer, Series};
pub use spec::{ChartKind, MapSpec, Viewport, VizSpec};
