//! Dashboard state: page selection, query dispatch, view binding, export.

use std::sync::Arc;

use arrow::array::{Array, TimestampNanosecondArray};
use chrono::{DateTime, NaiveDate};

use fareboard_core::view::PERIOD_COLUMN;
use fareboard_core::{
    derive_full_series, derive_top_series, derive_weighted_cells, export, CellParams,
    PeriodGranularity, SessionCache, ViewError, ViewParams,
};
use fareboard_viz::binder::{bind_chart, bind_map, RenderedOutput};
use fareboard_viz::spec::{ChartKind, MapSpec, Viewport, VizSpec};
use fareboard_warehouse::queries::{self, slots};
use fareboard_warehouse::{QueryDefinition, QueryExecutor, Warehouse};

/// Spatial resolution for the pickup density page.
const MAP_RESOLUTION: u8 = 8;

/// KPI metrics in cycling order, paired with the column that ranks the
/// top-3 companies for that metric. Derived metrics rank by total sales so
/// the legend holds steady while cycling.
const KPI_METRICS: &[(&str, &str)] = &[
    ("trip_count", "trip_count"),
    ("monthly_sales", "monthly_sales"),
    ("avg_sales_per_customer", "monthly_sales"),
    ("avg_miles", "monthly_sales"),
    ("avg_seconds", "monthly_sales"),
];

/// Dashboard pages in Tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Dataset row count and time span.
    Overview,
    /// Monthly KPI line chart, top-3 companies.
    MonthlyKpi,
    /// Yearly indicator: tips ratio bars or payment-type areas.
    YearIndicator,
    /// Pickup density map.
    Map,
}

impl Page {
    fn next(self) -> Self {
        match self {
            Self::Overview => Self::MonthlyKpi,
            Self::MonthlyKpi => Self::YearIndicator,
            Self::YearIndicator => Self::Map,
            Self::Map => Self::Overview,
        }
    }

    /// Title shown in the header.
    pub fn title(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::MonthlyKpi => "Monthly KPI",
            Self::YearIndicator => "Year Indicator",
            Self::Map => "Pickup Density",
        }
    }
}

/// Mutable dashboard state driven by the event loop.
pub struct App {
    /// Session-scoped result cache; survives page switches, dies with the app.
    pub cache: SessionCache,
    executor: QueryExecutor,
    /// Current page.
    pub page: Page,
    /// Index into [`KPI_METRICS`].
    pub kpi_idx: usize,
    /// 0 = tips ratio, 1 = payment types.
    pub indicator_idx: usize,
    /// One-line status shown under the header.
    pub status: String,
    /// True while a query runs; drawn before the blocking call.
    pub busy: bool,
    /// Set by the q/Esc keys.
    pub should_quit: bool,
    /// Show the current page's SQL instead of its chart.
    pub show_sql: bool,
    /// Path of the most recent CSV export, if any.
    pub last_export: Option<String>,
}

impl App {
    /// App over a warehouse collaborator with an empty session cache.
    #[must_use]
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self {
            cache: SessionCache::new(),
            executor: QueryExecutor::new(warehouse),
            page: Page::Overview,
            kpi_idx: 0,
            indicator_idx: 0,
            status: "Press r to run the current page's query".into(),
            busy: false,
            should_quit: false,
            show_sql: false,
            last_export: None,
        }
    }

    /// Advance to the next page.
    pub fn next_page(&mut self) {
        self.page = self.page.next();
        self.show_sql = false;
    }

    /// Cycle the KPI metric on the monthly page.
    pub fn next_kpi(&mut self) {
        self.kpi_idx = (self.kpi_idx + 1) % KPI_METRICS.len();
    }

    /// Toggle between the two yearly indicators.
    pub fn next_indicator(&mut self) {
        self.indicator_idx = (self.indicator_idx + 1) % 2;
    }

    /// Metric column the monthly page currently plots.
    #[must_use]
    pub fn kpi_metric(&self) -> &'static str {
        KPI_METRICS[self.kpi_idx].0
    }

    fn kpi_ranking(&self) -> &'static str {
        KPI_METRICS[self.kpi_idx].1
    }

    /// The query definition backing the current page.
    #[must_use]
    pub fn current_query(&self) -> QueryDefinition {
        match self.page {
            Page::Overview => queries::dataset_overview(),
            Page::MonthlyKpi => queries::monthly_kpi(),
            Page::YearIndicator => {
                if self.indicator_idx == 0 {
                    queries::tips_ratio()
                } else {
                    queries::payment_types()
                }
            }
            Page::Map => queries::pickup_density(MAP_RESOLUTION),
        }
    }

    /// Run the current page's query and store the result in its slot.
    ///
    /// Failure leaves the slot as it was; the error lands in the status line.
    pub fn run_current_query(&mut self) {
        let def = self.current_query();
        match self.executor.run_into(&def, &self.cache) {
            Ok(table) => {
                self.status = format!(
                    "{}: {} rows cached in '{}'",
                    def.name,
                    table.num_rows(),
                    def.slot
                );
            }
            Err(e) => {
                tracing::warn!(query = %def.name, error = %e, "query failed");
                self.status = format!("{} failed: {e}", def.name);
            }
        }
        self.busy = false;
    }

    /// Derive and bind the current page's visualization from the cache.
    ///
    /// `None` on the overview page, which renders text. An empty slot comes
    /// back as a prompt, not an error.
    pub fn current_output(&self) -> Option<Result<RenderedOutput, ViewError>> {
        match self.page {
            Page::Overview => None,
            Page::MonthlyKpi => Some(self.monthly_output()),
            Page::YearIndicator => Some(self.indicator_output()),
            Page::Map => Some(self.map_output()),
        }
    }

    fn monthly_output(&self) -> Result<RenderedOutput, ViewError> {
        let metric = self.kpi_metric();
        let spec = VizSpec::new(
            ChartKind::Line,
            PERIOD_COLUMN,
            metric,
            "company",
            format!("{metric} by Top3 Companies"),
        );
        let Some(table) = self.cache.get(slots::MONTHLY_KPI) else {
            return bind_chart(None, &spec);
        };
        let params = ViewParams::top_series(
            metric,
            "company",
            metric,
            self.kpi_ranking(),
            "month",
            PeriodGranularity::Monthly,
        )
        .with_window(ranking_window_start());
        let view = derive_top_series(&table, &params)?;
        bind_chart(Some(&view), &spec)
    }

    fn indicator_output(&self) -> Result<RenderedOutput, ViewError> {
        if self.indicator_idx == 0 {
            let spec = VizSpec::new(
                ChartKind::GroupedBar,
                PERIOD_COLUMN,
                "tips_ratio",
                "company",
                "tips_ratio by Top3 Companies",
            );
            let Some(table) = self.cache.get(slots::YEAR_TIPS) else {
                return bind_chart(None, &spec);
            };
            let params = ViewParams::top_series(
                "tips_ratio",
                "company",
                "tips_ratio",
                "tips_ratio",
                "year",
                PeriodGranularity::Yearly,
            );
            let view = derive_top_series(&table, &params)?;
            bind_chart(Some(&view), &spec)
        } else {
            let spec = VizSpec::new(
                ChartKind::StackedArea,
                PERIOD_COLUMN,
                "payment_count",
                "payment_type",
                "payment types per year",
            );
            let Some(table) = self.cache.get(slots::YEAR_PAYMENTS) else {
                return bind_chart(None, &spec);
            };
            let params = ViewParams::top_series(
                "payment_types",
                "payment_type",
                "payment_count",
                "payment_count",
                "year",
                PeriodGranularity::Yearly,
            );
            let view = derive_full_series(&table, &params)?;
            bind_chart(Some(&view), &spec)
        }
    }

    fn map_output(&self) -> Result<RenderedOutput, ViewError> {
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
        let Some(table) = self.cache.get(slots::PICKUP_DENSITY) else {
            return bind_map(None, &spec);
        };
        let params = CellParams {
            name: "pickup_density".into(),
            index_column: "cell".into(),
            weight_column: "trip_count".into(),
        };
        let view = derive_weighted_cells(&table, &params)?;
        bind_map(Some(&view), &spec)
    }

    /// Text lines for the overview page.
    #[must_use]
    pub fn overview_lines(&self) -> Vec<String> {
        let Some(table) = self.cache.get(slots::OVERVIEW) else {
            return vec!["No data yet. Press r to load the dataset overview.".into()];
        };
        let mut lines = Vec::new();
        if let Ok(counts) = table.numeric_column("trip_count") {
            if let Some(count) = counts.first() {
                lines.push(format!("Trips: {count:.0}"));
            }
        }
        for (label, column) in [("First trip", "first_trip"), ("Last trip", "last_trip")] {
            if let Some(value) = timestamp_cell(table.batch(), column) {
                lines.push(format!("{label}: {value}"));
            }
        }
        if lines.is_empty() {
            lines.push("Overview result has an unexpected shape.".into());
        }
        lines
    }

    /// Export the current page's cached result as CSV next to the binary.
    pub fn export_current(&mut self) {
        let def = self.current_query();
        let Some(table) = self.cache.get(&def.slot) else {
            self.status = format!("Nothing to export: slot '{}' is empty", def.slot);
            return;
        };
        let path = format!("{}.csv", def.slot);
        let result = export::to_csv(table.batch())
            .map_err(|e| e.to_string())
            .and_then(|csv| std::fs::write(&path, csv).map_err(|e| e.to_string()));
        match result {
            Ok(()) => {
                tracing::info!(path = %path, rows = table.num_rows(), "exported csv");
                self.status = format!("Exported {} rows to {path}", table.num_rows());
                self.last_export = Some(path);
            }
            Err(e) => self.status = format!("Export failed: {e}"),
        }
    }
}

/// The monthly top-3 ranking only counts recent activity.
fn ranking_window_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 1).expect("valid window start")
}

/// First value of a nanosecond-timestamp column, formatted for display.
fn timestamp_cell(batch: &arrow::record_batch::RecordBatch, name: &str) -> Option<String> {
    let column = batch.column_by_name(name)?;
    let array = column.as_any().downcast_ref::<TimestampNanosecondArray>()?;
    if array.is_empty() || array.is_null(0) {
        return None;
    }
    let ts = DateTime::from_timestamp_nanos(array.value(0));
    Some(ts.format("%Y-%m-%d %H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;

    use fareboard_warehouse::{WarehouseError, WarehouseResponse};

    struct StubWarehouse;

    impl Warehouse for StubWarehouse {
        fn execute(
            &self,
            _sql: &str,
            _destination: Option<&str>,
        ) -> Result<WarehouseResponse, WarehouseError> {
            let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)]));
            let batch = RecordBatch::try_new(
                Arc::clone(&schema),
                vec![Arc::new(Int64Array::from(vec![1_i64]))],
            )
            .unwrap();
            Ok(WarehouseResponse {
                schema,
                batches: vec![batch],
            })
        }
    }

    fn app() -> App {
        App::new(Arc::new(StubWarehouse))
    }

    #[test]
    fn test_pages_cycle() {
        let mut app = app();
        assert_eq!(app.page, Page::Overview);
        for _ in 0..4 {
            app.next_page();
        }
        assert_eq!(app.page, Page::Overview);
    }

    #[test]
    fn test_kpi_metrics_cycle() {
        let mut app = app();
        let first = app.kpi_metric();
        for _ in 0..KPI_METRICS.len() {
            app.next_kpi();
        }
        assert_eq!(app.kpi_metric(), first);
    }

    #[test]
    fn test_queries_match_pages() {
        let mut app = app();
        assert_eq!(app.current_query().name, "dataset_overview");
        app.next_page();
        assert_eq!(app.current_query().name, "monthly_kpi");
        app.next_page();
        assert_eq!(app.current_query().name, "tips_ratio");
        app.next_indicator();
        assert_eq!(app.current_query().name, "payment_types");
        app.next_page();
        assert_eq!(app.current_query().name, "pickup_density");
    }

    #[test]
    fn test_empty_slots_render_prompts() {
        let mut app = app();
        assert!(app.current_output().is_none());
        app.next_page();
        assert!(app.current_output().unwrap().unwrap().is_prompt());
        app.next_page();
        assert!(app.current_output().unwrap().unwrap().is_prompt());
        app.next_page();
        assert!(app.current_output().unwrap().unwrap().is_prompt());
    }

    #[test]
    fn test_export_without_data_sets_status() {
        let mut app = app();
        app.next_page();
        app.export_current();
        assert!(app.status.contains("Nothing to export"));
        assert!(app.last_export.is_none());
    }
}
