//! The dashboard's query catalog.
//!
//! One definition per page action, each with a fixed destination table and
//! cache slot. The heavy lifting — dense frame construction, zero-fill,
//! ratio arithmetic, geospatial binning — happens warehouse-side; the
//! results arrive ready for derivation.
//!
//! The dense-frame queries cross-join the observed period list with the
//! entity list and left-join the aggregates back, coalescing unmatched
//! combinations to zero, so downstream derivations can assume completeness.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};

use crate::executor::QueryDefinition;

/// Name of the trip fact table in the warehouse.
pub const TRIPS_TABLE: &str = "taxi_trips";

/// Well-known cache slot names, one per page action.
pub mod slots {
    /// Monthly KPI dense frame.
    pub const MONTHLY_KPI: &str = "monthly_kpi";
    /// Yearly tips-ratio dense frame.
    pub const YEAR_TIPS: &str = "year_tips";
    /// Yearly payment-type counts.
    pub const YEAR_PAYMENTS: &str = "year_payments";
    /// Pickup density cells.
    pub const PICKUP_DENSITY: &str = "pickup_density";
    /// Dataset overview.
    pub const OVERVIEW: &str = "overview";
}

/// Schema of the trip fact table.
///
/// Mirrors the public Chicago taxi-trip dataset columns this dashboard
/// touches.
#[must_use]
pub fn trips_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("company", DataType::Utf8, true),
        Field::new(
            "trip_start_timestamp",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            true,
        ),
        Field::new("trip_total", DataType::Float64, true),
        Field::new("trip_miles", DataType::Float64, true),
        Field::new("trip_seconds", DataType::Float64, true),
        Field::new("fare", DataType::Float64, true),
        Field::new("tips", DataType::Float64, true),
        Field::new("payment_type", DataType::Utf8, true),
        Field::new("pickup_latitude", DataType::Float64, true),
        Field::new("pickup_longitude", DataType::Float64, true),
    ]))
}

const MONTHLY_KPI_SQL: &str = "\
WITH months AS (
    SELECT DISTINCT to_char(trip_start_timestamp, '%Y-%m') AS month
    FROM taxi_trips
    WHERE trip_start_timestamp >= '2013-01-01'
      AND trip_start_timestamp < '2024-01-01'
),
companies AS (
    SELECT DISTINCT company
    FROM taxi_trips
    WHERE company IS NOT NULL
),
frame AS (
    SELECT companies.company, months.month
    FROM companies
    CROSS JOIN months
),
monthly_kpi AS (
    SELECT
        company,
        to_char(trip_start_timestamp, '%Y-%m') AS month,
        sum(trip_total) AS monthly_sales,
        count(trip_total) AS trip_count,
        avg(trip_total) AS avg_sales_per_customer,
        avg(trip_miles) AS avg_miles,
        avg(trip_seconds) AS avg_seconds
    FROM taxi_trips
    WHERE company IS NOT NULL
      AND trip_start_timestamp >= '2013-01-01'
      AND trip_start_timestamp < '2024-01-01'
    GROUP BY company, to_char(trip_start_timestamp, '%Y-%m')
)
SELECT
    company,
    month,
    coalesce(monthly_sales, 0.0) AS monthly_sales,
    coalesce(trip_count, 0) AS trip_count,
    coalesce(avg_sales_per_customer, 0.0) AS avg_sales_per_customer,
    coalesce(avg_miles, 0.0) AS avg_miles,
    coalesce(avg_seconds, 0.0) AS avg_seconds
FROM frame
LEFT JOIN monthly_kpi USING (company, month)
ORDER BY company, month";

const TIPS_RATIO_SQL: &str = "\
WITH years AS (
    SELECT DISTINCT to_char(trip_start_timestamp, '%Y') AS \"year\"
    FROM taxi_trips
    WHERE trip_start_timestamp >= '2019-01-01'
      AND trip_start_timestamp < '2024-01-01'
),
companies AS (
    SELECT DISTINCT company
    FROM taxi_trips
    WHERE company IS NOT NULL
),
frame AS (
    SELECT companies.company, years.\"year\"
    FROM companies
    CROSS JOIN years
),
year_indicator AS (
    SELECT
        company,
        to_char(trip_start_timestamp, '%Y') AS \"year\",
        100.0 * sum(CASE WHEN tips > 0 THEN 1.0 ELSE 0.0 END)
              / nullif(sum(CASE WHEN fare > 0 THEN 1.0 ELSE 0.0 END), 0.0)
            AS tips_ratio
    FROM taxi_trips
    WHERE company IS NOT NULL
      AND trip_start_timestamp >= '2019-01-01'
      AND trip_start_timestamp < '2024-01-01'
    GROUP BY company, to_char(trip_start_timestamp, '%Y')
)
SELECT company, \"year\", coalesce(tips_ratio, 0.0) AS tips_ratio
FROM frame
LEFT JOIN year_indicator USING (company, \"year\")
ORDER BY company, \"year\"";

const PAYMENT_TYPES_SQL: &str = "\
WITH years AS (
    SELECT DISTINCT to_char(trip_start_timestamp, '%Y') AS \"year\"
    FROM taxi_trips
    WHERE trip_start_timestamp >= '2019-01-01'
      AND trip_start_timestamp < '2024-01-01'
),
payment_types AS (
    SELECT DISTINCT payment_type
    FROM taxi_trips
    WHERE payment_type IS NOT NULL
),
frame AS (
    SELECT payment_types.payment_type, years.\"year\"
    FROM payment_types
    CROSS JOIN years
),
year_indicator AS (
    SELECT
        payment_type,
        to_char(trip_start_timestamp, '%Y') AS \"year\",
        count(payment_type) AS payment_count
    FROM taxi_trips
    WHERE payment_type IS NOT NULL
      AND trip_start_timestamp >= '2019-01-01'
      AND trip_start_timestamp < '2024-01-01'
    GROUP BY payment_type, to_char(trip_start_timestamp, '%Y')
)
SELECT \"year\", payment_type, coalesce(payment_count, 0) AS payment_count
FROM frame
LEFT JOIN year_indicator USING (payment_type, \"year\")
ORDER BY \"year\", payment_type";

const OVERVIEW_SQL: &str = "\
SELECT
    count(*) AS trip_count,
    min(trip_start_timestamp) AS first_trip,
    max(trip_start_timestamp) AS last_trip
FROM taxi_trips";

/// Month × company KPI dense frame (sales, trip count, averages).
#[must_use]
pub fn monthly_kpi() -> QueryDefinition {
    QueryDefinition::new("monthly_kpi", MONTHLY_KPI_SQL, slots::MONTHLY_KPI)
        .with_destination("dest_monthly_kpi")
}

/// Year × company tips-ratio dense frame. The percentage arrives computed;
/// no local arithmetic follows.
#[must_use]
pub fn tips_ratio() -> QueryDefinition {
    QueryDefinition::new("tips_ratio", TIPS_RATIO_SQL, slots::YEAR_TIPS)
        .with_destination("dest_year_tips")
}

/// Year × payment-type counts.
#[must_use]
pub fn payment_types() -> QueryDefinition {
    QueryDefinition::new("payment_types", PAYMENT_TYPES_SQL, slots::YEAR_PAYMENTS)
        .with_destination("dest_year_payments")
}

/// Pickup density per spatial cell at the given resolution.
///
/// `cell_index` is a warehouse-side capability; the cell identifier is
/// opaque to everything downstream of the query.
#[must_use]
pub fn pickup_density(resolution: u8) -> QueryDefinition {
    let sql = format!(
        "\
SELECT
    cell_index(pickup_latitude, pickup_longitude, {resolution}) AS cell,
    count(*) AS trip_count,
    avg(fare) AS avg_fare
FROM taxi_trips
WHERE pickup_latitude IS NOT NULL
  AND pickup_longitude IS NOT NULL
GROUP BY cell_index(pickup_latitude, pickup_longitude, {resolution})
ORDER BY trip_count DESC"
    );
    QueryDefinition::new("pickup_density", sql, slots::PICKUP_DENSITY)
        .with_destination("dest_pickup_density")
}

/// Row count and time span of the whole dataset.
#[must_use]
pub fn dataset_overview() -> QueryDefinition {
    QueryDefinition::new("dataset_overview", OVERVIEW_SQL, slots::OVERVIEW)
}
