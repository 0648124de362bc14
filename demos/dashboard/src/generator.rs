//! Deterministic synthetic trip data for the embedded warehouse.
//!
//! Seeds the `taxi_trips` table so the dashboard runs with no external
//! services. The same seed always produces the same dataset.

use std::sync::Arc;

use arrow::array::{Float64Array, StringArray, TimestampNanosecondArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fareboard_warehouse::queries::trips_schema;

/// Companies in rough descending market share; the generator biases trips
/// toward the front of the list so the top-3 views have a clear shape.
pub const COMPANIES: &[&str] = &[
    "Flash Cab",
    "Taxi Affiliation Services",
    "Sun Taxi",
    "City Service",
    "Globe Taxi",
    "Medallion Leasing",
];

/// Payment types in the dataset.
pub const PAYMENT_TYPES: &[&str] = &["Cash", "Credit Card", "Mobile", "Prcard", "Unknown"];

/// Chicago loop, where pickups cluster.
const CENTER_LAT: f64 = 41.8379;
const CENTER_LNG: f64 = -87.6828;

/// Seeded trip generator.
pub struct TripGenerator {
    rng: StdRng,
}

impl TripGenerator {
    /// Generator with a fixed seed; identical seeds yield identical data.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One batch covering every month from January 2019 through December
    /// 2023 with `trips_per_month` trips each.
    #[must_use]
    pub fn batch(&mut self, trips_per_month: usize) -> RecordBatch {
        let mut company = Vec::new();
        let mut start_ts = Vec::new();
        let mut trip_total = Vec::new();
        let mut trip_miles = Vec::new();
        let mut trip_seconds = Vec::new();
        let mut fare_col = Vec::new();
        let mut tips_col = Vec::new();
        let mut payment = Vec::new();
        let mut lat = Vec::new();
        let mut lng = Vec::new();

        for year in 2019..=2023 {
            for month in 1..=12 {
                for _ in 0..trips_per_month {
                    company.push(self.pick_biased(COMPANIES));
                    start_ts.push(self.trip_timestamp(year, month));

                    let fare = 5.0 + self.rng.gen::<f64>() * 55.0;
                    let tips = if self.rng.gen_bool(0.35) { fare * 0.2 } else { 0.0 };
                    let miles = 1.0 + self.rng.gen::<f64>() * 19.0;
                    fare_col.push(fare);
                    tips_col.push(tips);
                    trip_total.push(fare + tips);
                    trip_miles.push(miles);
                    trip_seconds.push(miles * 180.0 + self.rng.gen::<f64>() * 300.0);

                    payment.push(PAYMENT_TYPES[self.rng.gen_range(0..PAYMENT_TYPES.len())]);

                    // A few trips come without coordinates, like the real feed.
                    if self.rng.gen_bool(0.05) {
                        lat.push(None);
                        lng.push(None);
                    } else {
                        lat.push(Some(CENTER_LAT + self.jitter(0.25)));
                        lng.push(Some(CENTER_LNG + self.jitter(0.35)));
                    }
                }
            }
        }

        RecordBatch::try_new(
            trips_schema(),
            vec![
                Arc::new(StringArray::from(company)),
                Arc::new(TimestampNanosecondArray::from(start_ts)),
                Arc::new(Float64Array::from(trip_total)),
                Arc::new(Float64Array::from(trip_miles)),
                Arc::new(Float64Array::from(trip_seconds)),
                Arc::new(Float64Array::from(fare_col)),
                Arc::new(Float64Array::from(tips_col)),
                Arc::new(StringArray::from(payment)),
                Arc::new(Float64Array::from(lat)),
                Arc::new(Float64Array::from(lng)),
            ],
        )
        .expect("generator arrays match trips schema")
    }

    /// Pick with a triangular bias toward the front of the list.
    fn pick_biased(&mut self, choices: &'static [&'static str]) -> &'static str {
        let a = self.rng.gen_range(0..choices.len());
        let b = self.rng.gen_range(0..choices.len());
        choices[a.min(b)]
    }

    fn trip_timestamp(&mut self, year: i32, month: u32) -> i64 {
        let day = self.rng.gen_range(1..=28);
        let hour = self.rng.gen_range(0..24);
        let minute = self.rng.gen_range(0..60);
        NaiveDate::from_ymd_opt(year, month, day)
            .expect("valid generated date")
            .and_hms_opt(hour, minute, 0)
            .expect("valid generated time")
            .and_utc()
            .timestamp_nanos_opt()
            .expect("in-range timestamp")
    }

    fn jitter(&mut self, spread: f64) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * 2.0 * spread
    }
}
