//! Period coercion: textual period columns to comparable dates.
//!
//! Each view fixes one format string — `%Y-%m` for monthly views, `%Y` for
//! yearly views. Parsing is strict about the canonical zero-padded form so
//! that formatting a coerced value reproduces the original text exactly.

use chrono::NaiveDate;

/// Fixed period format of one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodGranularity {
    /// `"2021-01"` — first day of the month.
    Monthly,
    /// `"2021"` — first day of the year.
    Yearly,
}

impl PeriodGranularity {
    /// The chrono format string for this granularity.
    #[must_use]
    pub const fn format_str(&self) -> &'static str {
        match self {
            Self::Monthly => "%Y-%m",
            Self::Yearly => "%Y",
        }
    }

    /// Parse a canonical period string into the date of its first day.
    ///
    /// Returns `None` for anything that would not round-trip through
    /// [`format`](Self::format), including non-zero-padded input.
    #[must_use]
    pub fn parse(&self, value: &str) -> Option<NaiveDate> {
        let date = match self {
            Self::Monthly => {
                if value.len() != 7 {
                    return None;
                }
                NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok()?
            }
            Self::Yearly => {
                if value.len() != 4 {
                    return None;
                }
                NaiveDate::parse_from_str(&format!("{value}-01-01"), "%Y-%m-%d").ok()?
            }
        };
        Some(date)
    }

    /// Format a coerced date back into its period string.
    #[must_use]
    pub fn format(&self, date: NaiveDate) -> String {
        date.format(self.format_str()).to_string()
    }
}

/// Days since the Unix epoch, the `Date32` representation of `date`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch");
    date.signed_duration_since(epoch).num_days() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_round_trip() {
        let g = PeriodGranularity::Monthly;
        for text in ["2013-01", "2021-12", "1999-06"] {
            let date = g.parse(text).unwrap();
            assert_eq!(g.format(date), text);
        }
    }

    #[test]
    fn test_yearly_round_trip() {
        let g = PeriodGranularity::Yearly;
        for text in ["2019", "2023"] {
            let date = g.parse(text).unwrap();
            assert_eq!(g.format(date), text);
        }
    }

    #[test]
    fn test_monthly_parses_to_first_day() {
        let date = PeriodGranularity::Monthly.parse("2021-03").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
    }

    #[test]
    fn test_malformed_periods_rejected() {
        let monthly = PeriodGranularity::Monthly;
        assert!(monthly.parse("2021-1").is_none()); // not zero-padded
        assert!(monthly.parse("2021-13").is_none());
        assert!(monthly.parse("2021").is_none());
        assert!(monthly.parse("garbage").is_none());

        let yearly = PeriodGranularity::Yearly;
        assert!(yearly.parse("21").is_none());
        assert!(yearly.parse("2021-01").is_none());
    }

    #[test]
    fn test_days_since_epoch() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(days_since_epoch(epoch), 0);
        let next = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(days_since_epoch(next), 1);
    }
}
