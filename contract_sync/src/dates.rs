//! Date round-trip helpers for the TEXT date columns.
//!
//! All date columns store ISO-8601 calendar dates ("2025-07-07"), which sort
//! lexicographically in the same order as chronologically, so range filters
//! can compare the raw column values.

use chrono::NaiveDate;

use crate::errors::{MappingError, Result};

/// Format a date for storage.
pub fn to_db(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Parse a stored date column value.
pub fn from_db(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| MappingError::BadStoredDate {
        raw: raw.to_string(),
    })
}

/// Signed calendar-day distance `to - from`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();
        assert_eq!(to_db(d), "2025-07-07");
        assert_eq!(from_db("2025-07-07").unwrap(), d);
    }

    #[test]
    fn bad_value_is_an_error() {
        assert!(from_db("07/07/2025").is_err());
    }

    #[test]
    fn days_between_is_signed() {
        let a = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        assert_eq!(days_between(a, b), 7);
        assert_eq!(days_between(b, a), -7);
    }
}
