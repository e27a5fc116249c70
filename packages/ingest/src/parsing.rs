//! Field parsing for municipal open-data extracts.
//!
//! Portal exports disagree on date and currency formats, so every column
//! goes through these helpers before it reaches the scoring engine.

use chrono::{Datelike as _, NaiveDate, NaiveDateTime};

/// Earliest year accepted in a date column.
pub const MIN_YEAR: i32 = 1800;
/// Latest year accepted in a date column.
pub const MAX_YEAR: i32 = 9999;

/// Parses a date column.
///
/// Accepts `YYYY-MM-DD`, ISO 8601 datetimes with or without fractional
/// seconds (the time part is dropped), and US-style `MM/DD/YYYY`. Dates
/// outside [`MIN_YEAR`]..=[`MAX_YEAR`] are rejected.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_any_date(s.trim()).filter(|date| (MIN_YEAR..=MAX_YEAR).contains(&date.year()))
}

fn parse_any_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.date());
        }
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()
}

/// Error returned when a permit valuation cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValuationError {
    /// The raw column text.
    pub raw: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl std::fmt::Display for InvalidValuationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid valuation {:?}: {}", self.raw, self.reason)
    }
}

impl std::error::Error for InvalidValuationError {}

/// Parses a permit valuation in dollars.
///
/// Currency symbols, thousands separators, and surrounding whitespace are
/// ignored. An empty column means no declared valuation and parses as `0`.
///
/// # Errors
///
/// Returns [`InvalidValuationError`] if the text is not a number, is
/// negative, or is not finite.
pub fn parse_valuation(s: &str) -> Result<f64, InvalidValuationError> {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    let error = |reason| InvalidValuationError {
        raw: s.to_string(),
        reason,
    };
    let value: f64 = cleaned.parse().map_err(|_| error("not a number"))?;
    if !value.is_finite() {
        return Err(error("not finite"));
    }
    if value < 0.0 {
        return Err(error("negative"));
    }
    Ok(value)
}

/// Returns `None` for empty or whitespace-only text.
#[must_use]
pub fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_date() {
        assert_eq!(parse_date("2024-01-15"), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn parses_datetime_with_and_without_fraction() {
        assert_eq!(parse_date("2024-01-15T14:30:00.000"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024-01-15T14:30:00"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024-01-15 14:30:00"), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn parses_us_date() {
        assert_eq!(parse_date("03/07/2024"), Some(ymd(2024, 3, 7)));
    }

    #[test]
    fn rejects_invalid_date() {
        assert!(parse_date("not-a-date").is_none());
        assert!(parse_date("2024-02-30").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn rejects_dates_outside_year_range() {
        assert!(parse_date("+262142-12-31").is_none());
        assert!(parse_date("1799-12-31").is_none());
        assert!(parse_date("10000-01-01").is_none());
        assert_eq!(parse_date("1800-01-01"), Some(ymd(1800, 1, 1)));
        assert_eq!(parse_date("9999-12-31"), Some(ymd(9999, 12, 31)));
    }

    #[test]
    fn parses_currency_valuation() {
        assert!((parse_valuation("$150,000.00").unwrap() - 150_000.0).abs() < f64::EPSILON);
        assert!((parse_valuation(" 99999.5 ").unwrap() - 99_999.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_valuation_is_zero() {
        assert!(parse_valuation("").unwrap().abs() < f64::EPSILON);
        assert!(parse_valuation("  ").unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_malformed_valuation() {
        assert_eq!(parse_valuation("TBD").unwrap_err().reason, "not a number");
        assert_eq!(parse_valuation("-2500").unwrap_err().reason, "negative");
        assert_eq!(parse_valuation("inf").unwrap_err().reason, "not finite");
        assert_eq!(parse_valuation("NaN").unwrap_err().reason, "not finite");
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("  P-1 "), Some("P-1".to_string()));
        assert_eq!(non_empty("   "), None);
    }
}
