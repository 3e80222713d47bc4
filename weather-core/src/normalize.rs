//! Normalization rules shared by every provider adapter.
//!
//! Canonical units: degrees Fahrenheit, miles per hour, hectopascals,
//! miles of visibility, inches of precipitation (inches per hour for
//! intensity), fractions on 0–1 and Unix epoch seconds in UTC.

use chrono::DateTime;

const MM_PER_INCH: f64 = 25.4;
const METERS_PER_MILE: f64 = 1609.344;

/// Converts a 0–100 percentage into a 0–1 fraction.
pub fn percent_to_fraction(percent: f64) -> f64 {
    clamp_fraction(percent / 100.0)
}

/// Keeps a value that is already a 0–1 fraction on that scale.
pub fn fraction(value: f64) -> f64 {
    clamp_fraction(value)
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Parses an RFC 3339 timestamp into epoch seconds. Unparseable or empty
/// input yields 0 ("unknown").
pub fn rfc3339_to_epoch(raw: &str) -> f64 {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.timestamp() as f64)
        .unwrap_or(0.0)
}

/// Copies a string only when present; absent stays empty.
pub fn text(value: Option<&str>) -> String {
    value.map(str::to_owned).unwrap_or_default()
}

pub(crate) fn is_zero_f64(value: &f64) -> bool {
    *value == 0.0
}

pub(crate) fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}
