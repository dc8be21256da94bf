//! Date-time shape checks.
//!
//! Accepted shapes:
//! - `YYYY-MM-DDTHH:MM`
//! - `YYYY-MM-DDTHH:MM:SS` with optional fractional seconds
//! - any of the above followed by `Z` or a `±HH:MM` offset

use chrono::{DateTime, NaiveDateTime};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Whether `value` is a well-formed ISO-8601 date-time.
pub fn is_datetime(value: &str) -> bool {
    let value = value.trim();
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return true;
    }
    let naive = value.strip_suffix('Z').unwrap_or(value);
    if NAIVE_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(naive, fmt).is_ok())
    {
        return true;
    }
    // Minute precision with an explicit offset: 2025-11-05T12:12+00:00.
    split_offset(value)
        .is_some_and(|(local, _)| NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M").is_ok())
}

/// Whether the value already names its timezone (`Z` or `±HH:MM`).
pub fn has_zone(value: &str) -> bool {
    value.ends_with('Z') || split_offset(value).is_some()
}

fn split_offset(value: &str) -> Option<(&str, &str)> {
    // Offsets live after the time separator; skip the date's dashes.
    let t = value.find('T')?;
    let idx = value[t..].rfind(['+', '-'])? + t;
    let (local, offset) = value.split_at(idx);
    let digits = &offset[1..];
    let ok = digits.len() == 5
        && digits.as_bytes()[2] == b':'
        && digits.chars().filter(|c| *c != ':').all(|c| c.is_ascii_digit());
    ok.then_some((local, offset))
}
