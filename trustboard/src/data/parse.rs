//! Lenient value parsing for provider payloads and CSV files
//!
//! Raw inputs are coerced rather than rejected: a value that cannot be read
//! becomes `None` and is treated as missing downstream.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Integers below this are unix seconds, at or above it unix milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a timestamp written in any of the formats the pipeline meets.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` with or without a UTC offset
/// (naive values are taken as UTC), and bare unix integers in seconds or
/// milliseconds. Returns `None` for anything else.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(n) = text.parse::<i64>() {
        return from_unix(n);
    }
    if let Ok(f) = text.parse::<f64>() {
        return if f.is_finite() { from_unix(f as i64) } else { None };
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Parse a number, treating empty text, `NaN` and infinities as missing.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer count; whole floats such as `12.0` are accepted.
pub fn parse_count(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        parse_number(text)
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// Convert unix seconds or milliseconds to a UTC timestamp.
pub fn from_unix(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() < MILLIS_THRESHOLD {
        DateTime::from_timestamp(value, 0)
    } else {
        DateTime::from_timestamp_millis(value)
    }
}
