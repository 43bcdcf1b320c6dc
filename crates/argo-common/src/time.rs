//! Time handling for ARGO files.
//!
//! ARGO carries two encodings: JULD, a floating-point day count since
//! 1950-01-01T00:00:00Z, and 14-character `YYYYMMDDHHMISS` date strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Unix timestamp of the JULD reference date 1950-01-01T00:00:00Z.
const JULD_EPOCH_UNIX_SECS: i64 = -631_152_000;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Plausible JULD range (1977..2086); values outside are treated as garbage.
pub const JULD_MIN_DAYS: f64 = 10_000.0;
pub const JULD_MAX_DAYS: f64 = 50_000.0;

/// Convert a JULD day count to a UTC timestamp rounded to whole seconds.
///
/// Returns `None` for non-finite values and values outside
/// [`JULD_MIN_DAYS`]..=[`JULD_MAX_DAYS`].
pub fn juld_to_datetime(days: f64) -> Option<DateTime<Utc>> {
    if !days.is_finite() || !(JULD_MIN_DAYS..=JULD_MAX_DAYS).contains(&days) {
        return None;
    }
    let offset = (days * SECONDS_PER_DAY).round() as i64;
    DateTime::from_timestamp(JULD_EPOCH_UNIX_SECS + offset, 0)
}

/// Inverse of [`juld_to_datetime`].
pub fn datetime_to_juld(time: DateTime<Utc>) -> f64 {
    (time.timestamp() - JULD_EPOCH_UNIX_SECS) as f64 / SECONDS_PER_DAY
}

/// Parse an ARGO `YYYYMMDDHHMISS` string. An 8-character `YYYYMMDD`
/// date is accepted as midnight. Blank strings yield `None`.
pub fn parse_argo_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    match s.len() {
        14 => NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S")
            .ok()
            .map(|ndt| Utc.from_utc_datetime(&ndt)),
        8 => NaiveDate::parse_from_str(s, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|ndt| Utc.from_utc_datetime(&ndt)),
        _ => None,
    }
}

/// Format a timestamp as an ARGO date string.
pub fn format_argo_date(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d%H%M%S").to_string()
}
