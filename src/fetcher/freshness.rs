//! Last-Modified parsing and the cache freshness comparison.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Obsolete HTTP date layouts still seen in the wild (RFC 850, asctime).
const LEGACY_FORMATS: &[&str] = &["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Zone names taken to mean UTC when they trail an RFC 1123 style date.
const UTC_ZONES: &[&str] = &["GMT", "UTC", "UT", "Z"];

/// Parse an HTTP date such as `Mon, 01 Jan 2024 00:00:00 GMT`.
///
/// Returns `None` for anything unparseable; callers treat that the same as
/// a missing header.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc2822(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(ts) = parse_named_utc(value) {
        return Some(ts);
    }

    LEGACY_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `<weekday>, <day> <month> <year> <time> <zone>` with a UTC zone name.
/// The weekday is not checked against the date.
fn parse_named_utc(value: &str) -> Option<DateTime<Utc>> {
    let rest = value.split_once(", ").map_or(value, |(_, rest)| rest);
    let (stamp, zone) = rest.rsplit_once(' ')?;
    if !UTC_ZONES.iter().any(|z| z.eq_ignore_ascii_case(zone)) {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp.trim(), "%d %b %Y %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// The cache is fresh when the remote copy is not newer than it.
pub fn is_fresh(remote: DateTime<Utc>, cache: DateTime<Utc>) -> bool {
    remote <= cache
}
