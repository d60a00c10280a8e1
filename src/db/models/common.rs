//! Timestamp handling shared across models.
//!
//! Every timestamp is written as UTC RFC 3339 with millisecond precision
//! (`2025-03-04T09:00:00.000Z`). The fixed width keeps SQLite's text
//! comparison consistent with chronological order, which the overlap query
//! relies on.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

/// Naive layouts accepted from clients and interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Render a timestamp in the canonical storage format
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the canonical storage format
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse a client-supplied timestamp.
///
/// Accepts RFC 3339 with any offset, or a naive date-time (as sent by a
/// `datetime-local` input) which is taken to be UTC. The result is truncated
/// to the millisecond precision that gets stored.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let parsed = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(|naive| naive.and_utc()),
    };
    parsed.map(|dt| dt.trunc_subsecs(3))
}
