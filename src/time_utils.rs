// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and conversion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `YYYYMMDD` stamp used in export filenames.
pub fn compact_date(date: NaiveDateTime) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parse a Strava timestamp (`2024-06-01T08:00:00Z`).
pub fn parse_strava_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a user-supplied date bound: RFC3339, or `YYYY-MM-DD` as midnight UTC.
pub fn parse_date_arg(raw: &str) -> Option<DateTime<Utc>> {
    parse_strava_timestamp(raw).or_else(|| {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    })
}

/// Convert a chrono UTC timestamp into the `time` crate's representation.
pub fn to_offset_datetime(date: DateTime<Utc>) -> Option<time::OffsetDateTime> {
    let nanos = i128::from(date.timestamp()) * 1_000_000_000
        + i128::from(date.timestamp_subsec_nanos());
    time::OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}

/// `start` shifted by a fractional number of seconds.
pub fn offset_by_seconds(
    start: time::OffsetDateTime,
    seconds: f64,
) -> Option<time::OffsetDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    let offset = time::Duration::checked_seconds_f64(seconds)?;
    start.checked_add(offset)
}
