//! Timestamp formatting and parsing for the on-disk formats.
//!
//! What this module provides:
//! - [`format_bar_ts`] / [`parse_bar_ts`]: dataset row timestamps, written as
//!   `YYYY-MM-DD HH:MM:SS±HHMM` so the exchange offset survives a round trip.
//! - [`minute_stamp`] / [`parse_minute_stamp`]: dominance sample timestamps
//!   (`YYYY-MM-DD HH:MM`, UTC, minute precision).
//! - [`as_of_date`]: the UTC calendar date an option snapshot belongs to.
//!
//! Examples
//! - `2024-05-01T00:00:00-04:00` -> `"2024-05-01 00:00:00-0400"`
//! - `2024-05-01T13:37:59Z` -> `"2024-05-01 13:37"`

use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

/// Dataset timestamp format.
pub const BAR_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Dominance sample format.
pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Render a row timestamp, keeping its UTC offset.
pub fn format_bar_ts(ts: &DateTime<FixedOffset>) -> String {
    ts.format(BAR_TS_FORMAT).to_string()
}

/// Parse a row timestamp.
///
/// Accepts both `-0400` and `-04:00` offsets; hand-edited files and other
/// tools tend to write the latter.
pub fn parse_bar_ts(s: &str) -> anyhow::Result<DateTime<FixedOffset>> {
    let s = s.trim();
    DateTime::parse_from_str(s, BAR_TS_FORMAT)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z"))
        .with_context(|| format!("bad row timestamp: {s:?}"))
}

/// Truncate to the minute and render as `YYYY-MM-DD HH:MM`.
pub fn minute_stamp(ts: &DateTime<Utc>) -> String {
    ts.format(MINUTE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD HH:MM` stamp as UTC.
pub fn parse_minute_stamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), MINUTE_FORMAT)
        .with_context(|| format!("bad minute stamp: {s:?}"))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// The UTC calendar date an option snapshot taken at `now` belongs to.
pub fn as_of_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}
