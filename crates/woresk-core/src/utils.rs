//! Timestamp helpers shared by the poller and the alerts view
//!
//! Activity timestamps are compared as strings. That ordering matches time
//! order only because the backend emits every timestamp in one ISO-8601
//! format and timezone.

use chrono::{DateTime, SecondsFormat, Utc};

/// Stand-in for "never acknowledged"
pub const MIN_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

/// Current time in the `toISOString` shape (`2024-01-02T03:04:05.678Z`)
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Format a UTC instant with millisecond precision and a `Z` suffix
#[must_use]
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whether `timestamp` is strictly newer than `last_seen`
#[must_use]
pub fn is_newer(timestamp: &str, last_seen: &str) -> bool {
    timestamp > last_seen
}

/// Count of timestamps strictly newer than `last_seen`
pub fn count_newer<'a, I>(timestamps: I, last_seen: &str) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    timestamps
        .into_iter()
        .filter(|ts| is_newer(ts, last_seen))
        .count()
}

/// Greatest timestamp in the set, if any
pub fn newest<'a, I>(timestamps: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    timestamps.into_iter().max()
}

/// The later of two timestamps
#[must_use]
pub fn later_of<'a>(a: &'a str, b: &'a str) -> &'a str {
    if is_newer(b, a) { b } else { a }
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS` in UTC
///
/// Unparseable input is returned unchanged.
#[must_use]
pub fn display_timestamp(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp).map_or_else(
        |_| timestamp.to_string(),
        |dt| {
            dt.with_timezone(&Utc)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}
