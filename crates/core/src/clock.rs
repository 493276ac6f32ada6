//! Timestamp helpers shared by every storage backend.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current time, truncated to microseconds.
///
/// Both backends persist timestamps as text; truncating here keeps a value
/// identical after a round trip through either of them.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Formats a timestamp the way it is persisted (RFC 3339, UTC, `Z` suffix).
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses a persisted timestamp. Accepts any RFC 3339 offset.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
