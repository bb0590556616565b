//! # Temporal Types: UTC-Only Timestamps
//!
//! `Timestamp` is the only time type carried on subscriptions and change
//! events. It is always UTC and truncated to whole seconds, so a start date
//! that round-trips through a client with millisecond noise still compares
//! equal to the stored value and is not reported as an edit.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SubflowError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an RFC 3339 string in any offset.
/// - [`Timestamp::from_date()`]: midnight UTC of a calendar date.
///
/// Deserialization goes through [`Timestamp::from_utc`], so values read from
/// JSON or YAML are truncated like every other construction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "DateTime<Utc>")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string, converting any offset to UTC.
    pub fn parse(s: &str) -> Result<Self, SubflowError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| SubflowError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Midnight UTC on the given calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, SubflowError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| SubflowError::InvalidTimestamp(format!("epoch seconds {secs}")))?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_now_has_no_subseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(123_456_789).unwrap());
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:30:45Z");
    }

    #[test]
    fn test_parse_converts_offset() {
        let ts = Timestamp::parse("2026-01-15T17:00:00+05:00").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_parse_subseconds_truncated() {
        let a = Timestamp::parse("2026-01-15T12:00:00.987Z").unwrap();
        let b = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(Timestamp::parse("not-a-date").is_err());
        assert!(Timestamp::parse("2026-01-15").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn test_from_date_is_midnight() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(Timestamp::from_date(date).to_iso8601(), "2026-03-01T00:00:00Z");
    }

    #[test]
    fn test_ordering() {
        let earlier = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let later = Timestamp::parse("2026-01-15T12:00:01Z").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_serde_roundtrip() {
        let ts = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }

    #[test]
    fn test_deserialize_truncates_subseconds() {
        let noisy: Timestamp = serde_json::from_str("\"2026-03-01T00:00:00.250Z\"").unwrap();
        assert_eq!(noisy, Timestamp::parse("2026-03-01T00:00:00Z").unwrap());
        assert_eq!(noisy.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_deserialize_converts_offset() {
        let ts: Timestamp = serde_json::from_str("\"2026-01-15T17:00:00.5+05:00\"").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:00:00Z");
    }

    proptest! {
        #[test]
        fn deserialized_timestamps_have_no_subseconds(
            secs in 0i64..4_102_444_800,
            millis in 0u32..1000,
        ) {
            let dt = DateTime::from_timestamp(secs, millis * 1_000_000).unwrap();
            let json = serde_json::to_string(&dt).unwrap();
            let ts: Timestamp = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(ts.as_datetime().nanosecond(), 0);
            prop_assert_eq!(ts.epoch_secs(), secs);
        }

        #[test]
        fn epoch_roundtrip(secs in 0i64..4_102_444_800) {
            let ts = Timestamp::from_epoch_secs(secs).unwrap();
            prop_assert_eq!(ts.epoch_secs(), secs);
        }
    }
}
