// crates/import-profile-core/src/core/time.rs
// ============================================================================
// Module: Import Profile Time Model
// Description: Canonical timestamps for profile modification tracking.
// Purpose: Keep wall-clock reads out of the core and render RFC 3339 on the wire.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Timestamps are unix milliseconds internally and RFC 3339 (UTC) on the
//! wire. The core never reads wall-clock time directly; handlers receive a
//! [`crate::interfaces::Clock`] supplied by the host.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Nanoseconds per millisecond.
const NANOS_PER_MILLI: i128 = 1_000_000;

/// Point in time with millisecond precision.
///
/// # Invariants
/// - Values are supplied by callers or a [`crate::interfaces::Clock`].
/// - Ordering follows the underlying unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Builds a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp one millisecond later, saturating at the maximum.
    #[must_use]
    pub const fn next_millisecond(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Parses an RFC 3339 timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] when the text is not valid RFC 3339 or falls
    /// outside the representable range.
    pub fn parse_rfc3339(value: &str) -> Result<Self, TimestampError> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339)
            .map_err(|err| TimestampError(err.to_string()))?;
        let millis = parsed.unix_timestamp_nanos() / NANOS_PER_MILLI;
        i64::try_from(millis)
            .map(Self)
            .map_err(|_| TimestampError("timestamp out of range".to_string()))
    }

    /// Formats the timestamp as RFC 3339 in UTC.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] when the value cannot be represented as a
    /// calendar date.
    pub fn to_rfc3339(self) -> Result<String, TimestampError> {
        let nanos = i128::from(self.0) * NANOS_PER_MILLI;
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|err| TimestampError(err.to_string()))?;
        datetime.format(&Rfc3339).map_err(|err| TimestampError(err.to_string()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{}ms", self.0),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_rfc3339().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse_rfc3339(&text).map_err(D::Error::custom)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp parsing or formatting failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp: {0}")]
pub struct TimestampError(String);

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::Timestamp;

    #[test]
    fn rfc3339_round_trip_keeps_millis() {
        let stamp = Timestamp::from_unix_millis(1_437_696_000_123);
        let text = stamp.to_rfc3339().unwrap();
        assert_eq!(text, "2015-07-24T00:00:00.123Z");
        assert_eq!(Timestamp::parse_rfc3339(&text).unwrap(), stamp);
    }

    #[test]
    fn parse_rejects_non_rfc3339() {
        assert!(Timestamp::parse_rfc3339("24.07.2015").is_err());
    }

    #[test]
    fn next_millisecond_saturates() {
        let max = Timestamp::from_unix_millis(i64::MAX);
        assert_eq!(max.next_millisecond(), max);
    }
}
