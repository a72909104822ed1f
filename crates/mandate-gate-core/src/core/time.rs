// crates/mandate-gate-core/src/core/time.rs
// ============================================================================
// Module: Mandate Gate Time Model
// Description: Canonical second-precision timestamps for mandates and jobs.
// Purpose: Provide deterministic, replayable time values across mandate records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Mandate Gate embeds explicit time values in signatures, expirations, and
//! job records. The core engine never reads wall-clock time directly; hosts
//! supply [`Timestamp`] values at every entry point so validation and replay
//! stay deterministic. Timestamps are truncated to whole seconds because the
//! signing message format carries RFC 3339 at second precision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as DeError;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp parsing and construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TimeError {
    /// Value could not be parsed as RFC 3339.
    #[error("invalid rfc 3339 timestamp: {0}")]
    Parse(String),
    /// Value is outside the representable range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical UTC timestamp at second precision.
///
/// # Invariants
/// - Sub-second components are always zero.
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Creates a timestamp from a datetime, truncating to whole seconds.
    #[must_use]
    pub fn from_datetime(value: OffsetDateTime) -> Self {
        let utc = value.to_offset(time::UtcOffset::UTC);
        Self(utc.replace_nanosecond(0).unwrap_or(utc))
    }

    /// Creates a timestamp from unix seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] when the value cannot be represented.
    pub fn from_unix_seconds(seconds: i64) -> Result<Self, TimeError> {
        OffsetDateTime::from_unix_timestamp(seconds)
            .map(Self)
            .map_err(|err| TimeError::OutOfRange(err.to_string()))
    }

    /// Returns the timestamp as unix seconds.
    #[must_use]
    pub const fn unix_seconds(self) -> i64 {
        self.0.unix_timestamp()
    }

    /// Parses an RFC 3339 timestamp, truncating to whole seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Parse`] when the input is not valid RFC 3339.
    pub fn parse_rfc3339(value: &str) -> Result<Self, TimeError> {
        OffsetDateTime::parse(value, &Rfc3339)
            .map(Self::from_datetime)
            .map_err(|err| TimeError::Parse(err.to_string()))
    }

    /// Returns the timestamp shifted forward by whole seconds, when representable.
    #[must_use]
    pub fn checked_add_seconds(self, seconds: i64) -> Option<Self> {
        self.0.checked_add(Duration::seconds(seconds)).map(Self)
    }

    /// Returns the number of whole seconds from `earlier` to `self`.
    #[must_use]
    pub fn seconds_since(self, earlier: Self) -> i64 {
        (self.0 - earlier.0).whole_seconds()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;
        f.write_str(&formatted)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_rfc3339(&raw).map_err(DeError::custom)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use super::*;

    #[test]
    fn timestamps_truncate_to_seconds() {
        let base = OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_123_456_789).unwrap();
        let ts = Timestamp::from_datetime(base);
        assert_eq!(ts.unix_seconds(), 1_700_000_000);
        assert!(!ts.to_string().contains('.'));
    }

    #[test]
    fn rfc3339_round_trip() {
        let ts = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let rendered = ts.to_string();
        let parsed = Timestamp::parse_rfc3339(&rendered).unwrap();
        assert_eq!(ts, parsed);
    }

    #[test]
    fn serde_uses_rfc3339_strings() {
        let ts = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.starts_with('"'));
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn ordering_follows_instants() {
        let earlier = Timestamp::from_unix_seconds(100).unwrap();
        let later = earlier.checked_add_seconds(60).unwrap();
        assert!(earlier < later);
        assert_eq!(later.seconds_since(earlier), 60);
    }
}
