//! Time management for the ingestion pipeline
//!
//! Readings are stamped at ingestion, never with a clock value sent by the
//! node. The clock is injected so validation stays a pure function in tests.

use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Source of time for the pipeline
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time
    fn is_wall_clock(&self) -> bool;
}

/// Wall clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Create a clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to `timestamp`
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward by `ms`
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Render a timestamp as RFC 3339 with millisecond precision
///
/// Returns `None` for values chrono cannot represent.
pub fn to_rfc3339(timestamp: Timestamp) -> Option<String> {
    let millis = i64::try_from(timestamp).ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse an RFC 3339 string back into a timestamp
///
/// Instants before the epoch are rejected.
pub fn from_rfc3339(text: &str) -> Option<Timestamp> {
    let parsed = DateTime::parse_from_rfc3339(text).ok()?;
    u64::try_from(parsed.timestamp_millis()).ok()
}

/// Serde adapter storing [`Timestamp`] as an RFC 3339 string
pub mod rfc3339 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    /// Serialize a timestamp
    pub fn serialize<S: Serializer>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        match super::to_rfc3339(*value) {
            Some(text) => serializer.serialize_str(&text),
            None => Err(serde::ser::Error::custom("timestamp out of range")),
        }
    }

    /// Deserialize a timestamp
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::from_rfc3339(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid RFC 3339 timestamp '{}'", text)))
    }
}
