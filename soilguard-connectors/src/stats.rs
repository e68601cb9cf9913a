//! Ingest counters
//!
//! Written by the network loop and the worker with relaxed atomics, read as a
//! point-in-time [`ConnectionStats`] snapshot. Counters only ever increase.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use soilguard_core::RejectReason;

/// Rejections broken down by reason
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    /// pH outside 0-14
    pub invalid_ph: u64,
    /// Moisture outside 0-100
    pub invalid_moisture: u64,
    /// NPK channel above the spike ceiling
    pub sensor_spike: u64,
    /// All NPK channels zero
    pub dead_sensor: u64,
    /// Field present with an unusable type
    pub malformed_field: u64,
}

impl RejectionCounts {
    /// Sum over all reasons
    pub fn total(&self) -> u64 {
        self.invalid_ph + self.invalid_moisture + self.sensor_spike + self.dead_sensor + self.malformed_field
    }
}

/// Connection and processing statistics
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    /// Messages delivered by the broker
    pub messages_received: u64,
    /// Readings written to the store
    pub messages_accepted: u64,
    /// Messages rejected by the validator
    pub rejections: RejectionCounts,
    /// Payloads that did not decode
    pub decode_failures: u64,
    /// Accepted readings the store failed to write
    pub store_failures: u64,
    /// Messages dropped because the worker queue was full
    pub queue_drops: u64,
    /// Connection failures and broker disconnects, each followed by a backoff
    /// wait and a fresh connect attempt. Counts attempts, not successes.
    pub reconnect_attempts: u64,
    /// Whether a broker session is currently up
    pub connected: bool,
    /// Last connection or store error
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct IngestCounters {
    received: AtomicU64,
    accepted: AtomicU64,
    invalid_ph: AtomicU64,
    invalid_moisture: AtomicU64,
    sensor_spike: AtomicU64,
    dead_sensor: AtomicU64,
    malformed_field: AtomicU64,
    decode_failures: AtomicU64,
    store_failures: AtomicU64,
    queue_drops: AtomicU64,
    reconnect_attempts: AtomicU64,
    connected: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl IngestCounters {
    pub(crate) fn received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn rejected(&self, reason: &RejectReason) {
        let counter = match reason {
            RejectReason::InvalidPh { .. } => &self.invalid_ph,
            RejectReason::InvalidMoisture { .. } => &self.invalid_moisture,
            RejectReason::SensorSpike { .. } => &self.sensor_spike,
            RejectReason::DeadSensor => &self.dead_sensor,
            RejectReason::MalformedField { .. } => &self.malformed_field,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decode_failed(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn store_failed(&self, error: String) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
        self.set_last_error(error);
    }

    pub(crate) fn queue_dropped(&self) {
        self.queue_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reconnecting(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub(crate) fn set_last_error(&self, error: String) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(error);
        }
    }

    pub(crate) fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            messages_received: self.received.load(Ordering::Relaxed),
            messages_accepted: self.accepted.load(Ordering::Relaxed),
            rejections: RejectionCounts {
                invalid_ph: self.invalid_ph.load(Ordering::Relaxed),
                invalid_moisture: self.invalid_moisture.load(Ordering::Relaxed),
                sensor_spike: self.sensor_spike.load(Ordering::Relaxed),
                dead_sensor: self.dead_sensor.load(Ordering::Relaxed),
                malformed_field: self.malformed_field.load(Ordering::Relaxed),
            },
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            queue_drops: self.queue_drops.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            connected: self.connected.load(Ordering::Relaxed),
            last_error: self.last_error.lock().ok().and_then(|e| e.clone()),
        }
    }
}
