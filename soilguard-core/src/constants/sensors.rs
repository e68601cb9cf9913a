//! Field Node Defaults and Calibration Parameters
//!
//! Defaults applied when a field node omits a value from its payload, plus the
//! calibration defaults used when the hosting process supplies none.

// ===== WIRE DEFAULTS =====

/// Node identifier used when the payload carries none.
pub const DEFAULT_NODE_ID: &str = "unknown";

/// pH assumed when the probe value is missing. Neutral.
pub const DEFAULT_PH: f64 = 7.0;

/// Moisture (%) assumed when missing.
pub const DEFAULT_MOISTURE_PCT: f64 = 0.0;

/// Soil temperature (°C) assumed when missing.
pub const DEFAULT_TEMPERATURE_C: f64 = 0.0;

/// Electrical conductivity assumed when missing.
pub const DEFAULT_EC: f64 = 0.0;

/// Raw NPK count assumed for a missing channel.
///
/// A payload missing all three channels therefore lands on the dead-sensor
/// guard rather than being stored as a zero-nutrient sample.
pub const DEFAULT_RAW_NPK: i64 = 0;

// ===== CALIBRATION =====

/// Multiplier from raw NPK counts to mg/kg when none is configured.
///
/// Deployed RS485 NPK probes usually need 0.1 (raw 800 -> 80 mg/kg).
pub const DEFAULT_RAW_SCALE: f64 = 1.0;

/// Highest plausible post-calibration NPK value (mg/kg).
///
/// Real soils rarely exceed a few hundred mg/kg on any channel; values above
/// this are electrical spikes or a probe answering with garbage registers.
pub const DEFAULT_SPIKE_CEILING: i64 = 1000;

// ===== DIAGNOSTICS =====

/// Bytes of an undecodable payload copied into the warning log.
pub const PAYLOAD_PREVIEW_BYTES: usize = 128;
