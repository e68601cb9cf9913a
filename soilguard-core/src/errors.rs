//! Error Types for Decode and Validation Failures
//!
//! ## Design Philosophy
//!
//! Failures on the ingestion path are local to one message. None of them is
//! fatal, and all of them end up in a log line that an operator reads when a
//! field node misbehaves. The types here are shaped for that:
//!
//! 1. **Copy Semantics**: `RejectReason` is `Copy` and carries only numbers and
//!    `&'static str`, so it can be counted, logged and compared cheaply.
//!
//! 2. **Distinct Reasons**: each rejection names exactly one cause, so a
//!    calibration problem (`SensorSpike` after a wrong `raw_scale`) can be told
//!    apart from hardware failure (`DeadSensor`).
//!
//! 3. **Stable Codes**: `code()` returns a snake_case identifier suitable for
//!    metric labels and log filters.
//!
//! ## Error Categories
//!
//! ### Decode
//! - `NotUtf8`: payload bytes are not text
//! - `Malformed`: text is not JSON
//! - `NotAnObject`: JSON, but not a key/value object
//!
//! ### Validation
//! - `InvalidPh`, `InvalidMoisture`: outside the physical scale
//! - `SensorSpike`: a calibrated NPK channel above the configured ceiling
//! - `DeadSensor`: all three calibrated NPK channels read exactly zero
//! - `MalformedField`: a field is present but cannot be read as its type
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use soilguard_core::{RejectReason, SoilValidator, Validator, ValidationContext};
//! use soilguard_core::decode::decode;
//!
//! let raw = decode(br#"{"ph": 15.2, "nitrogen": 800}"#).unwrap();
//! let validator = SoilValidator::default();
//!
//! match validator.validate(&raw, &ValidationContext::at(0)) {
//!     Ok(_reading) => {}
//!     Err(RejectReason::InvalidPh { .. }) => {
//!         // Probe out of solution or uncalibrated
//!     }
//!     Err(RejectReason::SensorSpike { .. }) => {
//!         // Check raw_scale before blaming the probe
//!     }
//!     Err(other) => {
//!         // Log and drop
//!         let _ = other.code();
//!     }
//! }
//! ```

use thiserror_no_std::Error;

use crate::reading::NpkChannel;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, RejectReason>;

/// Reason a decoded message was not accepted as a reading
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// pH outside [0, 14]
    #[error("pH {value} outside [0, 14]")]
    InvalidPh {
        /// The reported pH
        value: f64,
    },

    /// Moisture outside [0, 100] percent
    #[error("Moisture {value}% outside [0, 100]")]
    InvalidMoisture {
        /// The reported moisture percentage
        value: f64,
    },

    /// Calibrated NPK channel above the spike ceiling
    #[error("Sensor spike: {channel} = {value} exceeds ceiling {ceiling}")]
    SensorSpike {
        /// First channel found over the ceiling
        channel: NpkChannel,
        /// Calibrated value on that channel
        value: i64,
        /// Configured ceiling
        ceiling: i64,
    },

    /// All three calibrated NPK channels are zero
    #[error("Dead sensor: nitrogen, phosphorus and potassium all read zero")]
    DeadSensor,

    /// A present field could not be read as its expected type
    #[error("Malformed field '{field}'")]
    MalformedField {
        /// Wire name of the offending field
        field: &'static str,
    },
}

impl RejectReason {
    /// Stable identifier for log filters and counters
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPh { .. } => "invalid_ph",
            Self::InvalidMoisture { .. } => "invalid_moisture",
            Self::SensorSpike { .. } => "sensor_spike",
            Self::DeadSensor => "dead_sensor",
            Self::MalformedField { .. } => "malformed_field",
        }
    }
}

/// Payload could not be turned into a key/value message
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Bytes are not valid UTF-8
    #[error("Payload is not valid UTF-8 (invalid byte at offset {valid_up_to})")]
    NotUtf8 {
        /// Length of the valid prefix
        valid_up_to: usize,
    },

    /// Text is not well-formed JSON
    #[error("Payload is not valid JSON: {reason} (line {line}, column {column})")]
    Malformed {
        /// Parser message
        reason: String,
        /// Line of the first error
        line: usize,
        /// Column of the first error
        column: usize,
    },

    /// JSON value is not an object
    #[error("Payload is JSON {found}, expected an object")]
    NotAnObject {
        /// Kind of JSON value that was found
        found: &'static str,
    },
}

/// Failure anywhere on the decode -> validate path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Payload was rejected by the decoder
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Message was rejected by the validator
    #[error("Rejected: {0}")]
    Rejected(#[from] RejectReason),
}
