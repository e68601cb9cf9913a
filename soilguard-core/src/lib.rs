//! Core ingestion engine for SoilGuard
//!
//! Turns raw broker payloads from soil nodes into calibrated, plausibility
//! checked readings. Everything here is synchronous and free of I/O; the
//! connector crate drives it from the network and the store crate persists
//! what it accepts.
//!
//! Key constraints:
//! - One bad message never affects the next one
//! - Validation is deterministic for a given payload, calibration and clock
//! - Each dropped message produces exactly one warning
//!
//! ```no_run
//! use soilguard_core::{CalibrationConfig, IngestPipeline};
//!
//! let pipeline = IngestPipeline::new(CalibrationConfig::default().raw_scale(0.1));
//!
//! match pipeline.process(br#"{"node_id":"node01","nitrogen":800,"ph":6.5}"#) {
//!     Ok(reading) => {}, // Persist it
//!     Err(e) => {},      // Already logged, drop it
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

pub mod calibration;
pub mod constants;
pub mod decode;
pub mod errors;
pub mod pipeline;
pub mod reading;
pub mod time;
pub mod traits;
pub mod validators;

// Public API
pub use calibration::{CalibrationConfig, CalibrationError};
pub use decode::{Decoder, RawMessage};
pub use errors::{DecodeError, PipelineError, RejectReason, ValidationResult};
pub use pipeline::{IngestPipeline, SharedClock};
pub use reading::{Npk, NpkChannel, Reading, ReadingParts};
pub use time::{FixedTime, SystemClock, TimeSource, Timestamp};
pub use traits::{Validatable, ValidationContext, Validator};
pub use validators::SoilValidator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
