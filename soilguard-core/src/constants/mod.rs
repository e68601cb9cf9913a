//! Constants for SoilGuard Core
//!
//! Centralized numeric values used by the decoder and validators. Every value
//! carries its unit in the name and a note on where it comes from.
//!
//! ## Organization
//!
//! - **Soil**: Physical bounds of soil measurements (pH scale, volumetric water)
//! - **Sensors**: Wire-level defaults and calibration defaults for field nodes

/// Physical bounds of soil measurements.
pub mod soil;

/// Field-node defaults and calibration parameters.
pub mod sensors;

pub use soil::{PH_MIN, PH_MAX, MOISTURE_MIN_PCT, MOISTURE_MAX_PCT};

pub use sensors::{
    DEFAULT_NODE_ID, DEFAULT_PH, DEFAULT_MOISTURE_PCT, DEFAULT_TEMPERATURE_C,
    DEFAULT_EC, DEFAULT_RAW_NPK, DEFAULT_RAW_SCALE, DEFAULT_SPIKE_CEILING,
    PAYLOAD_PREVIEW_BYTES,
};
