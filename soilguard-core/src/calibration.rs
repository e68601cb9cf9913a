//! Calibration configuration
//!
//! The raw-count multiplier and the spike ceiling are deployment data, not
//! code. Recalibrating a field of probes means restarting ingestion with a new
//! [`CalibrationConfig`], never rebuilding.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::constants::{DEFAULT_RAW_SCALE, DEFAULT_SPIKE_CEILING};

/// Invalid calibration values
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CalibrationError {
    /// Scale is zero, negative, NaN or infinite
    #[error("raw_scale must be a positive finite number, got {0}")]
    InvalidScale(f64),

    /// Ceiling is negative
    #[error("spike_ceiling must not be negative, got {0}")]
    InvalidCeiling(i64),
}

/// Read-only calibration parameters for one deployment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Multiplier from raw NPK counts to mg/kg
    #[serde(default = "default_raw_scale")]
    pub raw_scale: f64,

    /// Highest plausible calibrated NPK value
    #[serde(default = "default_spike_ceiling")]
    pub spike_ceiling: i64,
}

const fn default_raw_scale() -> f64 {
    DEFAULT_RAW_SCALE
}

const fn default_spike_ceiling() -> i64 {
    DEFAULT_SPIKE_CEILING
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            raw_scale: DEFAULT_RAW_SCALE,
            spike_ceiling: DEFAULT_SPIKE_CEILING,
        }
    }
}

impl CalibrationConfig {
    /// Create a configuration, checking both values
    pub fn new(raw_scale: f64, spike_ceiling: i64) -> Result<Self, CalibrationError> {
        let config = Self { raw_scale, spike_ceiling };
        config.validate()?;
        Ok(config)
    }

    /// Set the raw multiplier
    pub fn raw_scale(mut self, raw_scale: f64) -> Self {
        self.raw_scale = raw_scale;
        self
    }

    /// Set the spike ceiling
    pub fn spike_ceiling(mut self, spike_ceiling: i64) -> Self {
        self.spike_ceiling = spike_ceiling;
        self
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !self.raw_scale.is_finite() || self.raw_scale <= 0.0 {
            return Err(CalibrationError::InvalidScale(self.raw_scale));
        }
        if self.spike_ceiling < 0 {
            return Err(CalibrationError::InvalidCeiling(self.spike_ceiling));
        }
        Ok(())
    }
}
