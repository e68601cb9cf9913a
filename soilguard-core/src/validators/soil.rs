//! Soil reading validator
//!
//! Turns a decoded message into a [`Reading`] or a [`RejectReason`]. Steps run
//! in a fixed order and the first failure wins:
//!
//! 1. Extract `node_id`, `ph`, `moisture`, `temperature`, `ec` with defaults
//! 2. Extract raw NPK and apply `raw_scale`, rounding to integer
//! 3. pH must lie in [0, 14]
//! 4. Moisture must lie in [0, 100]
//! 5. No calibrated NPK channel may exceed the spike ceiling
//! 6. Calibrated NPK must not be all zero
//! 7. Accept, stamped with the context timestamp
//!
//! Temperature and EC are range-free: no deployment has ever agreed on bounds
//! for them.

use crate::{
    calibration::CalibrationConfig,
    constants::{
        DEFAULT_EC, DEFAULT_MOISTURE_PCT, DEFAULT_NODE_ID, DEFAULT_PH, DEFAULT_RAW_NPK,
        DEFAULT_TEMPERATURE_C, MOISTURE_MAX_PCT, MOISTURE_MIN_PCT, PH_MAX, PH_MIN,
    },
    decode::RawMessage,
    errors::{RejectReason, ValidationResult},
    reading::{Npk, NpkChannel, Reading, ReadingParts},
    traits::{ValidationContext, Validator},
};

use super::utils;

/// Calibrating validator for NPK soil probes
#[derive(Debug, Clone, Default)]
pub struct SoilValidator {
    calibration: CalibrationConfig,
}

impl SoilValidator {
    /// Create a validator with the given calibration
    pub fn new(calibration: CalibrationConfig) -> Self {
        Self { calibration }
    }

    /// Active calibration
    pub fn calibration(&self) -> &CalibrationConfig {
        &self.calibration
    }

    /// Read the three raw channels before scaling
    fn raw_npk(raw: &RawMessage) -> ValidationResult<Npk> {
        Ok(Npk {
            nitrogen: utils::int_field(raw, "nitrogen", DEFAULT_RAW_NPK)?,
            phosphorus: utils::int_field(raw, "phosphorus", DEFAULT_RAW_NPK)?,
            potassium: utils::int_field(raw, "potassium", DEFAULT_RAW_NPK)?,
        })
    }

    /// First channel above the ceiling, in wire order
    fn spiking_channel(&self, npk: &Npk) -> Option<NpkChannel> {
        NpkChannel::ALL
            .into_iter()
            .find(|channel| npk.get(*channel) > self.calibration.spike_ceiling)
    }
}

impl Validator for SoilValidator {
    type Input = RawMessage;
    type Output = Reading;

    fn validate(&self, raw: &RawMessage, context: &ValidationContext) -> ValidationResult<Reading> {
        let node_id = utils::string_field(raw, "node_id", DEFAULT_NODE_ID)?;
        let ph = utils::float_field(raw, "ph", DEFAULT_PH)?;
        let moisture = utils::float_field(raw, "moisture", DEFAULT_MOISTURE_PCT)?;
        let temperature = utils::float_field(raw, "temperature", DEFAULT_TEMPERATURE_C)?;
        let ec = utils::float_field(raw, "ec", DEFAULT_EC)?;

        let npk = Self::raw_npk(raw)?.scaled(self.calibration.raw_scale);

        if !utils::in_range(ph, PH_MIN, PH_MAX) {
            return Err(RejectReason::InvalidPh { value: ph });
        }

        if !utils::in_range(moisture, MOISTURE_MIN_PCT, MOISTURE_MAX_PCT) {
            return Err(RejectReason::InvalidMoisture { value: moisture });
        }

        if let Some(channel) = self.spiking_channel(&npk) {
            return Err(RejectReason::SensorSpike {
                channel,
                value: npk.get(channel),
                ceiling: self.calibration.spike_ceiling,
            });
        }

        if npk.is_all_zero() {
            return Err(RejectReason::DeadSensor);
        }

        Ok(Reading::from_parts(ReadingParts {
            timestamp: context.timestamp,
            node_id,
            npk,
            ph,
            moisture,
            temperature,
            ec,
        }))
    }
}
