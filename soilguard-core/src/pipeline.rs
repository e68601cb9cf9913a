//! Decode -> validate pipeline for one message
//!
//! The pipeline owns no I/O. Feed it payload bytes, get back either a
//! [`Reading`] ready to persist or the reason the message was dropped. Each
//! failure is logged exactly once at warning level: decode failures by the
//! [`Decoder`], rejections here.

use std::sync::Arc;

use crate::{
    calibration::CalibrationConfig,
    decode::Decoder,
    errors::PipelineError,
    reading::Reading,
    time::{SystemClock, TimeSource},
    traits::{ValidationContext, Validator},
    validators::SoilValidator,
};

/// Shared clock handle
pub type SharedClock = Arc<dyn TimeSource + Send + Sync>;

/// Stateless message processor
#[derive(Clone)]
pub struct IngestPipeline {
    decoder: Decoder,
    validator: SoilValidator,
    clock: SharedClock,
}

impl core::fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("decoder", &self.decoder)
            .field("validator", &self.validator)
            .field("wall_clock", &self.clock.is_wall_clock())
            .finish()
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

impl IngestPipeline {
    /// Pipeline stamping readings with the system clock
    pub fn new(calibration: CalibrationConfig) -> Self {
        Self::with_clock(calibration, Arc::new(SystemClock))
    }

    /// Pipeline with an injected clock
    pub fn with_clock(calibration: CalibrationConfig, clock: SharedClock) -> Self {
        Self {
            decoder: Decoder::default(),
            validator: SoilValidator::new(calibration),
            clock,
        }
    }

    /// Replace the decoder
    pub fn decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Active calibration
    pub fn calibration(&self) -> &CalibrationConfig {
        self.validator.calibration()
    }

    /// Run one payload through decode and validation
    pub fn process(&self, payload: &[u8]) -> Result<Reading, PipelineError> {
        let raw = self.decoder.decode(payload)?;
        let context = ValidationContext::at(self.clock.now());

        self.validator.validate(&raw, &context).map_err(|reason| {
            log_warn!("Rejected reading [{}]: {}", reason.code(), reason);
            PipelineError::Rejected(reason)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DecodeError, RejectReason};
    use crate::time::FixedTime;

    fn pipeline() -> IngestPipeline {
        IngestPipeline::with_clock(
            CalibrationConfig::default().raw_scale(0.1),
            Arc::new(FixedTime::new(1_700_000_000_000)),
        )
    }

    #[test]
    fn accepts_and_stamps() {
        let reading = pipeline()
            .process(br#"{"node_id":"node01","nitrogen":800,"phosphorus":200,"potassium":150,"ph":6.5,"moisture":35.2}"#)
            .unwrap();

        assert_eq!(reading.timestamp(), 1_700_000_000_000);
        assert_eq!(reading.nitrogen(), 80);
        assert_eq!(reading.moisture(), 35.2);
    }

    #[test]
    fn decode_failure_surfaces() {
        let err = pipeline().process(b"not json").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(DecodeError::Malformed { .. })));
    }

    #[test]
    fn rejection_surfaces() {
        let err = pipeline().process(br#"{"nitrogen":0,"phosphorus":0,"potassium":0}"#).unwrap_err();
        assert_eq!(err, PipelineError::Rejected(RejectReason::DeadSensor));
    }

    #[test]
    fn deterministic_with_fixed_clock() {
        let pipeline = pipeline();
        let payload = br#"{"nitrogen":123,"ph":7.1}"#;
        assert_eq!(pipeline.process(payload).unwrap(), pipeline.process(payload).unwrap());
    }
}
