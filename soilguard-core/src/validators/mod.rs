//! Plausibility Validators for Soil Telemetry
//!
//! ## Overview
//!
//! Field NPK probes fail in recognisable ways, and most of those failures still
//! produce syntactically perfect JSON. The validators here reject readings that
//! cannot describe real soil, so dashboards never chart a probe fault as a
//! nutrient crash.
//!
//! ## Validation Layers
//!
//! ### 1. Calibration
//! RS485 NPK probes report raw register counts. A deployment-wide multiplier
//! (`raw_scale`) converts them into mg/kg before any check runs, so every
//! threshold below is expressed in real units.
//!
//! ### 2. Range Validation
//! Limits that follow from the quantity itself:
//! - pH lives on a 0-14 scale
//! - Volumetric moisture lives in 0-100 %
//!
//! ### 3. Fault Patterns
//! Signatures of broken hardware rather than unusual soil:
//! - **Spike**: a calibrated channel above the ceiling (default 1000 mg/kg),
//!   typical of bus noise or a probe answering with the wrong register
//! - **Dead sensor**: N, P and K all exactly zero, which is what an unpolled or
//!   unpowered probe returns
//!
//! ## Usage Example
//!
//! ```rust
//! use soilguard_core::{CalibrationConfig, SoilValidator, Validator, ValidationContext};
//! use soilguard_core::decode::decode;
//!
//! let validator = SoilValidator::new(CalibrationConfig::default().raw_scale(0.1));
//! let raw = decode(br#"{"nitrogen": 800, "phosphorus": 200, "potassium": 150, "ph": 6.4}"#)?;
//!
//! let reading = validator.validate(&raw, &ValidationContext::at(1_700_000_000_000)).unwrap();
//! assert_eq!(reading.nitrogen(), 80);
//! # Ok::<(), soilguard_core::DecodeError>(())
//! ```

mod soil;
pub mod utils;

pub use soil::SoilValidator;
