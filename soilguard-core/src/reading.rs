//! Soil reading data model
//!
//! A [`Reading`] is one accepted observation from a field node. It is built by
//! the validator from a decoded message, never changes afterwards, and is
//! written to storage exactly once.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::time::{self, Timestamp};

/// One of the three macro-nutrient channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpkChannel {
    /// N
    Nitrogen,
    /// P
    Phosphorus,
    /// K
    Potassium,
}

impl NpkChannel {
    /// All channels in wire order
    pub const ALL: [NpkChannel; 3] = [Self::Nitrogen, Self::Phosphorus, Self::Potassium];

    /// Field name on the wire
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Nitrogen => "nitrogen",
            Self::Phosphorus => "phosphorus",
            Self::Potassium => "potassium",
        }
    }
}

impl fmt::Display for NpkChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Nitrogen, phosphorus and potassium in calibrated units (mg/kg)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Npk {
    /// Nitrogen
    pub nitrogen: i64,
    /// Phosphorus
    pub phosphorus: i64,
    /// Potassium
    pub potassium: i64,
}

impl Npk {
    /// Build from the three channels
    pub const fn new(nitrogen: i64, phosphorus: i64, potassium: i64) -> Self {
        Self { nitrogen, phosphorus, potassium }
    }

    /// Value on one channel
    pub fn get(&self, channel: NpkChannel) -> i64 {
        match channel {
            NpkChannel::Nitrogen => self.nitrogen,
            NpkChannel::Phosphorus => self.phosphorus,
            NpkChannel::Potassium => self.potassium,
        }
    }

    /// True when every channel reads exactly zero
    pub fn is_all_zero(&self) -> bool {
        self.nitrogen == 0 && self.phosphorus == 0 && self.potassium == 0
    }

    /// Apply a calibration multiplier channel by channel, rounding to integer
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |raw: i64| (raw as f64 * factor).round() as i64;
        Self {
            nitrogen: scale(self.nitrogen),
            phosphorus: scale(self.phosphorus),
            potassium: scale(self.potassium),
        }
    }
}

/// Validated soil observation
///
/// Fields are private so a reading cannot be edited after the validator
/// accepted it. Storage backends rebuild persisted rows through
/// [`Reading::from_parts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(with = "time::rfc3339")]
    timestamp: Timestamp,
    node_id: String,
    #[serde(flatten)]
    npk: Npk,
    ph: f64,
    moisture: f64,
    temperature: f64,
    ec: f64,
}

/// Plain field bundle used to rebuild a [`Reading`] from storage or backfill
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingParts {
    /// Ingestion time (ms since epoch)
    pub timestamp: Timestamp,
    /// Originating node
    pub node_id: String,
    /// Calibrated nutrients
    pub npk: Npk,
    /// Acidity
    pub ph: f64,
    /// Volumetric water content (%)
    pub moisture: f64,
    /// Soil temperature (°C)
    pub temperature: f64,
    /// Electrical conductivity
    pub ec: f64,
}

impl Reading {
    /// Rebuild a reading from its parts
    ///
    /// Skips validation. Ingestion goes through the validator; this exists for
    /// storage backends and backfill tools.
    pub fn from_parts(parts: ReadingParts) -> Self {
        Self {
            timestamp: parts.timestamp,
            node_id: parts.node_id,
            npk: parts.npk,
            ph: parts.ph,
            moisture: parts.moisture,
            temperature: parts.temperature,
            ec: parts.ec,
        }
    }

    /// Ingestion time (ms since epoch)
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Originating node
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Calibrated nutrients
    pub fn npk(&self) -> Npk {
        self.npk
    }

    /// Calibrated nitrogen
    pub fn nitrogen(&self) -> i64 {
        self.npk.nitrogen
    }

    /// Calibrated phosphorus
    pub fn phosphorus(&self) -> i64 {
        self.npk.phosphorus
    }

    /// Calibrated potassium
    pub fn potassium(&self) -> i64 {
        self.npk.potassium
    }

    /// Acidity
    pub fn ph(&self) -> f64 {
        self.ph
    }

    /// Volumetric water content (%)
    pub fn moisture(&self) -> f64 {
        self.moisture
    }

    /// Soil temperature (°C)
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Electrical conductivity
    pub fn ec(&self) -> f64 {
        self.ec
    }

    /// Decompose into parts
    pub fn into_parts(self) -> ReadingParts {
        ReadingParts {
            timestamp: self.timestamp,
            node_id: self.node_id,
            npk: self.npk,
            ph: self.ph,
            moisture: self.moisture,
            temperature: self.temperature,
            ec: self.ec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Reading {
        Reading::from_parts(ReadingParts {
            timestamp: 1_700_000_000_000,
            node_id: "node01".to_string(),
            npk: Npk::new(80, 20, 15),
            ph: 6.5,
            moisture: 32.0,
            temperature: 21.5,
            ec: 1.2,
        })
    }

    #[test]
    fn scaling_rounds_to_nearest() {
        let raw = Npk::new(800, 200, 155);
        assert_eq!(raw.scaled(0.1), Npk::new(80, 20, 16));
    }

    #[test]
    fn all_zero_detection() {
        assert!(Npk::default().is_all_zero());
        assert!(!Npk::new(0, 0, 1).is_all_zero());
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["node_id"], "node01");
        assert_eq!(json["nitrogen"], 80);
        assert_eq!(json["potassium"], 15);
        assert_eq!(json["timestamp"], "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn json_round_trip_preserves_reading() {
        let reading = sample();
        let text = serde_json::to_string(&reading).unwrap();
        let back: Reading = serde_json::from_str(&text).unwrap();
        assert_eq!(back, reading);
    }
}
