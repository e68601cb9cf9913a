//! Physical Bounds of Soil Measurements
//!
//! These limits come from the definition of the quantity itself, not from a
//! sensor datasheet. A reading outside them is a sensor or calibration fault.

// ===== ACIDITY =====

/// Lowest value on the pH scale for aqueous soil extracts.
///
/// Source: definition of pH for water-based solutions (0-14).
pub const PH_MIN: f64 = 0.0;

/// Highest value on the pH scale for aqueous soil extracts.
///
/// Agricultural soils sit between 3.5 and 10; anything above 14 is not a
/// measurement at all.
pub const PH_MAX: f64 = 14.0;

// ===== WATER CONTENT =====

/// Minimum volumetric moisture (%). Oven-dry soil.
pub const MOISTURE_MIN_PCT: f64 = 0.0;

/// Maximum volumetric moisture (%). Fully saturated.
pub const MOISTURE_MAX_PCT: f64 = 100.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_ordered() {
        assert!(PH_MIN < PH_MAX);
        assert!(MOISTURE_MIN_PCT < MOISTURE_MAX_PCT);
    }
}
