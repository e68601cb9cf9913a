//! Core traits for validators
//!
//! Keep them simple: a validator is a pure function of its input, its own
//! configuration and the context passed in.

use crate::errors::ValidationResult;
use crate::time::Timestamp;

/// Context passed to validators
///
/// Holds everything that would otherwise be ambient state, so calling a
/// validator twice with the same input and context gives the same answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationContext {
    /// Ingestion time stamped onto accepted readings
    pub timestamp: Timestamp,
}

impl ValidationContext {
    /// Context for a message ingested at `timestamp`
    pub fn at(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }
}

/// Core validator trait
pub trait Validator {
    /// Type being checked
    type Input;

    /// Type produced on acceptance
    type Output;

    /// Accept or reject one input
    fn validate(&self, input: &Self::Input, context: &ValidationContext) -> ValidationResult<Self::Output>;
}

/// Trait for values that can be validated
pub trait Validatable {
    /// Check if the value is a usable number (not NaN or infinite)
    fn is_valid(&self) -> bool;
}

impl Validatable for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}
