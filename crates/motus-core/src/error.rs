//! Error types for MOTUS
//!
//! Only construction and configuration can fail. Steady-state bad data
//! (low confidence, missing keypoints, short history) is reported through
//! `is_valid: false` results, never through this type.

use thiserror::Error;

/// Core MOTUS errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotusError {
    #[error("Invalid buffer capacity: {capacity} (must be at least 1)")]
    InvalidCapacity { capacity: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Logging initialisation failed: {0}")]
    Logging(String),
}

impl MotusError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        MotusError::InvalidConfig(msg.into())
    }
}

/// Result type for MOTUS operations
pub type MotusResult<T> = Result<T, MotusError>;

/// Check that `value` lies in `[min, max]`, naming the field on failure.
pub fn ensure_range(field: &str, value: f64, min: f64, max: f64) -> MotusResult<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(MotusError::config(format!(
            "{field} = {value} outside [{min}, {max}]"
        )))
    }
}

/// Check that `value` is finite and strictly positive.
pub fn ensure_positive(field: &str, value: f64) -> MotusResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MotusError::config(format!("{field} = {value} must be > 0")))
    }
}
