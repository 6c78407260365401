// src/error.rs
use thiserror::Error;

/// Error types for the fast-pde library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PdeError {
    /// Invalid parameter values
    #[error("Invalid parameter '{parameter}' = {value}: {constraint}")]
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Invalid configuration (grid sizes, step counts, mismatched collaborators)
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// Query point outside the meshed domain
    #[error("{dimension} coordinate {value} lies outside the meshed domain [{min}, {max}]")]
    OutOfDomain {
        dimension: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Non-finite values produced while marching the grid
    #[error("Numerical instability in {method}: {reason}")]
    NumericalInstability { method: String, reason: String },

    /// Zero pivot in a banded solve
    #[error("Singular tridiagonal system of size {size} (pivot {pivot:e} at row {row})")]
    SingularSystem { size: usize, row: usize, pivot: f64 },
}

impl PdeError {
    /// True for errors caused by caller input rather than by the computation itself.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PdeError::InvalidParameters { .. }
                | PdeError::InvalidConfiguration { .. }
                | PdeError::OutOfDomain { .. }
        )
    }

    pub(crate) fn config(field: &str, reason: impl Into<String>) -> Self {
        PdeError::InvalidConfiguration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for fast-pde operations
pub type PdeResult<T> = Result<T, PdeError>;

/// Validation utilities
pub mod validation {
    use super::{PdeError, PdeResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> PdeResult<()> {
        if !(value > 0.0) {
            Err(PdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> PdeResult<()> {
        if !(value >= 0.0) {
            Err(PdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is within a closed range
    pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> PdeResult<()> {
        if !(value >= min && value <= max) {
            Err(PdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: format!("must be in range [{}, {}]", min, max),
            })
        } else {
            Ok(())
        }
    }

    /// Validate correlation parameter
    pub fn validate_correlation(name: &str, rho: f64) -> PdeResult<()> {
        validate_range(name, rho, -1.0, 1.0)
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> PdeResult<()> {
        if !value.is_finite() {
            Err(PdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate time step count
    pub fn validate_steps(steps: usize) -> PdeResult<()> {
        if steps == 0 {
            Err(PdeError::config("time_steps", "must be greater than 0"))
        } else if steps > 1_000_000 {
            Err(PdeError::config(
                "time_steps",
                "exceeds maximum allowed (1,000,000)",
            ))
        } else {
            Ok(())
        }
    }

    /// Validate the number of points along one mesh axis
    pub fn validate_grid_size(field: &str, size: usize) -> PdeResult<()> {
        if size < 3 {
            Err(PdeError::config(
                field,
                format!("needs at least 3 points for a second-difference stencil, got {}", size),
            ))
        } else {
            Ok(())
        }
    }
}
