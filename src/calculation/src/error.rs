//! Error types for the leaf_calc crate.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CalcError>;

/// Errors raised at the boundaries of the simulation.
///
/// The integration loop itself never fails; these cover configuration
/// validation, optional finiteness checks and persistence.
#[derive(Debug, Error)]
pub enum CalcError {
    /// A body parameter violates its domain.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Constraint that was violated.
        reason: &'static str,
    },

    /// Time step is not a finite positive number.
    #[error("invalid time step {0}: must be finite and > 0")]
    InvalidTimeStep(f64),

    /// A recorded state contained NaN or infinity.
    #[error("non-finite state at step {step}")]
    NonFinite {
        /// Index of the first non-finite state.
        step: usize,
    },

    /// Malformed input data.
    #[error("format error: {0}")]
    Format(String),

    /// A required CSV column is absent.
    #[error("missing column `{0}`")]
    MissingColumn(String),

    /// I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Tabular I/O failure.
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl CalcError {
    /// Creates an invalid parameter error.
    #[must_use]
    pub const fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}
