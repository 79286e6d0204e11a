// src/error.rs
use rust_decimal::Decimal;
use thiserror::Error;

// --- Engine Error Types ---

/// Validation failures raised by the rate table and the engine.
///
/// Every variant is a rejected request: nothing is computed once one of these
/// is returned, and the caller may re-issue the request with corrected input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaborError {
    #[error("Unknown function '{function}': it has no entry in the rate table")]
    UnknownFunction { function: String },

    #[error("Invalid rate for '{field}': {value} ({reason})")]
    InvalidRate {
        field: String, // Function name, or "shift_hours"
        value: Decimal,
        reason: String,
    },

    #[error("Invalid volume for '{function}': {volume} (volumes must be non-negative)")]
    InvalidVolume { function: String, volume: Decimal },

    #[error("Invalid threshold: {threshold} (thresholds must be non-negative)")]
    InvalidThreshold { threshold: Decimal },
}

impl LaborError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LaborError::UnknownFunction { .. } => "UnknownFunction",
            LaborError::InvalidRate { .. } => "InvalidRate",
            LaborError::InvalidVolume { .. } => "InvalidVolume",
            LaborError::InvalidThreshold { .. } => "InvalidThreshold",
        }
    }

    pub(crate) fn invalid_rate(field: &str, value: Decimal, reason: &str) -> Self {
        LaborError::InvalidRate {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
    }
}

pub type LaborResult<T> = Result<T, LaborError>;

/// Failures while loading a rate table from an external source.
#[derive(Error, Debug)]
pub enum RateTableLoadError {
    #[error("Failed to read rate table file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Rate table JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown rate preset '{0}' (expected one of: standard, short-shift)")]
    UnknownPreset(String),
    #[error(transparent)]
    Invalid(#[from] LaborError),
}
