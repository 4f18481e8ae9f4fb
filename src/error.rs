//! Error types for the calibration engine

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for calibration operations
pub type CalResult<T> = Result<T, CalibrationError>;

/// Errors that can occur while configuring or calibrating a recorder
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// Invalid or unsupported parameter
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Degenerate numeric input (zero denominator, empty signal, ...)
    #[error("Numeric domain error: {0}")]
    Domain(String),

    /// Calibration table or binary header is malformed
    #[error("Malformed data: {0}")]
    Format(String),

    /// No rising edge above threshold in the signal
    #[error("No calibration tone found in signal")]
    ToneNotFound,

    /// A tone was found but it is shorter than required
    #[error("Calibration tone too short: {duration_secs:.3}s < {min_duration_secs:.3}s")]
    ToneTooShort {
        duration_secs: f64,
        min_duration_secs: f64,
    },

    /// Missing or unreadable file
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Audio container or codec could not be decoded
    #[error("Failed to decode audio {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
}

impl CalibrationError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error comes from the data of one item (an unreadable or
    /// malformed file, a missing or short tone) rather than from the caller's
    /// parameters
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CalibrationError::Io { .. }
                | CalibrationError::Decode { .. }
                | CalibrationError::Format(_)
                | CalibrationError::ToneNotFound
                | CalibrationError::ToneTooShort { .. }
        )
    }

    /// Short machine-readable category, used in mission reports
    pub fn kind(&self) -> &'static str {
        match self {
            CalibrationError::Configuration(_) => "configuration",
            CalibrationError::Domain(_) => "domain",
            CalibrationError::Format(_) => "format",
            CalibrationError::ToneNotFound => "tone_not_found",
            CalibrationError::ToneTooShort { .. } => "tone_too_short",
            CalibrationError::Io { .. } | CalibrationError::Decode { .. } => "io",
        }
    }
}
