//! Error types and handling
//!
//! Common error types used across the adapter.

use crate::capture::CaptureError;
use crate::recorder::RecorderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Adapter-wide error type
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Display surface not found: {0}")]
    SurfaceNotFound(String),

    #[error("Recorder has not been enabled")]
    NotEnabled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for RelayError {
    fn from(error: toml::de::Error) -> Self {
        RelayError::Config(error.to_string())
    }
}

impl From<toml::ser::Error> for RelayError {
    fn from(error: toml::ser::Error) -> Self {
        RelayError::Config(error.to_string())
    }
}

/// Error response for the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<RelayError> for ErrorResponse {
    fn from(error: RelayError) -> Self {
        let code = match &error {
            RelayError::Capture(CaptureError::NotAllowed(_)) => "PERMISSION_DENIED",
            RelayError::Capture(_) => "CAPTURE_ERROR",
            RelayError::Recorder(RecorderError::InvalidState(_)) => "INVALID_STATE",
            RelayError::Recorder(RecorderError::NotSupported(_)) => "NOT_SUPPORTED",
            RelayError::Recorder(_) => "RECORDER_ERROR",
            RelayError::SurfaceNotFound(_) => "SURFACE_NOT_FOUND",
            RelayError::NotEnabled => "NOT_ENABLED",
            RelayError::Io(_) => "IO_ERROR",
            RelayError::Serialization(_) => "SERIALIZATION_ERROR",
            RelayError::Config(_) => "CONFIG_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using RelayError
pub type RelayResult<T> = Result<T, RelayError>;
