//! Error types and handling
//!
//! Common error types used across the recorder.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a capture stream could not be acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionReason {
    /// The user or the platform refused access
    PermissionDenied,
    /// The device is held by another process
    DeviceBusy,
    /// No device satisfies the requested constraints
    ConstraintUnsatisfiable,
    /// Anything else the platform reports
    Other,
}

impl fmt::Display for AcquisitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AcquisitionReason::PermissionDenied => "permission denied",
            AcquisitionReason::DeviceBusy => "device busy",
            AcquisitionReason::ConstraintUnsatisfiable => "constraint unsatisfiable",
            AcquisitionReason::Other => "platform error",
        };
        f.write_str(name)
    }
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Device enumeration failed: {0}")]
    DeviceEnumeration(String),

    #[error("Stream acquisition failed ({reason}): {message}")]
    StreamAcquisition {
        reason: AcquisitionReason,
        message: String,
    },

    #[error("Failed to create recorder: {0}")]
    RecorderConstruction(String),

    #[error("Recorder error: {0}")]
    Recorder(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: String,
    },

    #[error("Nothing has been recorded")]
    EmptyRecording,

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub(crate) fn invalid(action: &'static str, state: impl fmt::Display) -> Self {
        AppError::InvalidTransition {
            action,
            state: state.to_string(),
        }
    }

    /// Whether the error came from a rejected action rather than a failing platform call
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::InvalidTransition { .. } | AppError::EmptyRecording
        )
    }
}

/// Error response for front ends
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::DeviceEnumeration(_) => "DEVICE_ENUMERATION_ERROR",
            AppError::StreamAcquisition {
                reason: AcquisitionReason::PermissionDenied,
                ..
            } => "PERMISSION_DENIED",
            AppError::StreamAcquisition { .. } => "STREAM_ACQUISITION_ERROR",
            AppError::RecorderConstruction(_) => "RECORDER_CONSTRUCTION_ERROR",
            AppError::Recorder(_) => "RECORDER_ERROR",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::EmptyRecording => "EMPTY_RECORDING",
            AppError::Playback(_) => "PLAYBACK_ERROR",
            AppError::Download(_) => "DOWNLOAD_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
