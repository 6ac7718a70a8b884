//! Shared utilities

pub mod error;

pub use error::{AcquisitionReason, AppError, AppResult, ErrorResponse};
