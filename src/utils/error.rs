//! Error types and handling
//!
//! Common error types used across the application.

use crate::recorder::RecordingError;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_error_converts() {
        let e = AppError::from(RecordingError::NotRecording);
        assert!(e.to_string().starts_with("Recording error:"));
    }
}
