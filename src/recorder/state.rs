//! Recording state and results

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recording-related errors
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("No supported encoding format found")]
    NoSupportedFormat,

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Current state of the recording pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Currently recording
    Recording,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Result of a completed recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    /// Path of the assembled output file
    pub output_path: String,

    /// Encoding format identifier used
    pub format: String,

    /// Recording duration in milliseconds
    pub duration_ms: f64,

    /// Number of encoded fragments concatenated into the file
    pub fragment_count: usize,

    /// Total encoded size in bytes
    pub total_bytes: u64,
}
