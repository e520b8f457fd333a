//! Surface recording
//!
//! Captures the composited surface at a fixed frame rate, encodes it
//! through FFmpeg, buffers the encoded fragments, and assembles them
//! into a single downloadable file on stop.

pub mod encoding;
pub mod pipeline;
pub mod state;

pub use encoding::{pick_format, EncodingFormat};
pub use pipeline::RecordingPipeline;
pub use state::{RecordingError, RecordingState, RecordingSummary};

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;
