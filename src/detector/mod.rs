//! Hand-landmark detection
//!
//! Detection itself is delegated to an external detector process; this
//! module only feeds it frames and parses whatever landmarks it returns.

pub mod backend;
pub mod types;

pub use backend::{ExternalDetector, LandmarkDetector};
pub use types::{DetectorConfig, DetectorError, HandResult, Handedness, Landmark};

/// Result type for detector operations
pub type DetectorResult<T> = Result<T, DetectorError>;
