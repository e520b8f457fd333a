//! Camera capture
//!
//! Frame acquisition from a webcam via nokhwa, plus the facing-mode
//! model used to pick between front- and rear-style devices.

pub mod camera;
pub mod traits;

pub use camera::{get_cameras, CameraSource};
pub use traits::{CameraInfo, CaptureError, FacingMode, Frame, Resolution};

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;
