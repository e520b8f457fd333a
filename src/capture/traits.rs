//! Capture type definitions
//!
//! Shared types for camera enumeration and frame delivery.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capture-related errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No camera found for facing mode {0}")]
    DeviceNotFound(FacingMode),

    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    #[error("Failed to read frame: {0}")]
    FrameFailed(String),
}

/// Which way the active camera points.
///
/// Webcams have no facing metadata the way phone cameras do, so each
/// facing mode maps to a device-index preference: `User` prefers the
/// first enumerated device, `Environment` the second, with device-name
/// hints ("front"/"back") taking priority when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Camera points toward the user (front camera, mirrored preview)
    User,
    /// Camera points away from the user (rear camera)
    Environment,
}

impl FacingMode {
    /// The other facing mode
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    /// Whether the preview should be horizontally mirrored
    pub fn is_mirrored(self) -> bool {
        matches!(self, FacingMode::User)
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "front" => Ok(FacingMode::User),
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            other => Err(format!("invalid facing mode: {other} (expected 'user' or 'environment')")),
        }
    }
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

/// Information about a camera/webcam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Supported resolutions
    pub supported_resolutions: Vec<Resolution>,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// A single RGBA camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixel data, `width * height * 4` bytes
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_toggle_round_trip() {
        assert_eq!(FacingMode::User.toggled(), FacingMode::Environment);
        assert_eq!(FacingMode::User.toggled().toggled(), FacingMode::User);
        assert_eq!(
            FacingMode::Environment.toggled().toggled(),
            FacingMode::Environment
        );
    }

    #[test]
    fn test_mirror_only_for_user_facing() {
        assert!(FacingMode::User.is_mirrored());
        assert!(!FacingMode::Environment.is_mirrored());
    }
}
