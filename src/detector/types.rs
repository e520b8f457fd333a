//! Detector types and configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detector-related errors
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Failed to spawn detector process: {0}")]
    SpawnFailed(String),

    #[error("Detector IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Detector protocol error: {0}")]
    Protocol(String),

    #[error("Failed to parse detector output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Classification of a detected hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// A single normalized landmark point.
///
/// Coordinates are in [0, 1] relative to the frame; `z` is depth with
/// the wrist as origin, negative toward the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

/// One detected hand: ordered landmark list plus handedness
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandResult {
    pub handedness: Handedness,

    /// Handedness classification confidence
    #[serde(default)]
    pub score: f32,

    /// 21 landmarks in MediaPipe hand topology order
    pub landmarks: Vec<Landmark>,
}

impl HandResult {
    pub fn is_right(&self) -> bool {
        self.handedness == Handedness::Right
    }
}

/// Detection parameters passed through to the detector process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    /// Command to launch the detector process
    pub command: String,

    /// Maximum number of hands to detect
    pub max_num_hands: u32,

    /// Model complexity (0 = lite, 1 = full)
    pub model_complexity: u32,

    /// Minimum detection confidence
    pub min_detection_confidence: f64,

    /// Minimum tracking confidence
    pub min_tracking_confidence: f64,
}

impl DetectorConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            max_num_hands: 2,
            model_complexity: 1,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }

    /// Command-line flags handed to the detector process
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--max-hands".to_string(),
            self.max_num_hands.to_string(),
            "--model-complexity".to_string(),
            self.model_complexity.to_string(),
            "--min-detection-confidence".to_string(),
            self.min_detection_confidence.to_string(),
            "--min-tracking-confidence".to_string(),
            self.min_tracking_confidence.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_detector_contract() {
        let config = DetectorConfig::new("hand-landmarker");
        assert_eq!(config.max_num_hands, 2);
        assert_eq!(config.model_complexity, 1);
        assert_eq!(config.min_detection_confidence, 0.5);
        assert_eq!(config.min_tracking_confidence, 0.5);
    }

    #[test]
    fn test_config_args() {
        let args = DetectorConfig::new("hand-landmarker").to_args();
        assert_eq!(
            args,
            vec![
                "--max-hands",
                "2",
                "--model-complexity",
                "1",
                "--min-detection-confidence",
                "0.5",
                "--min-tracking-confidence",
                "0.5",
            ]
        );
    }

    #[test]
    fn test_hand_result_deserializes_mediapipe_labels() {
        let json = r#"{"handedness":"Right","score":0.97,"landmarks":[{"x":0.5,"y":0.5,"z":-0.01}]}"#;
        let hand: HandResult = serde_json::from_str(json).unwrap();
        assert!(hand.is_right());
        assert_eq!(hand.landmarks.len(), 1);
    }
}
