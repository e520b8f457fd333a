//! Detector backends
//!
//! The production backend pipes raw frames to an external detector
//! process and reads one JSON result line per frame. A frame is never
//! submitted before the previous result has been read, so results come
//! back in submission order with at most one detection in flight.

use crate::capture::Frame;
use crate::detector::types::{DetectorConfig, DetectorError, HandResult};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdout, Command, Stdio};

/// An opaque hand-landmark detector.
///
/// `detect` blocks until the detector has produced a result for the
/// submitted frame; zero hands is a normal result, not an error.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandResult>, DetectorError>;
}

/// Per-frame header written ahead of the raw RGBA payload
#[derive(Debug, Serialize)]
struct FrameHeader {
    width: u32,
    height: u32,
}

/// One result line read back from the detector
#[derive(Debug, Deserialize)]
struct DetectionLine {
    #[serde(default)]
    hands: Vec<HandResult>,
}

/// Detector backend driving an external process.
///
/// Wire protocol, per frame: one JSON header line (`{"width":..,"height":..}`)
/// followed by `width * height * 4` bytes of RGBA data on stdin; one JSON
/// line (`{"hands":[...]}`) back on stdout.
pub struct ExternalDetector {
    process: Child,
    stdin: BufWriter<std::process::ChildStdin>,
    stdout: BufReader<ChildStdout>,
    line: String,
}

impl ExternalDetector {
    /// Spawn the configured detector command
    pub fn spawn(config: &DetectorConfig) -> Result<Self, DetectorError> {
        let mut process = Command::new(&config.command)
            .args(config.to_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DetectorError::SpawnFailed(format!("{}: {}", config.command, e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| DetectorError::SpawnFailed("Failed to capture stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| DetectorError::SpawnFailed("Failed to capture stdout".to_string()))?;

        tracing::info!(
            "Started detector process: {} (max hands: {}, complexity: {})",
            config.command,
            config.max_num_hands,
            config.model_complexity
        );

        Ok(Self {
            process,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
            line: String::new(),
        })
    }
}

impl LandmarkDetector for ExternalDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandResult>, DetectorError> {
        let header = serde_json::to_string(&FrameHeader {
            width: frame.width,
            height: frame.height,
        })?;
        self.stdin.write_all(header.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.write_all(&frame.data)?;
        self.stdin.flush()?;

        self.line.clear();
        let read = self.stdout.read_line(&mut self.line)?;
        if read == 0 {
            return Err(DetectorError::Protocol(
                "Detector process closed its output".to_string(),
            ));
        }

        let result: DetectionLine = serde_json::from_str(self.line.trim())?;
        Ok(result.hands)
    }
}

impl Drop for ExternalDetector {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::types::Handedness;

    #[test]
    fn test_detection_line_parses_hands() {
        let line = r#"{"hands":[{"handedness":"Left","score":0.9,"landmarks":[{"x":0.1,"y":0.2}]}]}"#;
        let parsed: DetectionLine = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.hands.len(), 1);
        assert_eq!(parsed.hands[0].handedness, Handedness::Left);
        assert_eq!(parsed.hands[0].landmarks[0].z, 0.0);
    }

    #[test]
    fn test_detection_line_empty_result() {
        let parsed: DetectionLine = serde_json::from_str("{}").unwrap();
        assert!(parsed.hands.is_empty());
    }
}
