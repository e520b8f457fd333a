//! Interactive shell
//!
//! Maps typed commands to camera and recording operations and prints
//! the debug log as it grows. The camera does not start at launch; the
//! first line of user input starts it, after which commands apply.

pub mod log;

pub use log::DebugLog;

use crate::capture::get_cameras;
use crate::recorder::{RecordingError, RecordingPipeline, RecordingSummary};
use crate::session::SessionCoordinator;
use crate::utils::error::AppResult;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  <enter>       start the camera (first input only)
  s, switch     switch between user and environment facing
  r, record     start/stop recording the composited surface
  resize W H    resize the output surface
  cameras       list available cameras
  log           print the debug panel
  h, help       show this help
  q, quit       exit";

pub struct Shell {
    coordinator: SessionCoordinator,
    pipeline: RecordingPipeline,
    log: Arc<DebugLog>,
}

impl Shell {
    pub fn new(
        coordinator: SessionCoordinator,
        pipeline: RecordingPipeline,
        log: Arc<DebugLog>,
    ) -> Self {
        Self {
            coordinator,
            pipeline,
            log,
        }
    }

    pub async fn run(mut self) -> AppResult<()> {
        println!("{HELP}");
        self.log
            .push("Page loaded. Press Enter to start the camera.");

        // Echo debug-panel lines as they arrive
        let mut panel_rx = self.log.subscribe();
        let printer = tokio::spawn(async move {
            while let Ok(line) = panel_rx.recv().await {
                println!("{line}");
            }
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let command = line.trim();

            if matches!(command, "q" | "quit") {
                break;
            }

            // First interaction starts the camera
            if !self.coordinator.is_running() {
                let facing = self.coordinator.facing();
                if self.coordinator.start(facing).await.is_err() {
                    continue;
                }
                if command.is_empty() {
                    continue;
                }
            }

            match command {
                "" => {}
                "s" | "switch" => {
                    // Errors are already written to the debug log
                    let _ = self.coordinator.switch().await;
                }
                "r" | "record" => self.toggle_recording(),
                "cameras" => {
                    for camera in get_cameras() {
                        println!("  [{}] {}", camera.id, camera.name);
                    }
                }
                "log" => {
                    for line in self.log.lines() {
                        println!("{line}");
                    }
                }
                "h" | "help" => println!("{HELP}"),
                other => {
                    if let Some((w, h)) = parse_resize(other) {
                        self.coordinator.surface().write().resize(w, h);
                        self.log.push(format!("Surface resized to {w}x{h}"));
                    } else {
                        println!("Unknown command: {other} (try 'help')");
                    }
                }
            }
        }

        // Losing the final recording on quit is a real failure; anything
        // else during teardown is not
        let teardown = if self.pipeline.is_recording() {
            self.stop_recording().map(|_| ())
        } else {
            Ok(())
        };
        self.coordinator.stop();
        printer.abort();
        teardown?;
        Ok(())
    }

    fn toggle_recording(&mut self) {
        if self.pipeline.is_recording() {
            // Errors are already written to the debug log
            let _ = self.stop_recording();
        } else {
            match self.pipeline.start(self.coordinator.surface()) {
                Ok(()) => {
                    if let Some(format) = self.pipeline.current_format() {
                        self.log.push(format!("Using MIME type: {format}"));
                    }
                    self.log.push("Recording started");
                }
                Err(e) => {
                    self.log.push(format!("Recording error: {e}"));
                    // The one loud failure path: the user asked for a
                    // recording and did not get one
                    eprintln!("Failed to start recording: {e}");
                }
            }
        }
    }

    fn stop_recording(&mut self) -> Result<RecordingSummary, RecordingError> {
        match self.pipeline.stop() {
            Ok(summary) => {
                self.log.push("Recording saved");
                self.log.push(format!(
                    "Saved {} ({} fragments, {} bytes, {:.1}s)",
                    summary.output_path,
                    summary.fragment_count,
                    summary.total_bytes,
                    summary.duration_ms / 1000.0
                ));
                Ok(summary)
            }
            Err(e) => {
                self.log.push(format!("Recording error: {e}"));
                Err(e)
            }
        }
    }
}

/// Parse a `resize W H` command
fn parse_resize(command: &str) -> Option<(u32, u32)> {
    let mut parts = command.split_whitespace();
    if parts.next()? != "resize" {
        return None;
    }
    let w = parts.next()?.parse().ok()?;
    let h = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((w, h))
}
