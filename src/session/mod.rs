//! Session coordination
//!
//! Owns the camera session state (facing mode, running flag, frame
//! loop) and orchestrates camera start/switch/stop. The frame loop is a
//! dedicated thread with an explicit cancellation flag; each iteration
//! reads one frame, runs detection to completion, and renders the
//! result, so detection is one-in-flight and in submission order by
//! construction.

use crate::capture::{CameraSource, CaptureError, FacingMode, Frame, Resolution};
use crate::compositor::Compositor;
use crate::detector::{DetectorConfig, ExternalDetector, LandmarkDetector};
use crate::shell::DebugLog;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;

/// Ideal camera capture resolution requested from the device
pub const IDEAL_RESOLUTION: Resolution = Resolution {
    width: 1280,
    height: 720,
};

/// Events emitted by the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Camera started with the given facing mode
    CameraStarted(FacingMode),
    /// Camera stopped
    CameraStopped,
    /// Error occurred
    Error(String),
}

/// Mutable session state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub facing: FacingMode,
    pub running: bool,
    pub session_id: Option<Uuid>,
}

/// Coordinates the camera, detector, and compositor for one session
pub struct SessionCoordinator {
    state: Arc<RwLock<SessionState>>,
    surface: Arc<RwLock<Compositor>>,
    cancel: Arc<AtomicBool>,
    frame_loop: Option<std::thread::JoinHandle<()>>,
    detector_config: Option<DetectorConfig>,
    log: Arc<DebugLog>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionCoordinator {
    pub fn new(
        surface: Arc<RwLock<Compositor>>,
        detector_config: Option<DetectorConfig>,
        initial_facing: FacingMode,
        log: Arc<DebugLog>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(SessionState {
                facing: initial_facing,
                running: false,
                session_id: None,
            })),
            surface,
            cancel: Arc::new(AtomicBool::new(false)),
            frame_loop: None,
            detector_config,
            log,
            event_tx,
        }
    }

    /// Shared handle to the output surface
    pub fn surface(&self) -> Arc<RwLock<Compositor>> {
        self.surface.clone()
    }

    pub fn facing(&self) -> FacingMode {
        self.state.read().facing
    }

    pub fn is_running(&self) -> bool {
        self.state.read().running
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Start the camera for the given facing mode.
    ///
    /// Any existing stream is fully torn down first. On failure the
    /// previous facing mode is kept, the error is logged, and the
    /// session is left idle — the user may retry.
    pub async fn start(&mut self, facing: FacingMode) -> Result<(), CaptureError> {
        self.stop();

        self.cancel = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = oneshot::channel();

        let cancel = self.cancel.clone();
        let surface = self.surface.clone();
        let state = self.state.clone();
        let detector_config = self.detector_config.clone();
        let log = self.log.clone();
        let event_tx = self.event_tx.clone();

        let handle = std::thread::spawn(move || {
            frame_loop(
                facing,
                surface,
                detector_config,
                cancel,
                state,
                log,
                event_tx,
                ready_tx,
            )
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.frame_loop = Some(handle);
                let session_id = Uuid::new_v4();
                {
                    let mut state = self.state.write();
                    state.facing = facing;
                    state.running = true;
                    state.session_id = Some(session_id);
                }
                tracing::info!("Camera session {} started (facing: {})", session_id, facing);
                self.log.push(format!("Camera mode: {facing}"));
                self.log
                    .push(format!("Camera initialized with facing mode: {facing}"));
                let _ = self.event_tx.send(SessionEvent::CameraStarted(facing));
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                self.log.push(format!("Camera setup error: {e}"));
                let _ = self.event_tx.send(SessionEvent::Error(e.to_string()));
                Err(e)
            }
            Err(_) => {
                // Loop thread died before reporting readiness
                let _ = handle.join();
                let e = CaptureError::OpenFailed("Frame loop exited during startup".to_string());
                self.log.push(format!("Camera setup error: {e}"));
                let _ = self.event_tx.send(SessionEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Toggle the facing preference and restart the camera.
    ///
    /// On failure the facing mode reverts to its previous value and the
    /// camera stays stopped.
    pub async fn switch(&mut self) -> Result<(), CaptureError> {
        let next = self.facing().toggled();
        self.log.push("Switching camera...");
        self.start(next).await
    }

    /// Stop the frame loop and release the camera
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.frame_loop.take() {
            let _ = handle.join();
        }
        let was_running = {
            let mut state = self.state.write();
            let was = state.running;
            state.running = false;
            state.session_id = None;
            was
        };
        if was_running {
            let _ = self.event_tx.send(SessionEvent::CameraStopped);
        }
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Consecutive frame-read failures tolerated before the stream is
/// treated as dead
const MAX_READ_FAILURES: u32 = 10;

/// Frame loop thread body.
///
/// Opens the camera (reporting the result through `ready_tx`), then
/// pumps frames until cancelled or the camera errors out, and releases
/// the camera on exit.
#[allow(clippy::too_many_arguments)]
fn frame_loop(
    facing: FacingMode,
    surface: Arc<RwLock<Compositor>>,
    detector_config: Option<DetectorConfig>,
    cancel: Arc<AtomicBool>,
    state: Arc<RwLock<SessionState>>,
    log: Arc<DebugLog>,
    event_tx: broadcast::Sender<SessionEvent>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
) {
    let mut source = match CameraSource::open(facing, IDEAL_RESOLUTION) {
        Ok(source) => source,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Mirror state must be in place before the first render
    surface.write().set_mirrored(facing.is_mirrored());

    let detector: Option<Box<dyn LandmarkDetector>> = detector_config.as_ref().and_then(
        |config| match ExternalDetector::spawn(config) {
            Ok(d) => Some(Box::new(d) as Box<dyn LandmarkDetector>),
            Err(e) => {
                log.push(format!("Detector unavailable, overlays disabled: {e}"));
                None
            }
        },
    );

    let _ = ready_tx.send(Ok(()));

    pump_frames(
        &mut || source.read_frame(),
        &surface,
        detector,
        &cancel,
        &log,
        &event_tx,
    );

    source.close();
    state.write().running = false;
    tracing::info!("Frame loop stopped");
}

/// Read-detect-render until cancelled or the source stops delivering.
///
/// Each iteration is one blocking detect call, so detection is
/// one-in-flight and in capture order. A read failure is retried up to
/// `MAX_READ_FAILURES` times in a row to absorb transient decode
/// glitches; past that the stream is considered inactive and the loop
/// reports the error and returns so the caller can release the camera.
fn pump_frames(
    source: &mut dyn FnMut() -> Result<Frame, CaptureError>,
    surface: &RwLock<Compositor>,
    mut detector: Option<Box<dyn LandmarkDetector>>,
    cancel: &AtomicBool,
    log: &DebugLog,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    let mut read_failures = 0u32;

    while !cancel.load(Ordering::SeqCst) {
        match source() {
            Ok(frame) => {
                read_failures = 0;
                let mut hands = Vec::new();
                let mut detector_failed = false;
                if let Some(d) = detector.as_mut() {
                    match d.detect(&frame) {
                        Ok(detected) => hands = detected,
                        Err(e) => {
                            log.push(format!("Detector error, overlays disabled: {e}"));
                            detector_failed = true;
                        }
                    }
                }
                if detector_failed {
                    detector = None;
                }
                surface.write().render(&frame, &hands);
            }
            Err(e) => {
                read_failures += 1;
                tracing::debug!("Failed to capture frame: {:?}", e);
                if read_failures >= MAX_READ_FAILURES {
                    log.push(format!("Camera error, stopping stream: {e}"));
                    let _ = event_tx.send(SessionEvent::Error(e.to_string()));
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> Frame {
        Frame {
            width: 2,
            height: 2,
            data: vec![0u8; 16],
        }
    }

    #[test]
    fn test_persistent_camera_failure_stops_the_loop() {
        let surface = RwLock::new(Compositor::new(2, 2));
        let cancel = AtomicBool::new(false);
        let log = DebugLog::new();
        let (event_tx, mut event_rx) = broadcast::channel(16);

        let mut reads = 0u32;
        pump_frames(
            &mut || {
                reads += 1;
                Err(CaptureError::FrameFailed("device unplugged".to_string()))
            },
            &surface,
            None,
            &cancel,
            &log,
            &event_tx,
        );

        // Exits on its own after the failure threshold, without cancel
        assert_eq!(reads, MAX_READ_FAILURES);
        assert!(!cancel.load(Ordering::SeqCst));
        assert!(log
            .lines()
            .iter()
            .any(|l| l.contains("Camera error, stopping stream")));
        assert!(matches!(event_rx.try_recv(), Ok(SessionEvent::Error(_))));
    }

    #[test]
    fn test_transient_read_failures_are_absorbed() {
        let surface = RwLock::new(Compositor::new(2, 2));
        let cancel = AtomicBool::new(false);
        let log = DebugLog::new();
        let (event_tx, mut event_rx) = broadcast::channel(16);

        let mut reads = 0u32;
        pump_frames(
            &mut || {
                reads += 1;
                if reads < MAX_READ_FAILURES {
                    Err(CaptureError::FrameFailed("decode glitch".to_string()))
                } else {
                    cancel.store(true, Ordering::SeqCst);
                    Ok(test_frame())
                }
            },
            &surface,
            None,
            &cancel,
            &log,
            &event_tx,
        );

        // One good frame resets the failure count; no error is reported
        assert_eq!(reads, MAX_READ_FAILURES);
        assert!(event_rx.try_recv().is_err());
        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_stop_broadcasts_camera_stopped() {
        let surface = Arc::new(RwLock::new(Compositor::new(2, 2)));
        let log = Arc::new(DebugLog::new());
        let mut coordinator =
            SessionCoordinator::new(surface, None, FacingMode::User, log);
        let mut rx = coordinator.subscribe();

        coordinator.state.write().running = true;
        coordinator.stop();

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::CameraStopped)));
        assert!(!coordinator.is_running());

        // Stopping an idle session is silent
        coordinator.stop();
        assert!(rx.try_recv().is_err());
    }
}
