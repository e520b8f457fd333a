//! Capture-to-file pipeline
//!
//! Samples the composited surface at a fixed frame rate, feeds raw RGBA
//! frames to an FFmpeg encoder child, and drains the encoded stream into
//! an ordered fragment buffer. Stopping finalizes the encoder and
//! concatenates the fragments into one timestamped output file.

use crate::compositor::Compositor;
use crate::recorder::encoding::{self, EncodingFormat};
use crate::recorder::state::{RecordingError, RecordingState, RecordingSummary};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Surface sampling rate
pub const CAPTURE_FPS: u32 = 30;

/// Encoder target bitrate in bits per second
pub const VIDEO_BITRATE: u32 = 2_500_000;

/// Encoded fragment boundary
const FRAGMENT_INTERVAL: Duration = Duration::from_secs(1);

/// Records the output surface to a file through FFmpeg.
///
/// At most one recording session is active at a time; starting while
/// recording fails with `AlreadyRecording`.
pub struct RecordingPipeline {
    state: RecordingState,
    output_dir: PathBuf,
    format: Option<EncodingFormat>,
    fragments: Arc<Mutex<Vec<Vec<u8>>>>,
    sampling: Arc<AtomicBool>,
    sampler: Option<std::thread::JoinHandle<u64>>,
    reader: Option<std::thread::JoinHandle<()>>,
    process: Option<Child>,
    started_at: Option<Instant>,
}

impl RecordingPipeline {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: RecordingState::Idle,
            output_dir: output_dir.into(),
            format: None,
            fragments: Arc::new(Mutex::new(Vec::new())),
            sampling: Arc::new(AtomicBool::new(false)),
            sampler: None,
            reader: None,
            process: None,
            started_at: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Start recording the given surface.
    ///
    /// Resets the fragment buffer, picks the first supported encoding
    /// format, spawns the encoder, and starts the sampler and fragment
    /// reader threads.
    pub fn start(&mut self, surface: Arc<RwLock<Compositor>>) -> Result<(), RecordingError> {
        if self.is_recording() {
            return Err(RecordingError::AlreadyRecording);
        }

        self.reset_fragments();

        let format = encoding::detect_format()?;
        let (width, height) = {
            let surface = surface.read();
            (surface.width(), surface.height())
        };

        let mut process = spawn_encoder(format, width, height)?;
        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| RecordingError::Ffmpeg("Failed to capture FFmpeg stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| RecordingError::Ffmpeg("Failed to capture FFmpeg stdout".to_string()))?;

        self.sampling.store(true, Ordering::SeqCst);

        // Sampler: push surface snapshots to the encoder at a fixed rate
        let sampling = self.sampling.clone();
        let sampler = std::thread::spawn(move || {
            sample_surface(surface, stdin, sampling, width, height, CAPTURE_FPS)
        });

        // Reader: drain encoded output into ~1s fragments
        let fragments = self.fragments.clone();
        let reader = std::thread::spawn(move || read_fragments(stdout, fragments));

        self.format = Some(format);
        self.process = Some(process);
        self.sampler = Some(sampler);
        self.reader = Some(reader);
        self.started_at = Some(Instant::now());
        self.state = RecordingState::Recording;

        tracing::info!(
            "Recording started: {}x{} @ {}fps, {} bit/s, format {}",
            width,
            height,
            CAPTURE_FPS,
            VIDEO_BITRATE,
            format
        );
        Ok(())
    }

    /// Stop recording and assemble the output file.
    ///
    /// Finalizes the encoder, concatenates all buffered fragments into
    /// `hand-detection-<timestamp>.<ext>` in the output directory, and
    /// clears the buffer.
    pub fn stop(&mut self) -> Result<RecordingSummary, RecordingError> {
        if !self.is_recording() {
            return Err(RecordingError::NotRecording);
        }

        self.sampling.store(false, Ordering::SeqCst);

        let mut frames_written = 0;
        if let Some(sampler) = self.sampler.take() {
            // Joining drops the encoder's stdin, which signals EOF
            frames_written = sampler.join().unwrap_or(0);
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        if let Some(mut process) = self.process.take() {
            let status = process
                .wait()
                .map_err(|e| RecordingError::Ffmpeg(format!("Failed to wait for FFmpeg: {e}")))?;
            if !status.success() {
                tracing::warn!("FFmpeg encoder exited with status {}", status);
            }
        }

        let duration_ms = self
            .started_at
            .take()
            .map(|t| t.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0);

        // AlreadyRecording guard above means format is always set here
        let format = self.format.take().ok_or(RecordingError::NotRecording)?;

        let fragments = self.take_fragments();
        let fragment_count = fragments.len();

        std::fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_dir.join(output_filename(format, Utc::now()));
        let total_bytes = assemble_fragments(&fragments, &output_path)?;

        self.state = RecordingState::Idle;

        tracing::info!(
            "Recording saved: {:?} ({} fragments, {} bytes, {} frames, {:.0}ms)",
            output_path,
            fragment_count,
            total_bytes,
            frames_written,
            duration_ms
        );

        Ok(RecordingSummary {
            output_path: output_path.to_string_lossy().to_string(),
            format: format.identifier().to_string(),
            duration_ms,
            fragment_count,
            total_bytes,
        })
    }

    /// Format of the active recording, if one is in progress
    pub fn current_format(&self) -> Option<EncodingFormat> {
        self.format
    }

    /// Number of fragments currently buffered
    pub fn buffered_fragments(&self) -> usize {
        self.fragments.lock().len()
    }

    /// Discard any fragments left over from a previous recording
    fn reset_fragments(&mut self) {
        self.fragments.lock().clear();
    }

    /// Drain the fragment buffer, leaving it empty
    fn take_fragments(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.fragments.lock())
    }
}

impl Drop for RecordingPipeline {
    fn drop(&mut self) {
        self.sampling.store(false, Ordering::SeqCst);
        if let Some(mut process) = self.process.take() {
            let _ = process.kill();
        }
    }
}

/// Spawn the FFmpeg encoder child for the chosen format
fn spawn_encoder(
    format: EncodingFormat,
    width: u32,
    height: u32,
) -> Result<Child, RecordingError> {
    let mut args = vec![
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-s".to_string(),
        format!("{width}x{height}"),
        "-r".to_string(),
        CAPTURE_FPS.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-c:v".to_string(),
        format.video_codec().to_string(),
        "-b:v".to_string(),
        VIDEO_BITRATE.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ];

    match format {
        EncodingFormat::Webm | EncodingFormat::WebmVp8 => {
            // Keep VP8/VP9 encoding real-time
            args.extend(["-deadline".to_string(), "realtime".to_string()]);
        }
        EncodingFormat::WebmH264 => {
            args.extend(["-preset".to_string(), "veryfast".to_string()]);
        }
        EncodingFormat::Mp4 => {
            // Fragmented mp4 so the muxer can write to a pipe
            args.extend([
                "-preset".to_string(),
                "veryfast".to_string(),
                "-movflags".to_string(),
                "frag_keyframe+empty_moov".to_string(),
            ]);
        }
    }

    args.extend(["-f".to_string(), format.muxer().to_string(), "-".to_string()]);

    tracing::debug!("Starting FFmpeg encoder: {:?}", args);

    Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| RecordingError::Ffmpeg(format!("Failed to start FFmpeg encoder: {e}")))
}

/// Sampler thread body: write one surface snapshot per tick until
/// sampling is cleared. Returns the number of frames written.
fn sample_surface(
    surface: Arc<RwLock<Compositor>>,
    mut stdin: std::process::ChildStdin,
    sampling: Arc<AtomicBool>,
    width: u32,
    height: u32,
    fps: u32,
) -> u64 {
    let frame_len = (width * height * 4) as usize;
    let mut buf = vec![0u8; frame_len];
    let interval = Duration::from_secs_f64(1.0 / fps as f64);
    let mut next = Instant::now();
    let mut frames: u64 = 0;

    while sampling.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now < next {
            std::thread::sleep(next - now);
        }
        next += interval;

        {
            let surface = surface.read();
            // A mid-recording resize changes the byte length; keep
            // feeding the last matching snapshot so the stream stays valid
            if surface.data().len() == frame_len {
                buf.copy_from_slice(surface.data());
            }
        }

        if stdin.write_all(&buf).is_err() {
            tracing::warn!("FFmpeg stdin closed, stopping sampler");
            break;
        }
        frames += 1;
    }

    frames
}

/// Reader thread body: accumulate encoder output, pushing a fragment
/// roughly every second. Empty fragments are never pushed.
fn read_fragments(mut stdout: std::process::ChildStdout, fragments: Arc<Mutex<Vec<Vec<u8>>>>) {
    let mut current: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 32 * 1024];
    let mut last_boundary = Instant::now();

    loop {
        match stdout.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                current.extend_from_slice(&chunk[..n]);
                if last_boundary.elapsed() >= FRAGMENT_INTERVAL && !current.is_empty() {
                    fragments.lock().push(std::mem::take(&mut current));
                    last_boundary = Instant::now();
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("Error reading encoder output: {e}");
                break;
            }
        }
    }

    if !current.is_empty() {
        fragments.lock().push(current);
    }
}

/// Output filename: `hand-detection-<ISO-8601 timestamp>.<ext>`
fn output_filename(format: EncodingFormat, now: chrono::DateTime<Utc>) -> String {
    format!(
        "hand-detection-{}.{}",
        now.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        format.extension()
    )
}

/// Concatenate fragments into one file, returning the byte count
fn assemble_fragments(fragments: &[Vec<u8>], path: &Path) -> Result<u64, RecordingError> {
    let mut file = std::fs::File::create(path)?;
    let mut total: u64 = 0;
    for fragment in fragments {
        file.write_all(fragment)?;
        total += fragment.len() as u64;
    }
    file.flush()?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_output_filename_timestamped() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 30, 12, 34, 56).unwrap();
        assert_eq!(
            output_filename(EncodingFormat::Webm, ts),
            "hand-detection-2026-08-30T12:34:56.000Z.webm"
        );
        assert_eq!(
            output_filename(EncodingFormat::Mp4, ts),
            "hand-detection-2026-08-30T12:34:56.000Z.mp4"
        );
    }

    #[test]
    fn test_assemble_concatenates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.webm");

        let fragments = vec![b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()];
        let total = assemble_fragments(&fragments, &path).unwrap();

        assert_eq!(total, 7);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdefg");
    }

    #[test]
    fn test_assemble_empty_buffer_gives_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.webm");

        let total = assemble_fragments(&[], &path).unwrap();
        assert_eq!(total, 0);
        assert!(std::fs::read(&path).unwrap().is_empty());
    }

    #[test]
    fn test_start_reset_discards_stale_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = RecordingPipeline::new(dir.path());

        pipeline.fragments.lock().push(b"stale".to_vec());
        assert_eq!(pipeline.buffered_fragments(), 1);

        pipeline.reset_fragments();
        assert_eq!(pipeline.buffered_fragments(), 0);
    }

    #[test]
    fn test_stop_drains_the_fragment_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = RecordingPipeline::new(dir.path());

        pipeline
            .fragments
            .lock()
            .extend([b"abc".to_vec(), b"def".to_vec()]);

        let taken = pipeline.take_fragments();
        assert_eq!(taken, vec![b"abc".to_vec(), b"def".to_vec()]);
        assert_eq!(pipeline.buffered_fragments(), 0);
    }

    #[test]
    fn test_stop_without_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = RecordingPipeline::new(dir.path());
        assert!(matches!(
            pipeline.stop(),
            Err(RecordingError::NotRecording)
        ));
        assert_eq!(pipeline.state(), RecordingState::Idle);
    }
}
