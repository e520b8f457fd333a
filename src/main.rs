//! handtrace binary entry point

use clap::Parser;
use handtrace::capture::FacingMode;
use handtrace::compositor::Compositor;
use handtrace::detector::DetectorConfig;
use handtrace::recorder::RecordingPipeline;
use handtrace::session::SessionCoordinator;
use handtrace::shell::{DebugLog, Shell};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

/// Real-time hand-landmark overlay on a live camera feed,
/// recorded to a downloadable video file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Initial camera facing mode (user or environment)
    #[arg(long, default_value = "user")]
    facing: FacingMode,

    /// Output surface width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Output surface height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Directory recordings are saved to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// External hand-landmark detector command; omit to run without overlays
    #[arg(long)]
    detector_cmd: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    handtrace::init_tracing();
    let args = Args::parse();

    tracing::info!("Starting handtrace v{}", env!("CARGO_PKG_VERSION"));

    let log = Arc::new(DebugLog::new());

    let surface = Arc::new(RwLock::new(Compositor::new(args.width, args.height)));
    surface.write().set_mirrored(args.facing.is_mirrored());

    let detector_config = args.detector_cmd.map(DetectorConfig::new);
    let coordinator =
        SessionCoordinator::new(surface, detector_config, args.facing, log.clone());
    let pipeline = RecordingPipeline::new(args.output_dir);

    Shell::new(coordinator, pipeline, log).run().await?;
    Ok(())
}
