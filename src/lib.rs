//! handtrace - Real-time hand-landmark overlay on a live camera feed.
//!
//! Wires camera acquisition, an external hand-tracking detector,
//! surface compositing, and an FFmpeg recording pipeline together.

pub mod capture;
pub mod compositor;
pub mod detector;
pub mod recorder;
pub mod session;
pub mod shell;
pub mod utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handtrace=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
