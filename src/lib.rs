//! Webcam Recorder - pick a camera and microphone, preview, record, play back
//! and download.
//!
//! The platform does the real work (device enumeration, capture, encoding,
//! rendering). This crate coordinates it: [`recorder::SessionController`] owns
//! the capture session and the recorded chunks, and [`app::App`] feeds it UI
//! and recorder events one at a time.

pub mod app;
pub mod capture;
pub mod config;
pub mod media;
pub mod platform;
pub mod recorder;
pub mod ui;
pub mod utils;

pub use app::App;
pub use config::RecorderConfig;
pub use recorder::{Collaborators, SessionController};
pub use utils::error::{AppError, AppResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webcam_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
