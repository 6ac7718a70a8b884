//! Scripted demo session against the simulated platform
//!
//! Starts the camera, records a few seconds, plays the recording back and
//! downloads it into the configured directory.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use webcam_recorder::media::DirectoryDownloads;
use webcam_recorder::platform::SimulatedPlatform;
use webcam_recorder::recorder::SessionEvent;
use webcam_recorder::ui::UiEvent;
use webcam_recorder::{App, RecorderConfig, SessionController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    webcam_recorder::init_tracing();
    tracing::info!("Starting webcam-recorder v{}", env!("CARGO_PKG_VERSION"));

    let config = RecorderConfig::from_env().context("Failed to load configuration")?;

    #[cfg(feature = "native-devices")]
    {
        use webcam_recorder::capture::{DeviceCatalog, NativeDeviceCatalog};
        match NativeDeviceCatalog.enumerate_devices().await {
            Ok(devices) => {
                for device in devices {
                    tracing::info!("Found {:?} '{}' ({})", device.kind, device.label, device.id);
                }
            }
            Err(e) => tracing::warn!("Native device enumeration failed: {}", e),
        }
    }

    let platform = SimulatedPlatform::default();
    let mut collaborators = platform.collaborators();
    collaborators.downloads = Arc::new(DirectoryDownloads::new(
        config.download_dir.clone(),
        platform.urls.clone(),
    ));

    let interval = config.chunk_interval();
    let controller = SessionController::new(config, collaborators);
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::Error(message) => tracing::error!("{}", message),
                other => tracing::info!("{:?}", other),
            }
        }
    });

    let (app, ui) = App::new(controller);
    let script = tokio::spawn(async move {
        let steps = [
            (UiEvent::SetWidth(Some(640)), Duration::ZERO),
            (UiEvent::SetHeight(Some(480)), Duration::ZERO),
            (UiEvent::ToggleCamera, Duration::ZERO),
            (UiEvent::ToggleRecording, interval * 3),
            (UiEvent::ToggleRecording, Duration::ZERO),
            (UiEvent::TogglePlayback, interval),
            (UiEvent::TogglePlayback, Duration::ZERO),
            (UiEvent::Download, Duration::from_millis(200)),
            (UiEvent::ToggleCamera, Duration::ZERO),
            (UiEvent::Quit, Duration::ZERO),
        ];
        for (event, wait) in steps {
            if ui.send(event).await.is_err() {
                break;
            }
            tokio::time::sleep(wait).await;
        }
    });

    let controller = app.run().await;
    script.await.context("Demo script panicked")?;

    let snapshot = serde_json::to_string_pretty(&controller.snapshot())?;
    tracing::info!("Final state:\n{}", snapshot);
    Ok(())
}
