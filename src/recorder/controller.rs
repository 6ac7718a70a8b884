//! Session controller
//!
//! Owns the capture stream, the recorder, the chunk buffer and the playback
//! URL, and enforces the order in which the page may use them:
//! `Idle -> Capturing -> Recording -> Capturing -> Idle`, with playback as an
//! orthogonal `Idle <-> Playing` state.

use super::channel::{RecorderEvent, RecorderEvents, RecorderFactory};
use super::encoding::select_mime_type;
use super::state::{
    CaptureSession, CaptureState, ChunkBuffer, PlaybackState, RecorderStatus, SessionEvent,
    SessionSnapshot,
};
use crate::capture::devices::apply_device_list;
use crate::capture::traits::{CaptureConstraints, CaptureSource, DeviceCatalog};
use crate::config::RecorderConfig;
use crate::media::blob::{Blob, ObjectUrl, ObjectUrlRegistry};
use crate::media::download::{download_filename, DownloadReceipt, DownloadSink};
use crate::media::playback::PlaybackSink;
use crate::ui::events::UiEvent;
use crate::ui::panel::{
    ControlPanel, PLAY, START_CAMERA, START_RECORDING, STOP_CAMERA, STOP_PLAYBACK,
    STOP_RECORDING,
};
use crate::utils::error::{AppError, AppResult};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Platform capabilities the controller drives
pub struct Collaborators {
    pub devices: Arc<dyn DeviceCatalog>,
    pub capture: Arc<dyn CaptureSource>,
    pub recorders: Arc<dyn RecorderFactory>,
    pub playback: Box<dyn PlaybackSink>,
    pub downloads: Arc<dyn DownloadSink>,
    pub urls: ObjectUrlRegistry,
}

pub struct SessionController {
    config: RecorderConfig,

    devices: Arc<dyn DeviceCatalog>,
    capture: Arc<dyn CaptureSource>,
    recorders: Arc<dyn RecorderFactory>,
    playback: Box<dyn PlaybackSink>,
    downloads: Arc<dyn DownloadSink>,
    urls: ObjectUrlRegistry,

    /// Open stream and its recorder, if any
    session: Option<CaptureSession>,

    /// Output of the latest recording; survives the end of the capture session
    buffer: ChunkBuffer,

    /// Object URL bound to the playback sink
    playback_url: Option<ObjectUrl>,

    panel: ControlPanel,

    recorder_tx: mpsc::UnboundedSender<RecorderEvent>,
    recorder_rx: mpsc::UnboundedReceiver<RecorderEvent>,

    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(config: RecorderConfig, collaborators: Collaborators) -> Self {
        let (recorder_tx, recorder_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(100);
        let panel = ControlPanel::new(&config);

        Self {
            config,
            devices: collaborators.devices,
            capture: collaborators.capture,
            recorders: collaborators.recorders,
            playback: collaborators.playback,
            downloads: collaborators.downloads,
            urls: collaborators.urls,
            session: None,
            buffer: ChunkBuffer::default(),
            playback_url: None,
            panel,
            recorder_tx,
            recorder_rx,
            event_tx,
        }
    }

    pub fn state(&self) -> CaptureState {
        match &self.session {
            None => CaptureState::Idle,
            Some(session) if session.is_recording() => CaptureState::Recording,
            Some(_) => CaptureState::Capturing,
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        if self.playback_url.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    pub fn panel(&self) -> &ControlPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut ControlPanel {
        &mut self.panel
    }

    pub fn buffer(&self) -> &ChunkBuffer {
        &self.buffer
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// The open capture session, if any
    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            playback: self.playback_state(),
            chunk_count: self.buffer.len(),
            total_bytes: self.buffer.total_bytes(),
            mime_type: if self.buffer.mime_type().is_empty() {
                None
            } else {
                Some(self.buffer.mime_type().to_string())
            },
            panel: self.panel.clone(),
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Report a failed platform call in the error region
    fn fail(&mut self, error: AppError) -> AppError {
        tracing::error!("{}", error);
        self.panel.error_message = error.to_string();
        self.emit(SessionEvent::Error(error.to_string()));
        error
    }

    /// Refuse an action that is not valid in the current state
    fn reject(&self, error: AppError) -> AppError {
        tracing::warn!("Rejected: {}", error);
        error
    }

    fn recorded_seconds(&self) -> u64 {
        (self.buffer.len() as u64).saturating_mul(self.config.chunk_interval_ms) / 1000
    }

    /// Re-enumerate devices, keeping selections that are still present
    pub async fn refresh_devices(&mut self) -> AppResult<()> {
        match self.load_devices().await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn load_devices(&mut self) -> AppResult<()> {
        let devices = self.devices.enumerate_devices().await?;

        apply_device_list(
            &devices,
            &mut self.panel.audio_source,
            &mut self.panel.video_source,
        );

        self.emit(SessionEvent::DevicesRefreshed {
            audio: self.panel.audio_source.options.len(),
            video: self.panel.video_source.options.len(),
        });
        Ok(())
    }

    /// Open a capture stream. Only valid while idle.
    pub async fn start_capture(&mut self, constraints: CaptureConstraints) -> AppResult<()> {
        let state = self.state();
        if state != CaptureState::Idle {
            return Err(self.reject(AppError::invalid("start capture", state)));
        }

        tracing::info!(
            "Using media constraints: {}",
            constraints.to_media_constraints()
        );

        let result = self.capture.acquire_stream(&constraints).await;
        let stream = match result {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e)),
        };

        tracing::info!(
            "Got stream {} with {} tracks",
            stream.id,
            stream.tracks.len()
        );

        self.playback.attach_live(&stream);
        let stream_id = stream.id;
        self.session = Some(CaptureSession::new(stream));

        self.panel.record_button.enabled = true;
        self.panel.camera_button.set_label(STOP_CAMERA);
        self.panel.info_message = "Camera started".to_string();
        self.panel.error_message.clear();

        self.emit(SessionEvent::CaptureStarted { stream_id });

        // Labels are only exposed once access has been granted
        if let Err(e) = self.load_devices().await {
            tracing::warn!("Device refresh after capture start failed: {}", e);
        }
        Ok(())
    }

    /// Close the capture stream, stopping an active recording first
    pub async fn stop_capture(&mut self) -> AppResult<()> {
        let state = self.state();
        if state == CaptureState::Idle {
            return Err(self.reject(AppError::invalid("stop capture", state)));
        }

        if state == CaptureState::Recording {
            if let Err(e) = self.stop_recording().await {
                tracing::warn!("Recording did not stop cleanly: {}", e);
            }
        }

        if let Some(session) = self.session.take() {
            self.playback.detach_live();
            tracing::info!("Releasing stream {}", session.stream.id);
            self.capture.release_stream(session.stream);
        }

        self.panel.record_button.enabled = false;
        self.panel.record_button.set_label(START_RECORDING);
        self.panel.camera_button.set_label(START_CAMERA);
        self.panel.info_message.clear();

        self.emit(SessionEvent::CaptureStopped);
        Ok(())
    }

    /// Start recording the open stream. Only valid while capturing.
    pub fn start_recording(&mut self) -> AppResult<()> {
        let stream = match &self.session {
            Some(session) if !session.is_recording() => session.stream.clone(),
            _ => return Err(self.reject(AppError::invalid("start recording", self.state()))),
        };

        // Playback and recording never run together
        self.stop_playback();

        let requested = select_mime_type(&self.config.mime_preferences, |mime| {
            self.recorders.is_type_supported(mime)
        })
        .to_string();

        let recording_id = Uuid::new_v4();
        let events = RecorderEvents::new(recording_id, self.recorder_tx.clone());

        let mut recorder = match self.recorders.create_recorder(&stream, &requested, events) {
            Ok(recorder) => recorder,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = recorder.start(self.config.chunk_interval()) {
            return Err(self.fail(e));
        }

        let mime_type = if recorder.mime_type().is_empty() {
            self.config.fallback_mime_type.clone()
        } else {
            recorder.mime_type().to_string()
        };
        tracing::info!(
            "Created recorder {} with mimeType '{}' ({})",
            recording_id,
            requested,
            mime_type
        );

        self.buffer.reset(&mime_type);
        if let Some(session) = self.session.as_mut() {
            session.recorder = Some(recorder);
            session.recorder_status = RecorderStatus::Recording;
            session.recording_id = Some(recording_id);
        }

        self.panel.record_button.set_label(STOP_RECORDING);
        self.panel.set_output_available(false);
        self.panel.info_message = format!("Record started ({})", requested);

        self.emit(SessionEvent::RecordingStarted { mime_type });
        Ok(())
    }

    /// Finalize the recorder. Only valid while recording.
    pub async fn stop_recording(&mut self) -> AppResult<()> {
        let state = self.state();
        if state != CaptureState::Recording {
            return Err(self.reject(AppError::invalid("stop recording", state)));
        }

        let recorder = self.session.as_mut().and_then(|s| s.recorder.take());
        let result = match recorder {
            Some(mut recorder) => recorder.stop().await,
            None => Ok(()),
        };

        // The recorder has sent its last chunk; pull everything still queued
        while let Ok(event) = self.recorder_rx.try_recv() {
            if let RecorderEvent::Chunk { recording_id, data } = event {
                self.on_chunk(recording_id, data);
            }
        }

        self.finish_recording();
        result.map_err(|e| self.fail(e))
    }

    fn finish_recording(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.recorder = None;
            session.recorder_status = RecorderStatus::Stopped;
        }

        let chunks = self.buffer.len();
        tracing::info!(
            "Recording stopped: {} chunks, {} bytes",
            chunks,
            self.buffer.total_bytes()
        );

        self.panel.record_button.set_label(START_RECORDING);
        self.panel.set_output_available(!self.buffer.is_empty());
        self.panel.info_message = format!("Record stopped ({} seconds)", self.recorded_seconds());

        self.emit(SessionEvent::RecordingStopped { chunks });
    }

    /// Append a chunk from the current recorder. Empty and stale chunks are dropped.
    pub fn on_chunk(&mut self, recording_id: Uuid, data: Vec<u8>) -> bool {
        let current = self
            .session
            .as_ref()
            .filter(|s| s.is_recording())
            .and_then(|s| s.recording_id);
        if current != Some(recording_id) {
            tracing::debug!("Discarding chunk from inactive recorder {}", recording_id);
            return false;
        }

        let size = data.len();
        if !self.buffer.push(data) {
            tracing::debug!("Ignoring empty chunk");
            return false;
        }

        tracing::debug!("Chunk {} ({} bytes)", self.buffer.len(), size);
        self.panel.info_message = format!("Recorded {} seconds", self.recorded_seconds());
        self.emit(SessionEvent::ChunkRecorded {
            count: self.buffer.len(),
            bytes: self.buffer.total_bytes(),
        });
        true
    }

    /// The recorder stopped on its own
    pub fn on_recorder_stopped(&mut self, recording_id: Uuid) {
        let is_current = self
            .session
            .as_ref()
            .map(|s| s.is_recording() && s.recording_id == Some(recording_id))
            .unwrap_or(false);

        if is_current {
            tracing::warn!("Recorder {} stopped unexpectedly", recording_id);
            self.finish_recording();
        } else {
            tracing::debug!("Recorder {} stopped", recording_id);
        }
    }

    pub fn handle_recorder_event(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::Chunk { recording_id, data } => {
                self.on_chunk(recording_id, data);
            }
            RecorderEvent::Stopped { recording_id } => self.on_recorder_stopped(recording_id),
        }
    }

    /// Wait for the next recorder event
    pub async fn next_recorder_event(&mut self) -> Option<RecorderEvent> {
        self.recorder_rx.recv().await
    }

    /// Apply every recorder event that is already queued
    pub fn pump_recorder_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.recorder_rx.try_recv() {
            self.handle_recorder_event(event);
            handled += 1;
        }
        handled
    }

    /// Play the recording. Needs recorded chunks and no active recording.
    pub fn start_playback(&mut self) -> AppResult<()> {
        if self.buffer.is_empty() {
            return Err(self.reject(AppError::EmptyRecording));
        }
        let state = self.state();
        if state == CaptureState::Recording {
            return Err(self.reject(AppError::invalid("start playback", state)));
        }
        if self.playback_url.is_some() {
            return Err(self.reject(AppError::invalid("start playback", "playing")));
        }

        let blob = Blob::from_chunks(self.buffer.chunks(), self.buffer.mime_type());
        let size = blob.size();
        let url = self.urls.create_object_url(blob);

        if let Err(e) = self.playback.load(&url).and_then(|_| self.playback.play()) {
            self.playback.unload();
            self.urls.revoke(&url);
            return Err(self.fail(e));
        }

        tracing::info!("Playing {} bytes from {}", size, url);
        self.playback_url = Some(url);
        self.panel.play_button.set_label(STOP_PLAYBACK);

        self.emit(SessionEvent::PlaybackStarted);
        Ok(())
    }

    /// Stop playback and release its URL. No-op when not playing.
    pub fn stop_playback(&mut self) {
        let Some(url) = self.playback_url.take() else {
            return;
        };

        self.playback.pause();
        self.playback.unload();
        self.urls.revoke(&url);
        self.panel.play_button.set_label(PLAY);

        tracing::info!("Playback stopped");
        self.emit(SessionEvent::PlaybackStopped);
    }

    pub fn toggle_playback(&mut self) -> AppResult<()> {
        match self.playback_state() {
            PlaybackState::Playing => {
                self.stop_playback();
                Ok(())
            }
            PlaybackState::Idle => self.start_playback(),
        }
    }

    /// Save the recording under a timestamped name
    ///
    /// The object URL is revoked after the configured delay so the save can
    /// start reading it.
    pub async fn download(&mut self) -> AppResult<DownloadReceipt> {
        if self.buffer.is_empty() {
            return Err(self.reject(AppError::EmptyRecording));
        }
        let state = self.state();
        if state == CaptureState::Recording {
            return Err(self.reject(AppError::invalid("download", state)));
        }

        let blob = Blob::from_chunks(self.buffer.chunks(), self.buffer.mime_type());
        let receipt = DownloadReceipt {
            filename: download_filename(Utc::now(), blob.mime_type()),
            size: blob.size(),
            mime_type: blob.mime_type().to_string(),
        };
        let url = self.urls.create_object_url(blob);

        let result = self.downloads.save(&url, &receipt.filename).await;

        let urls = self.urls.clone();
        let delay = self.config.download_release_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            urls.revoke(&url);
        });

        if let Err(e) = result {
            return Err(self.fail(e));
        }

        tracing::info!("Downloaded {} ({} bytes)", receipt.filename, receipt.size);
        self.emit(SessionEvent::Downloaded {
            filename: receipt.filename.clone(),
            size: receipt.size,
        });
        Ok(receipt)
    }

    /// Stop playback and capture
    pub async fn teardown(&mut self) {
        self.stop_playback();
        if self.session.is_some() {
            if let Err(e) = self.stop_capture().await {
                tracing::warn!("Teardown: {}", e);
            }
        }
    }

    /// Apply one UI event
    pub async fn dispatch(&mut self, event: UiEvent) -> AppResult<()> {
        tracing::debug!("Dispatching {:?}", event);
        match event {
            UiEvent::ToggleCamera => {
                if self.state() == CaptureState::Idle {
                    let constraints = self.panel.constraints();
                    self.start_capture(constraints).await
                } else {
                    self.stop_capture().await
                }
            }
            UiEvent::ToggleRecording => {
                if self.state() == CaptureState::Recording {
                    self.stop_recording().await
                } else {
                    self.start_recording()
                }
            }
            UiEvent::TogglePlayback => self.toggle_playback(),
            UiEvent::Download => self.download().await.map(|_| ()),
            UiEvent::RefreshDevices => self.refresh_devices().await,
            UiEvent::SelectAudioDevice(id) => {
                if !self.panel.audio_source.select(&id) {
                    tracing::warn!("Unknown microphone {}", id);
                }
                Ok(())
            }
            UiEvent::SelectVideoDevice(id) => {
                if !self.panel.video_source.select(&id) {
                    tracing::warn!("Unknown camera {}", id);
                }
                Ok(())
            }
            UiEvent::SetWidth(width) => {
                self.panel.width = width;
                Ok(())
            }
            UiEvent::SetHeight(height) => {
                self.panel.height = height;
                Ok(())
            }
            UiEvent::SetEchoCancellation(enabled) => {
                self.panel.echo_cancellation = enabled;
                Ok(())
            }
            UiEvent::Quit => {
                self.teardown().await;
                Ok(())
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(url) = self.playback_url.take() {
            self.playback.unload();
            self.urls.revoke(&url);
        }
        if let Some(session) = self.session.take() {
            self.playback.detach_live();
            self.capture.release_stream(session.stream);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::traits::{Device, DeviceKind};
    use crate::platform::{default_devices, SimulatedPlatform, SimulatedRecorders};
    use crate::utils::error::AcquisitionReason;
    use std::time::Duration;

    fn setup() -> (SimulatedPlatform, SessionController) {
        let platform = SimulatedPlatform::default();
        let controller = SessionController::new(RecorderConfig::default(), platform.collaborators());
        (platform, controller)
    }

    fn scenario_constraints() -> CaptureConstraints {
        CaptureConstraints {
            echo_cancellation: true,
            width: Some(640),
            height: Some(480),
            ..Default::default()
        }
    }

    fn recording_id(controller: &SessionController) -> Uuid {
        controller
            .session()
            .and_then(|s| s.recording_id)
            .expect("no active recording")
    }

    async fn record(controller: &mut SessionController, chunks: &[Vec<u8>]) {
        controller.start_recording().unwrap();
        let id = recording_id(controller);
        for chunk in chunks {
            controller.on_chunk(id, chunk.clone());
        }
        controller.stop_recording().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_record_download_scenario() {
        let (platform, mut controller) = setup();

        controller.start_capture(scenario_constraints()).await.unwrap();
        assert_eq!(controller.state(), CaptureState::Capturing);
        assert_eq!(platform.camera.last_constraints(), Some(scenario_constraints()));
        assert!(platform.playback.live_stream().is_some());
        assert!(controller.panel().record_button.enabled);
        assert_eq!(controller.panel().camera_button.label, STOP_CAMERA);

        controller.start_recording().unwrap();
        assert_eq!(controller.state(), CaptureState::Recording);
        assert!(controller.buffer().is_empty());
        assert!(!controller.panel().play_button.enabled);
        assert!(!controller.panel().download_button.enabled);

        let id = recording_id(&controller);
        for _ in 0..3 {
            assert!(controller.on_chunk(id, vec![7; 1024]));
        }
        assert_eq!(controller.buffer().len(), 3);

        controller.stop_recording().await.unwrap();
        assert_eq!(controller.state(), CaptureState::Capturing);
        assert!(controller.panel().play_button.enabled);
        assert!(controller.panel().download_button.enabled);
        assert_eq!(controller.panel().record_button.label, START_RECORDING);

        let receipt = controller.download().await.unwrap();
        assert_eq!(receipt.size, 3072);
        assert!(receipt.filename.ends_with(".webm"));

        let saved = platform.downloads.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].data.len(), 3072);
        assert_eq!(saved[0].filename, receipt.filename);

        // The download URL is released after a short delay, not immediately
        assert_eq!(platform.urls.live_count(), 1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(platform.urls.live_count(), 0);
        assert_eq!(platform.urls.totals(), (1, 1));
    }

    #[tokio::test]
    async fn test_permission_denied_stays_idle() {
        let (platform, mut controller) = setup();
        platform.camera.fail_with(Some(AcquisitionReason::PermissionDenied));

        let err = controller.start_capture(scenario_constraints()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::StreamAcquisition {
                reason: AcquisitionReason::PermissionDenied,
                ..
            }
        ));
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(controller.panel().error_message.contains("permission denied"));
        assert_eq!(controller.panel().camera_button.label, START_CAMERA);
        assert!(!controller.panel().record_button.enabled);
        assert_eq!(platform.camera.live_streams(), 0);

        // The user retries once access is granted
        platform.camera.fail_with(None);
        controller.start_capture(scenario_constraints()).await.unwrap();
        assert!(controller.panel().error_message.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_recording_while_idle_is_rejected() {
        let (platform, mut controller) = setup();

        let err = controller.start_recording().unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(platform.recorders.created(), 0);

        // A finished recording survives a rejected start
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![1; 10], vec![2; 10]]).await;
        controller.stop_capture().await.unwrap();

        assert!(controller.start_recording().is_err());
        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(controller.buffer().len(), 2);
        assert_eq!(platform.recorders.created(), 1);
        assert!(controller.panel().error_message.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_playback_is_idempotent() {
        let (platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![1; 16]]).await;

        controller.start_playback().unwrap();
        assert_eq!(controller.playback_state(), PlaybackState::Playing);
        assert!(platform.playback.is_playing());
        assert_eq!(platform.playback.loaded_bytes(), 16);
        assert_eq!(controller.panel().play_button.label, STOP_PLAYBACK);

        controller.stop_playback();
        controller.stop_playback();

        assert_eq!(controller.playback_state(), PlaybackState::Idle);
        assert!(!platform.playback.is_playing());
        assert!(platform.playback.source().is_none());
        assert_eq!(platform.urls.totals(), (1, 1));
        assert_eq!(controller.panel().play_button.label, PLAY);
    }

    #[tokio::test]
    async fn test_playback_and_download_need_chunks() {
        let (platform, mut controller) = setup();
        assert!(matches!(
            controller.start_playback(),
            Err(AppError::EmptyRecording)
        ));
        assert!(matches!(
            controller.download().await,
            Err(AppError::EmptyRecording)
        ));
        assert_eq!(platform.urls.totals(), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_failure_revokes_url() {
        let (platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![1; 4]]).await;

        platform.playback.fail_play(true);
        assert!(matches!(
            controller.start_playback(),
            Err(AppError::Playback(_))
        ));
        assert_eq!(controller.playback_state(), PlaybackState::Idle);
        assert_eq!(controller.panel().play_button.label, PLAY);
        assert!(controller
            .panel()
            .error_message
            .contains("Media element refused to play"));
        assert!(platform.playback.source().is_none());
        assert_eq!(platform.urls.totals(), (1, 1));
        assert_eq!(platform.urls.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_failure_still_revokes_url() {
        let (platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![1; 4]]).await;

        platform.downloads.fail_with(Some("disk full"));
        assert!(matches!(
            controller.download().await,
            Err(AppError::Download(_))
        ));
        assert!(controller.panel().error_message.contains("disk full"));
        assert!(platform.downloads.saved().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(platform.urls.totals(), (1, 1));
        assert_eq!(platform.urls.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorded_seconds_saturate() {
        let platform = SimulatedPlatform::default();
        let config = RecorderConfig {
            chunk_interval_ms: u64::MAX / 2,
            ..Default::default()
        };
        let mut controller = SessionController::new(config, platform.collaborators());
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![1; 4], vec![2; 4], vec![3; 4]]).await;

        assert_eq!(
            controller.panel().info_message,
            format!("Record stopped ({} seconds)", u64::MAX / 1000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_without_chunks_keeps_output_disabled() {
        let (_platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[]).await;

        assert_eq!(controller.state(), CaptureState::Capturing);
        assert!(!controller.panel().play_button.enabled);
        assert!(!controller.panel().download_button.enabled);
        assert!(controller.start_playback().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_stops_playback_and_blocks_it() {
        let (platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![1; 4]]).await;
        controller.start_playback().unwrap();

        controller.start_recording().unwrap();
        assert_eq!(controller.playback_state(), PlaybackState::Idle);
        assert_eq!(platform.urls.live_count(), 0);

        let id = recording_id(&controller);
        controller.on_chunk(id, vec![2; 4]);
        assert!(matches!(
            controller.start_playback(),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(controller.download().await.is_err());
        assert!(platform.downloads.saved().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_capture_stops_recording_and_releases_stream() {
        let (platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        controller.start_recording().unwrap();
        let id = recording_id(&controller);
        controller.on_chunk(id, vec![9; 32]);

        controller.stop_capture().await.unwrap();

        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(platform.camera.live_streams(), 0);
        assert_eq!(platform.camera.releases(), 1);
        assert!(platform.playback.live_stream().is_none());
        assert!(!controller.panel().record_button.enabled);
        assert_eq!(controller.panel().camera_button.label, START_CAMERA);
        assert!(controller.panel().info_message.is_empty());

        // The recording is still there after the camera is off
        assert_eq!(controller.buffer().len(), 1);
        assert!(controller.panel().download_button.enabled);
        controller.start_playback().unwrap();

        assert!(controller.stop_capture().await.is_err());
        assert_eq!(platform.camera.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_order_and_filtering() {
        let (platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        controller.start_recording().unwrap();
        let id = recording_id(&controller);

        assert!(controller.on_chunk(id, vec![1, 1]));
        assert!(!controller.on_chunk(id, Vec::new()));
        assert!(!controller.on_chunk(Uuid::new_v4(), vec![9, 9]));
        assert!(controller.on_chunk(id, vec![2]));
        assert!(controller.on_chunk(id, vec![3, 3, 3]));
        controller.stop_recording().await.unwrap();

        // Late chunks from the finished recorder are dropped
        assert!(!controller.on_chunk(id, vec![4]));

        controller.download().await.unwrap();
        assert_eq!(platform.downloads.saved()[0].data, vec![1, 1, 2, 3, 3, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_recording_resets_buffer() {
        let (_platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![1; 8], vec![2; 8]]).await;
        let first = recording_id(&controller);

        controller.start_recording().unwrap();
        assert!(controller.buffer().is_empty());
        assert!(!controller.on_chunk(first, vec![1; 8]));
        assert_ne!(recording_id(&controller), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_construction_failure_stays_capturing() {
        let (platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![5; 8]]).await;

        platform.recorders.fail_with(Some("encoder unavailable"));
        let err = controller.start_recording().unwrap_err();

        assert!(matches!(err, AppError::RecorderConstruction(_)));
        assert_eq!(controller.state(), CaptureState::Capturing);
        assert!(controller.panel().error_message.contains("encoder unavailable"));
        assert_eq!(controller.panel().record_button.label, START_RECORDING);
        assert_eq!(controller.buffer().len(), 1);
        assert!(controller.panel().play_button.enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_encoding_preference_and_fallback() {
        let (platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        controller.start_recording().unwrap();
        assert_eq!(platform.recorders.requested(), vec!["video/webm;codecs=vp9"]);
        assert_eq!(controller.buffer().mime_type(), "video/webm;codecs=vp9");
        assert_eq!(
            controller.panel().info_message,
            "Record started (video/webm;codecs=vp9)"
        );

        let mut platform = SimulatedPlatform::default();
        platform.recorders = SimulatedRecorders::new(&[]);
        let mut controller = SessionController::new(RecorderConfig::default(), platform.collaborators());
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        controller.start_recording().unwrap();
        assert_eq!(platform.recorders.requested(), vec![""]);
        assert_eq!(controller.buffer().mime_type(), "video/webm");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_chunks_update_info() {
        let (_platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        controller.start_recording().unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(controller.pump_recorder_events(), 2);
        assert_eq!(controller.buffer().len(), 2);
        assert_eq!(controller.panel().info_message, "Recorded 2 seconds");

        controller.stop_recording().await.unwrap();
        assert_eq!(controller.panel().info_message, "Record stopped (2 seconds)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_recorder_stop() {
        let (_platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        controller.start_recording().unwrap();
        let id = recording_id(&controller);
        controller.on_chunk(id, vec![1; 8]);

        controller.handle_recorder_event(RecorderEvent::Stopped { recording_id: id });
        assert_eq!(controller.state(), CaptureState::Capturing);
        assert!(controller.panel().play_button.enabled);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_selectors() {
        let (platform, mut controller) = setup();
        controller.refresh_devices().await.unwrap();
        assert_eq!(controller.panel().audio_source.options.len(), 1);

        platform.devices.fail_with(Some("enumeration refused"));
        assert!(matches!(
            controller.refresh_devices().await,
            Err(AppError::DeviceEnumeration(_))
        ));
        assert_eq!(controller.panel().audio_source.options.len(), 1);
        assert!(controller.panel().error_message.contains("enumeration refused"));
    }

    #[tokio::test]
    async fn test_labels_refresh_after_capture_start() {
        let (platform, mut controller) = setup();
        platform.devices.set_devices(vec![
            Device::new("mic-builtin", DeviceKind::AudioInput, ""),
            Device::new("cam-integrated", DeviceKind::VideoInput, ""),
        ]);
        controller.refresh_devices().await.unwrap();
        assert_eq!(controller.panel().audio_source.options[0].label, "microphone 1");
        assert_eq!(controller.panel().video_source.options[0].label, "camera 1");

        // Access granted, labels become visible
        platform.devices.set_devices(default_devices());
        controller.dispatch(UiEvent::ToggleCamera).await.unwrap();

        assert_eq!(controller.state(), CaptureState::Capturing);
        assert_eq!(
            controller.panel().audio_source.options[0].label,
            "Built-in Microphone"
        );
        assert_eq!(
            controller.panel().video_source.options[0].label,
            "Integrated Camera"
        );
        assert_eq!(controller.panel().video_source.value(), Some("cam-integrated"));
    }

    #[tokio::test]
    async fn test_refresh_failure_after_capture_start_keeps_capturing() {
        let (platform, mut controller) = setup();
        platform.devices.fail_with(Some("enumeration refused"));

        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        assert_eq!(controller.state(), CaptureState::Capturing);
        assert_eq!(controller.panel().info_message, "Camera started");
        assert!(controller.panel().error_message.is_empty());
        assert_eq!(platform.camera.live_streams(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_uses_panel_selection() {
        let (platform, mut controller) = setup();
        controller.dispatch(UiEvent::RefreshDevices).await.unwrap();
        controller.dispatch(UiEvent::SetWidth(Some(1280))).await.unwrap();
        controller.dispatch(UiEvent::SetHeight(Some(720))).await.unwrap();
        controller.dispatch(UiEvent::SetEchoCancellation(false)).await.unwrap();
        controller
            .dispatch(UiEvent::SelectVideoDevice("not-a-camera".to_string()))
            .await
            .unwrap();
        controller.dispatch(UiEvent::ToggleCamera).await.unwrap();

        let constraints = platform.camera.last_constraints().unwrap();
        assert_eq!(constraints.video_device_id.as_deref(), Some("cam-integrated"));
        assert_eq!(constraints.audio_device_id.as_deref(), Some("mic-builtin"));
        assert_eq!(constraints.width, Some(1280));
        assert_eq!(constraints.height, Some(720));
        assert!(!constraints.echo_cancellation);

        controller.dispatch(UiEvent::ToggleCamera).await.unwrap();
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_are_broadcast() {
        let (_platform, mut controller) = setup();
        let mut events = controller.subscribe();

        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![1; 4]]).await;

        assert!(matches!(events.recv().await.unwrap(), SessionEvent::CaptureStarted { .. }));
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::DevicesRefreshed { audio: 1, video: 1 }
        );
        assert!(matches!(events.recv().await.unwrap(), SessionEvent::RecordingStarted { .. }));
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::ChunkRecorded { count: 1, bytes: 4 }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::RecordingStopped { chunks: 1 }
        );

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, CaptureState::Capturing);
        assert_eq!(snapshot.chunk_count, 1);
        assert_eq!(snapshot.total_bytes, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_stream_and_playback_url() {
        let (platform, mut controller) = setup();
        controller.start_capture(CaptureConstraints::default()).await.unwrap();
        record(&mut controller, &[vec![1; 4]]).await;
        controller.start_playback().unwrap();

        drop(controller);
        assert_eq!(platform.camera.live_streams(), 0);
        assert_eq!(platform.urls.live_count(), 0);
    }

    #[derive(Debug, Clone, Copy)]
    enum Action {
        StartCapture,
        StopCapture,
        StartRecording,
        StopRecording,
        StartPlayback,
        StopPlayback,
        Download,
    }

    const ACTIONS: [Action; 7] = [
        Action::StartCapture,
        Action::StopCapture,
        Action::StartRecording,
        Action::StopRecording,
        Action::StartPlayback,
        Action::StopPlayback,
        Action::Download,
    ];

    async fn apply(controller: &mut SessionController, action: Action) {
        let _ = match action {
            Action::StartCapture => controller.start_capture(CaptureConstraints::default()).await,
            Action::StopCapture => controller.stop_capture().await,
            Action::StartRecording => controller.start_recording(),
            Action::StopRecording => {
                if let Some(id) = controller.session().and_then(|s| s.recording_id) {
                    controller.on_chunk(id, vec![1; 8]);
                }
                controller.stop_recording().await
            }
            Action::StartPlayback => controller.start_playback(),
            Action::StopPlayback => {
                controller.stop_playback();
                Ok(())
            }
            Action::Download => controller.download().await.map(|_| ()),
        };
    }

    fn check_invariants(platform: &SimulatedPlatform, controller: &SessionController) {
        let state = controller.state();
        let expected_streams = usize::from(state != CaptureState::Idle);
        assert_eq!(platform.camera.live_streams(), expected_streams);

        if controller.playback_state() == PlaybackState::Playing {
            assert!(!controller.buffer().is_empty());
            assert_ne!(state, CaptureState::Recording);
        }
        if state == CaptureState::Recording {
            assert!(!controller.panel().play_button.enabled);
            assert!(!controller.panel().download_button.enabled);
        }
        if controller.panel().play_button.enabled {
            assert!(!controller.buffer().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invariants_hold_for_all_short_sequences() {
        let n = ACTIONS.len();
        for index in 0..n.pow(4) {
            let (platform, mut controller) = setup();
            let mut rest = index;
            for _ in 0..4 {
                apply(&mut controller, ACTIONS[rest % n]).await;
                rest /= n;
                check_invariants(&platform, &controller);
            }

            tokio::time::sleep(Duration::from_millis(200)).await;
            let playing = usize::from(controller.playback_state() == PlaybackState::Playing);
            assert_eq!(platform.urls.live_count(), playing);
        }
    }
}
