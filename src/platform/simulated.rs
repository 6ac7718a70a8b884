//! In-memory platform
//!
//! Every collaborator of the controller, backed by shared state so a test (or
//! the demo) can keep a handle, inject failures and inspect what happened.

use crate::capture::traits::{
    CaptureConstraints, CaptureSource, Device, DeviceCatalog, DeviceKind, MediaTrack,
    StreamHandle,
};
use crate::media::blob::{ObjectUrl, ObjectUrlRegistry};
use crate::media::download::DownloadSink;
use crate::media::playback::PlaybackSink;
use crate::recorder::channel::{MediaRecorder, RecorderEvents, RecorderFactory};
use crate::recorder::controller::Collaborators;
use crate::recorder::state::RecorderStatus;
use crate::utils::error::{AcquisitionReason, AppError, AppResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A microphone, a camera and a speaker
pub fn default_devices() -> Vec<Device> {
    vec![
        Device::new("mic-builtin", DeviceKind::AudioInput, "Built-in Microphone"),
        Device::new("cam-integrated", DeviceKind::VideoInput, "Integrated Camera"),
        Device::new("speaker-builtin", DeviceKind::AudioOutput, "Built-in Speakers"),
    ]
}

#[derive(Debug, Default)]
struct DevicesInner {
    devices: Vec<Device>,
    failure: Option<String>,
}

/// Device catalog over a mutable list
#[derive(Debug, Clone, Default)]
pub struct SimulatedDevices {
    inner: Arc<Mutex<DevicesInner>>,
}

impl SimulatedDevices {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DevicesInner {
                devices,
                failure: None,
            })),
        }
    }

    pub fn set_devices(&self, devices: Vec<Device>) {
        self.inner.lock().devices = devices;
    }

    pub fn devices(&self) -> Vec<Device> {
        self.inner.lock().devices.clone()
    }

    pub fn fail_with(&self, message: Option<&str>) {
        self.inner.lock().failure = message.map(str::to_string);
    }
}

#[async_trait]
impl DeviceCatalog for SimulatedDevices {
    async fn enumerate_devices(&self) -> AppResult<Vec<Device>> {
        let inner = self.inner.lock();
        if let Some(message) = &inner.failure {
            return Err(AppError::DeviceEnumeration(message.clone()));
        }
        Ok(inner.devices.clone())
    }
}

#[derive(Debug, Default)]
struct CameraInner {
    failure: Option<AcquisitionReason>,
    live: HashSet<Uuid>,
    released: usize,
    last_constraints: Option<CaptureConstraints>,
}

/// Capture source that opens streams on the devices of a [`SimulatedDevices`]
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    devices: SimulatedDevices,
    inner: Arc<Mutex<CameraInner>>,
}

impl SimulatedCamera {
    pub fn new(devices: SimulatedDevices) -> Self {
        Self {
            devices,
            inner: Arc::default(),
        }
    }

    /// Make the next acquisitions fail
    pub fn fail_with(&self, reason: Option<AcquisitionReason>) {
        self.inner.lock().failure = reason;
    }

    /// Streams acquired and not yet released
    pub fn live_streams(&self) -> usize {
        self.inner.lock().live.len()
    }

    pub fn releases(&self) -> usize {
        self.inner.lock().released
    }

    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.inner.lock().last_constraints.clone()
    }

    fn pick(
        devices: &[Device],
        kind: DeviceKind,
        requested: Option<&str>,
    ) -> AppResult<Option<String>> {
        let mut candidates = devices.iter().filter(|d| d.kind == kind);
        match requested {
            Some(id) => candidates
                .find(|d| d.id == id)
                .map(|d| Some(d.id.clone()))
                .ok_or_else(|| AppError::StreamAcquisition {
                    reason: AcquisitionReason::ConstraintUnsatisfiable,
                    message: format!("No {:?} device with id {}", kind, id),
                }),
            None => Ok(candidates.next().map(|d| d.id.clone())),
        }
    }
}

#[async_trait]
impl CaptureSource for SimulatedCamera {
    async fn acquire_stream(&self, constraints: &CaptureConstraints) -> AppResult<StreamHandle> {
        let devices = self.devices.devices();
        let mut inner = self.inner.lock();
        inner.last_constraints = Some(constraints.clone());

        if let Some(reason) = inner.failure {
            return Err(AppError::StreamAcquisition {
                reason,
                message: "simulated failure".to_string(),
            });
        }

        let audio = Self::pick(
            &devices,
            DeviceKind::AudioInput,
            constraints.audio_device_id.as_deref(),
        )?;
        let video = Self::pick(
            &devices,
            DeviceKind::VideoInput,
            constraints.video_device_id.as_deref(),
        )?;

        let tracks: Vec<MediaTrack> = [(DeviceKind::AudioInput, audio), (DeviceKind::VideoInput, video)]
            .into_iter()
            .filter_map(|(kind, device)| {
                device.map(|device_id| MediaTrack {
                    id: Uuid::new_v4(),
                    kind,
                    device_id,
                })
            })
            .collect();

        if tracks.is_empty() {
            return Err(AppError::StreamAcquisition {
                reason: AcquisitionReason::ConstraintUnsatisfiable,
                message: "No capture devices available".to_string(),
            });
        }

        let stream = StreamHandle::new(tracks);
        inner.live.insert(stream.id);
        Ok(stream)
    }

    fn release_stream(&self, stream: StreamHandle) {
        let mut inner = self.inner.lock();
        if inner.live.remove(&stream.id) {
            inner.released += 1;
            for track in &stream.tracks {
                tracing::debug!("Stopped track {} on {}", track.id, track.device_id);
            }
        } else {
            tracing::warn!("Stream {} released twice", stream.id);
        }
    }
}

#[derive(Debug)]
struct RecordersInner {
    supported: Vec<String>,
    failure: Option<String>,
    chunk_size: usize,
    final_chunk_size: usize,
    created: usize,
    requested: Vec<String>,
}

/// Recorder factory emitting synthetic chunks on a tokio interval
#[derive(Debug, Clone)]
pub struct SimulatedRecorders {
    inner: Arc<Mutex<RecordersInner>>,
}

impl Default for SimulatedRecorders {
    fn default() -> Self {
        Self::new(&["video/webm;codecs=vp9", "video/webm;codecs=vp8", "video/webm"])
    }
}

impl SimulatedRecorders {
    pub fn new(supported: &[&str]) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RecordersInner {
                supported: supported.iter().map(|s| s.to_string()).collect(),
                failure: None,
                chunk_size: 1024,
                final_chunk_size: 0,
                created: 0,
                requested: Vec::new(),
            })),
        }
    }

    pub fn fail_with(&self, message: Option<&str>) {
        self.inner.lock().failure = message.map(str::to_string);
    }

    /// Bytes per timed chunk and in the chunk flushed on stop
    pub fn set_chunk_sizes(&self, chunk_size: usize, final_chunk_size: usize) {
        let mut inner = self.inner.lock();
        inner.chunk_size = chunk_size;
        inner.final_chunk_size = final_chunk_size;
    }

    pub fn created(&self) -> usize {
        self.inner.lock().created
    }

    /// MIME types passed to `create_recorder`, in order
    pub fn requested(&self) -> Vec<String> {
        self.inner.lock().requested.clone()
    }
}

impl RecorderFactory for SimulatedRecorders {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.inner.lock().supported.iter().any(|m| m == mime_type)
    }

    fn create_recorder(
        &self,
        stream: &StreamHandle,
        mime_type: &str,
        events: RecorderEvents,
    ) -> AppResult<Box<dyn MediaRecorder>> {
        let mut inner = self.inner.lock();
        inner.requested.push(mime_type.to_string());

        if let Some(message) = &inner.failure {
            return Err(AppError::RecorderConstruction(message.clone()));
        }
        if !mime_type.is_empty() && !inner.supported.iter().any(|m| m == mime_type) {
            return Err(AppError::RecorderConstruction(format!(
                "{} is not supported",
                mime_type
            )));
        }
        if stream.tracks.is_empty() {
            return Err(AppError::RecorderConstruction(
                "Stream has no tracks".to_string(),
            ));
        }

        inner.created += 1;
        let mime_type = if mime_type.is_empty() {
            inner
                .supported
                .last()
                .cloned()
                .unwrap_or_else(|| "video/webm".to_string())
        } else {
            mime_type.to_string()
        };

        Ok(Box::new(SimulatedRecorder {
            mime_type,
            events,
            status: RecorderStatus::Idle,
            chunk_size: inner.chunk_size,
            final_chunk_size: inner.final_chunk_size,
            task: None,
        }))
    }
}

/// Recorder whose chunks are filled with their sequence number
pub struct SimulatedRecorder {
    mime_type: String,
    events: RecorderEvents,
    status: RecorderStatus,
    chunk_size: usize,
    final_chunk_size: usize,
    task: Option<(oneshot::Sender<()>, JoinHandle<()>)>,
}

#[async_trait]
impl MediaRecorder for SimulatedRecorder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn status(&self) -> RecorderStatus {
        self.status
    }

    fn start(&mut self, timeslice: Duration) -> AppResult<()> {
        if self.status != RecorderStatus::Idle {
            return Err(AppError::Recorder("Recorder already started".to_string()));
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let events = self.events.clone();
        let chunk_size = self.chunk_size;
        let final_chunk_size = self.final_chunk_size;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(timeslice);
            // The first tick completes immediately
            ticker.tick().await;
            let mut sequence: u8 = 0;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        events.chunk(vec![sequence; chunk_size]);
                        sequence = sequence.wrapping_add(1);
                    }
                    _ = &mut stop_rx => {
                        events.chunk(vec![sequence; final_chunk_size]);
                        events.stopped();
                        break;
                    }
                }
            }
        });

        self.task = Some((stop_tx, handle));
        self.status = RecorderStatus::Recording;
        Ok(())
    }

    async fn stop(&mut self) -> AppResult<()> {
        match self.task.take() {
            Some((stop_tx, handle)) => {
                let _ = stop_tx.send(());
                handle
                    .await
                    .map_err(|e| AppError::Recorder(e.to_string()))?;
            }
            None => self.events.stopped(),
        }
        self.status = RecorderStatus::Stopped;
        Ok(())
    }
}

impl Drop for SimulatedRecorder {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.task.take() {
            handle.abort();
        }
    }
}

#[derive(Debug, Default)]
struct PlaybackInner {
    live: Option<Uuid>,
    source: Option<ObjectUrl>,
    playing: bool,
    loaded_bytes: usize,
    fail_play: bool,
}

/// Playback sink that records what it was asked to show
#[derive(Debug, Clone)]
pub struct MemoryPlayback {
    registry: ObjectUrlRegistry,
    inner: Arc<Mutex<PlaybackInner>>,
}

impl MemoryPlayback {
    pub fn new(registry: ObjectUrlRegistry) -> Self {
        Self {
            registry,
            inner: Arc::default(),
        }
    }

    pub fn live_stream(&self) -> Option<Uuid> {
        self.inner.lock().live
    }

    pub fn source(&self) -> Option<ObjectUrl> {
        self.inner.lock().source.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    /// Size of the blob behind the last loaded URL
    pub fn loaded_bytes(&self) -> usize {
        self.inner.lock().loaded_bytes
    }

    pub fn fail_play(&self, fail: bool) {
        self.inner.lock().fail_play = fail;
    }
}

impl PlaybackSink for MemoryPlayback {
    fn attach_live(&mut self, stream: &StreamHandle) {
        self.inner.lock().live = Some(stream.id);
    }

    fn detach_live(&mut self) {
        self.inner.lock().live = None;
    }

    fn load(&mut self, url: &ObjectUrl) -> AppResult<()> {
        let blob = self
            .registry
            .resolve(url)
            .ok_or_else(|| AppError::Playback(format!("{} is not a live object URL", url)))?;

        let mut inner = self.inner.lock();
        inner.source = Some(url.clone());
        inner.loaded_bytes = blob.size();
        Ok(())
    }

    fn play(&mut self) -> AppResult<()> {
        let mut inner = self.inner.lock();
        if inner.source.is_none() {
            return Err(AppError::Playback("No source loaded".to_string()));
        }
        if inner.fail_play {
            return Err(AppError::Playback("Media element refused to play".to_string()));
        }
        inner.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.inner.lock().playing = false;
    }

    fn unload(&mut self) {
        let mut inner = self.inner.lock();
        inner.source = None;
        inner.playing = false;
    }
}

/// A download captured by [`MemoryDownloads`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDownload {
    pub filename: String,
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Download sink that keeps saved files in memory
#[derive(Debug, Clone)]
pub struct MemoryDownloads {
    registry: ObjectUrlRegistry,
    saved: Arc<Mutex<Vec<SavedDownload>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MemoryDownloads {
    pub fn new(registry: ObjectUrlRegistry) -> Self {
        Self {
            registry,
            saved: Arc::default(),
            failure: Arc::default(),
        }
    }

    pub fn saved(&self) -> Vec<SavedDownload> {
        self.saved.lock().clone()
    }

    /// Make the next saves fail with `message`
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }
}

#[async_trait]
impl DownloadSink for MemoryDownloads {
    async fn save(&self, url: &ObjectUrl, filename: &str) -> AppResult<()> {
        if let Some(message) = self.failure.lock().clone() {
            return Err(AppError::Download(message));
        }
        let blob = self
            .registry
            .resolve(url)
            .ok_or_else(|| AppError::Download(format!("{} is not a live object URL", url)))?;

        self.saved.lock().push(SavedDownload {
            filename: filename.to_string(),
            data: blob.bytes().to_vec(),
            mime_type: blob.mime_type().to_string(),
        });
        Ok(())
    }
}

/// Handles to one simulated platform
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    pub devices: SimulatedDevices,
    pub camera: SimulatedCamera,
    pub recorders: SimulatedRecorders,
    pub playback: MemoryPlayback,
    pub downloads: MemoryDownloads,
    pub urls: ObjectUrlRegistry,
}

impl SimulatedPlatform {
    pub fn new(devices: Vec<Device>) -> Self {
        let urls = ObjectUrlRegistry::new();
        let devices = SimulatedDevices::new(devices);
        Self {
            camera: SimulatedCamera::new(devices.clone()),
            devices,
            recorders: SimulatedRecorders::default(),
            playback: MemoryPlayback::new(urls.clone()),
            downloads: MemoryDownloads::new(urls.clone()),
            urls,
        }
    }

    /// Collaborators sharing this platform's state
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            devices: Arc::new(self.devices.clone()),
            capture: Arc::new(self.camera.clone()),
            recorders: Arc::new(self.recorders.clone()),
            playback: Box::new(self.playback.clone()),
            downloads: Arc::new(self.downloads.clone()),
            urls: self.urls.clone(),
        }
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new(default_devices())
    }
}
