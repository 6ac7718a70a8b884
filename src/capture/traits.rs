//! Capture trait definitions
//!
//! Platform-agnostic types and traits for device enumeration and stream acquisition.

use crate::utils::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Kind of media device reported by enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    AudioInput,
    VideoInput,
    AudioOutput,
}

/// Information about an input device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Opaque device ID
    pub id: String,

    /// Device kind
    pub kind: DeviceKind,

    /// Human-readable label, empty until permission is granted on some platforms
    pub label: String,
}

impl Device {
    pub fn new(id: impl Into<String>, kind: DeviceKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }
}

/// User-chosen requirements for a capture stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConstraints {
    /// Exact-match audio device ID
    pub audio_device_id: Option<String>,

    /// Exact-match video device ID
    pub video_device_id: Option<String>,

    /// Whether echo cancellation is required
    pub echo_cancellation: bool,

    /// Requested video width in pixels
    pub width: Option<u32>,

    /// Requested video height in pixels
    pub height: Option<u32>,
}

impl CaptureConstraints {
    /// Render in the `getUserMedia` constraint shape
    pub fn to_media_constraints(&self) -> Value {
        let mut audio = Map::new();
        if let Some(id) = &self.audio_device_id {
            audio.insert("deviceId".into(), json!({ "exact": id }));
        }
        audio.insert(
            "echoCancellation".into(),
            json!({ "exact": self.echo_cancellation }),
        );

        let mut video = Map::new();
        if let Some(id) = &self.video_device_id {
            video.insert("deviceId".into(), json!({ "exact": id }));
        }
        if let Some(width) = self.width {
            video.insert("width".into(), json!(width));
        }
        if let Some(height) = self.height {
            video.insert("height".into(), json!(height));
        }

        json!({ "audio": audio, "video": video })
    }
}

/// A single track of a live stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTrack {
    pub id: Uuid,
    pub kind: DeviceKind,
    /// Device the track was opened on
    pub device_id: String,
}

/// Handle to a live capture stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamHandle {
    pub id: Uuid,
    pub tracks: Vec<MediaTrack>,
}

impl StreamHandle {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks,
        }
    }
}

/// Produces the list of available media devices
#[async_trait]
pub trait DeviceCatalog: Send + Sync {
    /// Fails with [`AppError::DeviceEnumeration`](crate::utils::AppError) when the platform refuses
    async fn enumerate_devices(&self) -> AppResult<Vec<Device>>;
}

/// Opens and releases live capture streams
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Fails with [`AppError::StreamAcquisition`](crate::utils::AppError) on permission denial,
    /// busy devices or unsatisfiable constraints
    async fn acquire_stream(&self, constraints: &CaptureConstraints) -> AppResult<StreamHandle>;

    /// Stop every track of the stream
    fn release_stream(&self, stream: StreamHandle);
}
