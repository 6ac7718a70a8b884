//! Session state management
//!
//! Defines the capture/record state machine, the chunk buffer and the events
//! broadcast on every transition.

use super::channel::MediaRecorder;
use crate::capture::traits::StreamHandle;
use crate::ui::panel::ControlPanel;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Capture/record state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    /// No stream
    Idle,
    /// Stream open, not recording
    Capturing,
    /// Stream open and recording
    Recording,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Capturing => "capturing",
            CaptureState::Recording => "recording",
        };
        f.write_str(name)
    }
}

/// Playback sub-state, orthogonal to [`CaptureState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

/// Lifecycle of a platform recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderStatus {
    #[default]
    Idle,
    Recording,
    Stopped,
}

/// The open capture stream and the recorder attached to it
pub struct CaptureSession {
    pub stream: StreamHandle,
    pub recorder: Option<Box<dyn MediaRecorder>>,
    pub recorder_status: RecorderStatus,
    /// ID of the current recorder, used to discard events from older ones
    pub recording_id: Option<Uuid>,
}

impl CaptureSession {
    pub fn new(stream: StreamHandle) -> Self {
        Self {
            stream,
            recorder: None,
            recorder_status: RecorderStatus::Idle,
            recording_id: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recorder_status == RecorderStatus::Recording
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("stream", &self.stream.id)
            .field("recorder_status", &self.recorder_status)
            .field("recording_id", &self.recording_id)
            .finish()
    }
}

/// Chunks of the latest recording, in arrival order
#[derive(Debug, Clone, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    mime_type: String,
}

impl ChunkBuffer {
    /// Start a new recording
    pub fn reset(&mut self, mime_type: &str) {
        self.chunks.clear();
        self.mime_type = mime_type.to_string();
    }

    /// Append a chunk. Empty chunks are dropped.
    pub fn push(&mut self, data: Vec<u8>) -> bool {
        if data.is_empty() {
            return false;
        }
        self.chunks.push(data);
        true
    }

    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    DevicesRefreshed { audio: usize, video: usize },
    CaptureStarted { stream_id: Uuid },
    CaptureStopped,
    RecordingStarted { mime_type: String },
    ChunkRecorded { count: usize, bytes: usize },
    RecordingStopped { chunks: usize },
    PlaybackStarted,
    PlaybackStopped,
    Downloaded { filename: String, size: usize },
    Error(String),
}

/// Point-in-time view of the controller for front ends
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: CaptureState,
    pub playback: PlaybackState,
    pub chunk_count: usize,
    pub total_bytes: usize,
    pub mime_type: Option<String>,
    pub panel: ControlPanel,
}
