//! Recorder trait definitions
//!
//! A recorder encodes a live stream and reports chunks and its final stop
//! through a [`RecorderEvents`] handle given at construction.

use super::state::RecorderStatus;
use crate::capture::traits::StreamHandle;
use crate::utils::error::AppResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Notification from a running recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// A chunk of encoded media is available
    Chunk { recording_id: Uuid, data: Vec<u8> },
    /// The recorder has finalized
    Stopped { recording_id: Uuid },
}

/// Sending half handed to a recorder, tagged with its recording ID
#[derive(Debug, Clone)]
pub struct RecorderEvents {
    recording_id: Uuid,
    tx: mpsc::UnboundedSender<RecorderEvent>,
}

impl RecorderEvents {
    pub fn new(recording_id: Uuid, tx: mpsc::UnboundedSender<RecorderEvent>) -> Self {
        Self { recording_id, tx }
    }

    pub fn chunk(&self, data: Vec<u8>) {
        let _ = self.tx.send(RecorderEvent::Chunk {
            recording_id: self.recording_id,
            data,
        });
    }

    pub fn stopped(&self) {
        let _ = self.tx.send(RecorderEvent::Stopped {
            recording_id: self.recording_id,
        });
    }
}

/// A running media recorder
#[async_trait]
pub trait MediaRecorder: Send {
    /// MIME type actually in use, resolved by the platform when none was requested
    fn mime_type(&self) -> &str;

    fn status(&self) -> RecorderStatus;

    /// Begin recording, emitting a chunk every `timeslice`
    fn start(&mut self, timeslice: Duration) -> AppResult<()>;

    /// Finalize. Every remaining chunk has been sent when this returns.
    async fn stop(&mut self) -> AppResult<()>;
}

/// Creates recorders for a stream
pub trait RecorderFactory: Send + Sync {
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// An empty `mime_type` leaves the choice to the platform
    fn create_recorder(
        &self,
        stream: &StreamHandle,
        mime_type: &str,
        events: RecorderEvents,
    ) -> AppResult<Box<dyn MediaRecorder>>;
}
