//! Playback sink trait
//!
//! The sink stands in for the two video elements of the page: the live
//! preview of the capture stream and the player for the recorded blob.

use super::blob::ObjectUrl;
use crate::capture::traits::StreamHandle;
use crate::utils::error::AppResult;

/// Renders the live stream and recorded media
pub trait PlaybackSink: Send {
    /// Show the live capture stream
    fn attach_live(&mut self, stream: &StreamHandle);

    /// Stop showing the live stream
    fn detach_live(&mut self);

    /// Bind an object URL as the playback source
    fn load(&mut self, url: &ObjectUrl) -> AppResult<()>;

    fn play(&mut self) -> AppResult<()>;

    fn pause(&mut self);

    /// Unbind the playback source
    fn unload(&mut self);
}
