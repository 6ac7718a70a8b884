//! Recording system module
//!
//! - MediaRecorder/RecorderFactory traits for the platform encoder
//! - SessionController driving capture, recording, playback and download
//! - Encoding preference selection

pub mod channel;
pub mod controller;
pub mod encoding;
pub mod state;

pub use channel::{MediaRecorder, RecorderEvent, RecorderEvents, RecorderFactory};
pub use controller::{Collaborators, SessionController};
pub use state::{CaptureState, PlaybackState, RecorderStatus, SessionEvent, SessionSnapshot};
