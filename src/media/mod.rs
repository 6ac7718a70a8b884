//! Recorded media: blobs, object URLs, playback and download sinks

pub mod blob;
pub mod download;
pub mod playback;

pub use blob::{Blob, ObjectUrl, ObjectUrlRegistry};
pub use download::{download_filename, DirectoryDownloads, DownloadReceipt, DownloadSink};
pub use playback::PlaybackSink;
