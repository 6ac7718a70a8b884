//! Download sinks
//!
//! A download hands an object URL and a file name to the sink. The caller
//! revokes the URL shortly afterwards, so the sink must read the blob during
//! `save`.

use super::blob::{ObjectUrl, ObjectUrlRegistry};
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Result of a triggered download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReceipt {
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

/// Triggers the save of an object URL under a file name
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn save(&self, url: &ObjectUrl, filename: &str) -> AppResult<()>;
}

/// File extension for a recording MIME type
pub fn extension_for(mime_type: &str) -> &'static str {
    let container = mime_type.split(';').next().unwrap_or_default().trim();
    match container {
        "video/mp4" | "audio/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        "audio/ogg" | "video/ogg" => "ogg",
        _ => "webm",
    }
}

/// Timestamp-derived download name, e.g. `1700000000000.webm`
pub fn download_filename(now: DateTime<Utc>, mime_type: &str) -> String {
    format!("{}.{}", now.timestamp_millis(), extension_for(mime_type))
}

/// Writes downloads into a directory
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
    registry: ObjectUrlRegistry,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>, registry: ObjectUrlRegistry) -> Self {
        Self {
            dir: dir.into(),
            registry,
        }
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn save(&self, url: &ObjectUrl, filename: &str) -> AppResult<()> {
        let blob = self
            .registry
            .resolve(url)
            .ok_or_else(|| AppError::Download(format!("{} is not a live object URL", url)))?;

        if Path::new(filename).components().count() != 1 {
            return Err(AppError::Download(format!("Invalid file name: {}", filename)));
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        fs::write(&path, blob.bytes())?;

        tracing::info!("Saved {} bytes to {:?}", blob.size(), path);
        Ok(())
    }
}
