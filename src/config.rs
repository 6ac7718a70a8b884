//! Recorder configuration
//!
//! Stored as camelCase JSON. A missing file means defaults.

use crate::recorder::encoding::DEFAULT_MIME_PREFERENCES;
use crate::utils::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "WEBCAM_RECORDER_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Recording MIME types, most preferred first
    pub mime_preferences: Vec<String>,

    /// Interval between emitted chunks
    pub chunk_interval_ms: u64,

    /// Delay before a download's object URL is revoked
    pub download_release_delay_ms: u64,

    /// Media type used when the recorder does not report one
    pub fallback_mime_type: String,

    /// Where downloads are written
    pub download_dir: PathBuf,

    pub default_width: Option<u32>,

    pub default_height: Option<u32>,

    pub echo_cancellation: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            mime_preferences: DEFAULT_MIME_PREFERENCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            chunk_interval_ms: 1000,
            download_release_delay_ms: 100,
            fallback_mime_type: "video/webm".to_string(),
            download_dir: PathBuf::from("downloads"),
            default_width: None,
            default_height: None,
            echo_cancellation: true,
        }
    }
}

impl RecorderConfig {
    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_interval_ms)
    }

    pub fn download_release_delay(&self) -> Duration {
        Duration::from_millis(self.download_release_delay_ms)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_interval_ms == 0 {
            return Err(AppError::Config(
                "chunkIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.download_release_delay_ms == 0 {
            return Err(AppError::Config(
                "downloadReleaseDelayMs must be greater than zero".to_string(),
            ));
        }
        if self.mime_preferences.iter().any(|m| m.trim().is_empty()) {
            return Err(AppError::Config(
                "mimePreferences must not contain empty entries".to_string(),
            ));
        }
        if self.fallback_mime_type.trim().is_empty() {
            return Err(AppError::Config(
                "fallbackMimeType must not be empty".to_string(),
            ));
        }
        if matches!(self.default_width, Some(0)) || matches!(self.default_height, Some(0)) {
            return Err(AppError::Config(
                "default dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from the path in [`CONFIG_ENV`], if set
    pub fn from_env() -> AppResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Write pretty JSON through a temp file and rename
    pub fn save(&self, path: &Path) -> AppResult<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
