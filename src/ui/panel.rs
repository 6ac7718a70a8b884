//! Control panel view model
//!
//! Holds what the page shows: four buttons, two device selectors, the
//! capture form fields and the info/error message regions.

use crate::capture::devices::DeviceSelector;
use crate::capture::traits::{CaptureConstraints, DeviceKind};
use crate::config::RecorderConfig;
use serde::Serialize;

pub const START_CAMERA: &str = "Start camera";
pub const STOP_CAMERA: &str = "Stop camera";
pub const START_RECORDING: &str = "Start Recording";
pub const STOP_RECORDING: &str = "Stop Recording";
pub const PLAY: &str = "Play";
pub const STOP_PLAYBACK: &str = "Stop";
pub const DOWNLOAD: &str = "Download";

/// A button's label and whether it can be clicked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonState {
    pub label: String,
    pub enabled: bool,
}

impl ButtonState {
    fn new(label: &str, enabled: bool) -> Self {
        Self {
            label: label.to_string(),
            enabled,
        }
    }

    pub(crate) fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPanel {
    pub camera_button: ButtonState,
    pub record_button: ButtonState,
    pub play_button: ButtonState,
    pub download_button: ButtonState,
    pub audio_source: DeviceSelector,
    pub video_source: DeviceSelector,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub echo_cancellation: bool,
    pub info_message: String,
    pub error_message: String,
}

impl ControlPanel {
    pub fn new(config: &RecorderConfig) -> Self {
        Self {
            camera_button: ButtonState::new(START_CAMERA, true),
            record_button: ButtonState::new(START_RECORDING, false),
            play_button: ButtonState::new(PLAY, false),
            download_button: ButtonState::new(DOWNLOAD, false),
            audio_source: DeviceSelector::new(DeviceKind::AudioInput),
            video_source: DeviceSelector::new(DeviceKind::VideoInput),
            width: config.default_width,
            height: config.default_height,
            echo_cancellation: config.echo_cancellation,
            info_message: String::new(),
            error_message: String::new(),
        }
    }

    /// Constraints from the current selections
    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            audio_device_id: self.audio_source.value().map(str::to_string),
            video_device_id: self.video_source.value().map(str::to_string),
            echo_cancellation: self.echo_cancellation,
            width: self.width,
            height: self.height,
        }
    }

    /// Enable or disable play and download together
    pub(crate) fn set_output_available(&mut self, available: bool) {
        self.play_button.enabled = available;
        self.download_button.enabled = available;
    }
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new(&RecorderConfig::default())
    }
}
