//! Device selectors
//!
//! Enumeration can run several times (labels only appear after permission is
//! granted), so rebuilding a selector keeps the user's choice when it is still
//! listed.

use super::traits::{Device, DeviceKind};
use serde::{Deserialize, Serialize};

/// One entry of a device selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOption {
    pub id: String,
    pub label: String,
}

/// A drop-down of devices of a single kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSelector {
    pub kind: DeviceKind,
    pub options: Vec<DeviceOption>,
    pub selected: Option<String>,
}

impl DeviceSelector {
    pub fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            options: Vec::new(),
            selected: None,
        }
    }

    /// Select a listed device. Returns false if the ID is not an option.
    pub fn select(&mut self, id: &str) -> bool {
        if self.contains(id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.options.iter().any(|o| o.id == id)
    }

    /// Selected device ID, `None` when nothing usable is selected
    pub fn value(&self) -> Option<&str> {
        self.selected.as_deref().filter(|id| !id.is_empty())
    }

    fn fallback_label(&self) -> String {
        let noun = match self.kind {
            DeviceKind::AudioInput => "microphone",
            DeviceKind::VideoInput => "camera",
            DeviceKind::AudioOutput => "speaker",
        };
        format!("{} {}", noun, self.options.len() + 1)
    }

    fn push(&mut self, device: &Device) {
        let label = if device.label.is_empty() {
            self.fallback_label()
        } else {
            device.label.clone()
        };
        self.options.push(DeviceOption {
            id: device.id.clone(),
            label,
        });
    }

    fn restore(&mut self, previous: Option<String>) {
        self.selected = match previous {
            Some(id) if self.contains(&id) => Some(id),
            _ => self.options.first().map(|o| o.id.clone()),
        };
    }
}

/// Rebuild both selectors from a fresh device list
pub fn apply_device_list(
    devices: &[Device],
    audio: &mut DeviceSelector,
    video: &mut DeviceSelector,
) {
    let previous_audio = audio.selected.take();
    let previous_video = video.selected.take();
    audio.options.clear();
    video.options.clear();

    for device in devices {
        match device.kind {
            DeviceKind::AudioInput => audio.push(device),
            DeviceKind::VideoInput => video.push(device),
            other => {
                tracing::debug!("Skipping device {} of kind {:?}", device.id, other);
            }
        }
    }

    audio.restore(previous_audio);
    video.restore(previous_video);

    tracing::debug!(
        "Device list applied: {} microphones, {} cameras",
        audio.options.len(),
        video.options.len()
    );
}
