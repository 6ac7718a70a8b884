//! Native device enumeration
//!
//! Microphones come from cpal, cameras from nokhwa. Both calls block, so they
//! run on the blocking pool.

use super::traits::{Device, DeviceCatalog, DeviceKind};
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};
use nokhwa::utils::{ApiBackend, CameraIndex};

/// Device catalog backed by the host audio and camera APIs
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDeviceCatalog;

fn microphones() -> AppResult<Vec<Device>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AppError::DeviceEnumeration(e.to_string()))?;

    Ok(devices
        .filter_map(|device| device.name().ok())
        .map(|name| Device::new(name.clone(), DeviceKind::AudioInput, name))
        .collect())
}

fn cameras() -> AppResult<Vec<Device>> {
    let cameras = nokhwa::query(ApiBackend::Auto)
        .map_err(|e| AppError::DeviceEnumeration(e.to_string()))?;

    Ok(cameras
        .into_iter()
        .map(|info| {
            let id = match info.index() {
                CameraIndex::Index(i) => i.to_string(),
                CameraIndex::String(s) => s.to_string(),
            };
            Device::new(id, DeviceKind::VideoInput, info.human_name())
        })
        .collect())
}

#[async_trait]
impl DeviceCatalog for NativeDeviceCatalog {
    async fn enumerate_devices(&self) -> AppResult<Vec<Device>> {
        tokio::task::spawn_blocking(|| {
            let mut devices = microphones()?;
            match cameras() {
                Ok(found) => devices.extend(found),
                Err(e) => tracing::warn!("Failed to enumerate cameras: {}", e),
            }
            Ok(devices)
        })
        .await
        .map_err(|e| AppError::DeviceEnumeration(e.to_string()))?
    }
}
