//! Device enumeration and capture streams
//!
//! The platform calls live behind the traits in [`traits`]; this module adds
//! the selector logic that sits between them and the control panel.

pub mod devices;
pub mod traits;

#[cfg(feature = "native-devices")]
pub mod native;

pub use devices::{apply_device_list, DeviceOption, DeviceSelector};
pub use traits::{
    CaptureConstraints, CaptureSource, Device, DeviceCatalog, DeviceKind, MediaTrack,
    StreamHandle,
};

#[cfg(feature = "native-devices")]
pub use native::NativeDeviceCatalog;
