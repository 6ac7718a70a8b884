//! Platform implementations of the collaborator traits

pub mod simulated;

pub use simulated::{
    default_devices, MemoryDownloads, MemoryPlayback, SavedDownload, SimulatedCamera,
    SimulatedDevices, SimulatedPlatform, SimulatedRecorders,
};
