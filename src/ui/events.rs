/// Messages from the page to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Start or stop the camera
    ToggleCamera,
    /// Start or stop recording
    ToggleRecording,
    /// Play or stop the recording
    TogglePlayback,
    Download,
    RefreshDevices,
    SelectAudioDevice(String),
    SelectVideoDevice(String),
    SetWidth(Option<u32>),
    SetHeight(Option<u32>),
    SetEchoCancellation(bool),
    Quit,
}
