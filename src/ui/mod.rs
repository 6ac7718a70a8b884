//! UI adapter: the control panel view model and the events it sends

pub mod events;
pub mod panel;

pub use events::UiEvent;
pub use panel::{ButtonState, ControlPanel};
