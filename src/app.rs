//! Event loop
//!
//! Feeds UI events and recorder events into the controller one at a time.
//! While an async action is in flight nothing else is dispatched; later UI
//! events wait in the channel.

use crate::recorder::channel::RecorderEvent;
use crate::recorder::controller::SessionController;
use crate::ui::events::UiEvent;
use tokio::sync::mpsc;

enum Next {
    Ui(Option<UiEvent>),
    Recorder(RecorderEvent),
}

pub struct App {
    controller: SessionController,
    ui_rx: mpsc::Receiver<UiEvent>,
}

impl App {
    /// Create the loop and the sender the page uses to reach it
    pub fn new(controller: SessionController) -> (Self, mpsc::Sender<UiEvent>) {
        let (ui_tx, ui_rx) = mpsc::channel(32);
        (Self { controller, ui_rx }, ui_tx)
    }

    /// Run until [`UiEvent::Quit`] or until every sender is gone, then tear
    /// down and hand the controller back
    pub async fn run(mut self) -> SessionController {
        if let Err(e) = self.controller.refresh_devices().await {
            tracing::warn!("Initial device enumeration failed: {}", e);
        }

        loop {
            let next = tokio::select! {
                event = self.ui_rx.recv() => Next::Ui(event),
                Some(event) = self.controller.next_recorder_event() => Next::Recorder(event),
            };

            match next {
                Next::Ui(None) | Next::Ui(Some(UiEvent::Quit)) => break,
                Next::Ui(Some(event)) => {
                    match self.controller.dispatch(event).await {
                        Err(e) if e.is_rejection() => tracing::debug!("Ignored: {}", e),
                        Err(e) => tracing::warn!("Action failed: {}", e),
                        Ok(()) => {}
                    }
                }
                Next::Recorder(event) => self.controller.handle_recorder_event(event),
            }
        }

        tracing::info!("Shutting down");
        self.controller.teardown().await;
        self.controller
    }
}
