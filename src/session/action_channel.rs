//! Action Channel for asynchronous event processing

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::chart::FetchTicket;
use crate::feed::RestApiError;
use crate::session::command_router::InteractiveCommand;

/// Session events for communication between components
#[derive(Debug)]
pub enum SessionEvent {
    /// A chart fetch finished
    FetchCompleted {
        ticket: FetchTicket,
        result: Result<Value, RestApiError>,
        elapsed: Duration,
    },
    /// User command from interactive input
    UserCommand { command: InteractiveCommand },
    /// Error event
    Error { message: String },
    /// Shutdown request
    ShutdownRequested,
}

/// Session inbox: user commands and shutdown requests from outside the loop
pub struct ActionChannel {
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    event_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl ActionChannel {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self { event_tx, event_rx }
    }

    /// Send event to channel
    pub fn send_event(&self, event: SessionEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| anyhow::anyhow!("Failed to send event: {}", e))
    }

    /// Wait for the next event; the channel keeps its own sender so this never ends
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }

    /// Sender for tasks that feed the session, such as the stdin reader
    pub fn event_tx(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.event_tx.clone()
    }

    /// Send shutdown request
    pub fn request_shutdown(&self) -> Result<()> {
        self.send_event(SessionEvent::ShutdownRequested)
    }
}

impl Default for ActionChannel {
    fn default() -> Self {
        Self::new()
    }
}
