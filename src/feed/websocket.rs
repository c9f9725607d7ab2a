//! Push channel client: STOMP over WebSocket with automatic reconnection
//!
//! The client runs as a background task that owns the socket. Callers talk
//! to it through a [`FeedHandle`] and receive [`FeedMessage`]s on a channel.
//! At most one topic subscription is live at any time.

use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use futures_util::sink::SinkExt;
use futures_util::stream::{SplitSink, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use tracing::{debug, error, info, warn};

use super::stomp::{Frame, StompCommand};
use super::types::{ConnectionStatus, FeedError, FeedMessage, destination_for};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Commands accepted by the feed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    Subscribe { symbol: String },
    Unsubscribe,
    Shutdown,
}

/// A live topic subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub symbol: String,
    pub topic: String,
    pub id: String,
}

/// Outcome of pointing the slot at a symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    Unchanged,
    Replaced {
        previous: Option<Subscription>,
        next: Subscription,
    },
}

/// Holds the single active subscription
///
/// Every replacement gets a fresh id so frames still in flight for an
/// old subscription can be told apart and dropped.
#[derive(Debug, Default)]
pub struct SubscriptionSlot {
    active: Option<Subscription>,
    next_id: u64,
}

impl SubscriptionSlot {
    pub fn active(&self) -> Option<&Subscription> {
        self.active.as_ref()
    }

    pub fn replace(&mut self, symbol: &str) -> SlotChange {
        if self.active.as_ref().is_some_and(|s| s.symbol == symbol) {
            return SlotChange::Unchanged;
        }
        self.next_id += 1;
        let next = Subscription {
            symbol: symbol.to_string(),
            topic: format!("stock/{}", symbol),
            id: format!("sub-{}", self.next_id),
        };
        let previous = self.active.replace(next.clone());
        SlotChange::Replaced { previous, next }
    }

    pub fn release(&mut self) -> Option<Subscription> {
        self.active.take()
    }

    /// The active subscription, if `id` belongs to it
    pub fn accepts(&self, id: &str) -> Option<&Subscription> {
        self.active.as_ref().filter(|s| s.id == id)
    }
}

/// Handle used to drive the feed task
#[derive(Debug)]
pub struct FeedHandle {
    command_tx: mpsc::UnboundedSender<FeedCommand>,
    status_rx: watch::Receiver<ConnectionStatus>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Switch the live subscription to `symbol`
    pub fn subscribe(&self, symbol: &str) -> Result<(), FeedError> {
        self.command_tx
            .send(FeedCommand::Subscribe {
                symbol: symbol.to_string(),
            })
            .map_err(|_| FeedError::SubscriptionError("feed task has stopped".to_string()))
    }

    /// Release the live subscription, if any
    pub fn unsubscribe(&self) -> Result<(), FeedError> {
        self.command_tx
            .send(FeedCommand::Unsubscribe)
            .map_err(|_| FeedError::SubscriptionError("feed task has stopped".to_string()))
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Stop the task, cancelling any pending reconnect
    pub async fn shutdown(&mut self) {
        let _ = self.command_tx.send(FeedCommand::Shutdown);
        if let Some(mut task) = self.task.take() {
            if timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("Feed task did not stop in time, aborting");
                task.abort();
            }
        }
        info!("Feed client shut down");
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum SessionEnd {
    Shutdown,
    Lost(FeedError),
}

/// Background push channel client
pub struct FeedClient {
    url: String,
    host: String,
    status_tx: watch::Sender<ConnectionStatus>,
    message_tx: mpsc::Sender<FeedMessage>,
    command_rx: mpsc::UnboundedReceiver<FeedCommand>,
    retry: Constant,
    slot: SubscriptionSlot,
}

impl FeedClient {
    /// Spawn the feed task
    ///
    /// Reconnection after any failure waits a fixed `reconnect_interval`.
    pub fn spawn(
        url: impl Into<String>,
        reconnect_interval: Duration,
    ) -> (FeedHandle, mpsc::Receiver<FeedMessage>) {
        let url = url.into();
        let (message_tx, message_rx) = mpsc::channel(1000);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

        let host = reqwest::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "localhost".to_string());

        let client = Self {
            url,
            host,
            status_tx,
            message_tx,
            command_rx,
            retry: Constant::new(reconnect_interval),
            slot: SubscriptionSlot::default(),
        };
        let task = tokio::spawn(client.run());

        let handle = FeedHandle {
            command_tx,
            status_rx,
            task: Some(task),
        };
        (handle, message_rx)
    }

    async fn run(mut self) {
        info!("Feed client starting for {}", self.url);

        loop {
            self.set_status(ConnectionStatus::Connecting).await;

            match self.open_session().await {
                Ok(ws) => {
                    self.retry.reset();
                    self.set_status(ConnectionStatus::Connected).await;
                    info!("Push channel connected to {}", self.url);

                    match self.serve(ws).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Lost(e) => warn!("Push channel lost: {}", e),
                    }
                    self.set_status(ConnectionStatus::Connecting).await;
                }
                Err(e) => error!("Failed to connect push channel: {}", e),
            }

            metrics::increment_counter!("stockchart_feed_reconnects");
            let delay = self.retry.next_backoff().unwrap_or(Duration::from_secs(5));
            info!("Reconnecting push channel in {:?}", delay);
            if !self.wait_offline(delay).await {
                break;
            }
        }

        self.set_status(ConnectionStatus::Disconnected).await;
        info!("Feed client stopped");
    }

    /// Wait out the retry delay while still tracking subscription changes
    ///
    /// Returns false when shutdown was requested.
    async fn wait_offline(&mut self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => return true,
                command = self.command_rx.recv() => match command {
                    Some(FeedCommand::Subscribe { symbol }) => {
                        // applied on the wire once reconnected
                        let _ = self.slot.replace(&symbol);
                    }
                    Some(FeedCommand::Unsubscribe) => {
                        let _ = self.slot.release();
                    }
                    Some(FeedCommand::Shutdown) | None => return false,
                },
            }
        }
    }

    async fn open_session(&self) -> Result<WsStream, FeedError> {
        let (mut ws, _) = timeout(HANDSHAKE_TIMEOUT, connect_async(self.url.as_str()))
            .await
            .map_err(|_| FeedError::ConnectionError("connect timed out".to_string()))??;

        ws.send(Message::Text(Frame::connect(&self.host).encode()))
            .await?;

        timeout(HANDSHAKE_TIMEOUT, await_connected(&mut ws))
            .await
            .map_err(|_| FeedError::ConnectionError("STOMP handshake timed out".to_string()))??;

        Ok(ws)
    }

    async fn serve(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut source) = ws.split();

        // restore the subscription after a reconnect
        if let Some(sub) = self.slot.active().cloned() {
            if let Err(e) = send_subscribe(&mut sink, &sub).await {
                return SessionEnd::Lost(e);
            }
        }

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let command = command.unwrap_or(FeedCommand::Shutdown);
                    if command == FeedCommand::Shutdown {
                        let _ = sink.send(Message::Text(Frame::disconnect().encode())).await;
                        let _ = sink.close().await;
                        return SessionEnd::Shutdown;
                    }
                    if let Err(e) = self.apply_command(&mut sink, command).await {
                        return SessionEnd::Lost(e);
                    }
                }
                message = source.next() => {
                    match self.handle_incoming(&mut sink, message).await {
                        Ok(true) => {}
                        Ok(false) => return SessionEnd::Shutdown,
                        Err(e) => return SessionEnd::Lost(e),
                    }
                }
            }
        }
    }

    async fn apply_command(&mut self, sink: &mut WsSink, command: FeedCommand) -> Result<(), FeedError> {
        match command {
            FeedCommand::Subscribe { symbol } => match self.slot.replace(&symbol) {
                SlotChange::Unchanged => {
                    debug!("Already subscribed to {}", symbol);
                }
                SlotChange::Replaced { previous, next } => {
                    // the old topic is released before the new one is requested
                    if let Some(previous) = previous {
                        send_frame(sink, Frame::unsubscribe(&previous.id)).await?;
                        info!("Unsubscribed from {}", previous.topic);
                    }
                    send_subscribe(sink, &next).await?;
                }
            },
            FeedCommand::Unsubscribe => {
                if let Some(previous) = self.slot.release() {
                    send_frame(sink, Frame::unsubscribe(&previous.id)).await?;
                    info!("Unsubscribed from {}", previous.topic);
                }
            }
            FeedCommand::Shutdown => {}
        }
        Ok(())
    }

    /// Returns Ok(false) when the consumer has gone away
    async fn handle_incoming(
        &mut self,
        sink: &mut WsSink,
        message: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) -> Result<bool, FeedError> {
        let text = match message {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Ping(data))) => {
                sink.send(Message::Pong(data)).await?;
                return Ok(true);
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(FeedError::ConnectionError("connection closed by server".to_string()));
            }
            Some(Ok(_)) => return Ok(true),
            Some(Err(e)) => return Err(e.into()),
        };

        if Frame::is_heartbeat(&text) {
            return Ok(true);
        }

        let frame = match Frame::decode(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping undecodable frame: {}", e);
                return Ok(true);
            }
        };

        match frame.command {
            StompCommand::Message => {
                let id = frame.header("subscription").unwrap_or_default();
                let Some(sub) = self.slot.accepts(id) else {
                    debug!("Dropping message for inactive subscription {}", id);
                    return Ok(true);
                };
                let payload = match serde_json::from_str(&frame.body) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Dropping malformed tick on {}: {}", sub.topic, e);
                        return Ok(true);
                    }
                };
                let tick = FeedMessage::Tick {
                    symbol: sub.symbol.clone(),
                    payload,
                };
                Ok(self.message_tx.send(tick).await.is_ok())
            }
            StompCommand::Error => Err(FeedError::ProtocolError(
                frame.header("message").unwrap_or("broker error").to_string(),
            )),
            other => {
                debug!("Ignoring {} frame", other);
                Ok(true)
            }
        }
    }

    async fn set_status(&self, status: ConnectionStatus) {
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            debug!("Push channel status: {:?} -> {:?}", previous, status);
            let _ = self.message_tx.send(FeedMessage::Status(status)).await;
        }
    }
}

async fn await_connected(ws: &mut WsStream) -> Result<(), FeedError> {
    while let Some(message) = ws.next().await {
        let text = match message? {
            Message::Text(text) => text,
            _ => continue,
        };
        if Frame::is_heartbeat(&text) {
            continue;
        }
        let frame = Frame::decode(&text)?;
        return match frame.command {
            StompCommand::Connected => Ok(()),
            StompCommand::Error => Err(FeedError::ConnectionError(
                frame
                    .header("message")
                    .unwrap_or("broker refused connection")
                    .to_string(),
            )),
            other => Err(FeedError::ProtocolError(format!(
                "expected CONNECTED, got {}",
                other
            ))),
        };
    }
    Err(FeedError::ConnectionError(
        "closed during handshake".to_string(),
    ))
}

async fn send_frame(sink: &mut WsSink, frame: Frame) -> Result<(), FeedError> {
    sink.send(Message::Text(frame.encode())).await?;
    Ok(())
}

async fn send_subscribe(sink: &mut WsSink, sub: &Subscription) -> Result<(), FeedError> {
    send_frame(sink, Frame::subscribe(&sub.id, &destination_for(&sub.topic))).await?;
    info!("Subscribed to {}", sub.topic);
    Ok(())
}
