//! Feed data types and error definitions

use serde_json::Value;

/// Connection status of the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
        }
    }
}

/// Message delivered by the feed client to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// A tick received on the active subscription
    Tick { symbol: String, payload: Value },
    /// The push channel changed state
    Status(ConnectionStatus),
}

/// Broker destination for a topic such as `stock/005930`
pub fn destination_for(topic: &str) -> String {
    format!("/topic/{}", topic)
}

/// Error types for push channel operations
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed connection error: {0}")]
    ConnectionError(String),
    #[error("Feed protocol error: {0}")]
    ProtocolError(String),
    #[error("Subscription error: {0}")]
    SubscriptionError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::ConnectionError(err.to_string())
    }
}

/// Error types for REST API operations
#[derive(Debug, thiserror::Error)]
pub enum RestApiError {
    #[error("HTTP request error: {0}")]
    HttpRequestError(String),
    #[error("HTTP status error: {0} - {1}")]
    HttpStatusError(u16, String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_for_topic() {
        assert_eq!(destination_for("stock/005930"), "/topic/stock/005930");
    }

    #[test]
    fn test_default_status() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
        assert_eq!(ConnectionStatus::Connected.as_str(), "Connected");
    }
}
