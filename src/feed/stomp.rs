//! Minimal STOMP 1.2 framing for the push channel
//!
//! Frames travel as WebSocket text messages:
//! `COMMAND\nheader:value\n...\n\nbody\0`.

use std::fmt;

use super::types::FeedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StompCommand {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Send,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl StompCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            StompCommand::Connect => "CONNECT",
            StompCommand::Connected => "CONNECTED",
            StompCommand::Subscribe => "SUBSCRIBE",
            StompCommand::Unsubscribe => "UNSUBSCRIBE",
            StompCommand::Send => "SEND",
            StompCommand::Message => "MESSAGE",
            StompCommand::Receipt => "RECEIPT",
            StompCommand::Error => "ERROR",
            StompCommand::Disconnect => "DISCONNECT",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "CONNECT" | "STOMP" => StompCommand::Connect,
            "CONNECTED" => StompCommand::Connected,
            "SUBSCRIBE" => StompCommand::Subscribe,
            "UNSUBSCRIBE" => StompCommand::Unsubscribe,
            "SEND" => StompCommand::Send,
            "MESSAGE" => StompCommand::Message,
            "RECEIPT" => StompCommand::Receipt,
            "ERROR" => StompCommand::Error,
            "DISCONNECT" => StompCommand::Disconnect,
            _ => return None,
        })
    }

    // CONNECT and CONNECTED headers are never escaped
    fn escapes_headers(&self) -> bool {
        !matches!(self, StompCommand::Connect | StompCommand::Connected)
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    /// Create a new frame without headers or body
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn connect(host: &str) -> Self {
        Self::new(StompCommand::Connect)
            .with_header("accept-version", "1.2,1.1")
            .with_header("host", host)
            .with_header("heart-beat", "0,0")
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(StompCommand::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(StompCommand::Unsubscribe).with_header("id", id)
    }

    pub fn disconnect() -> Self {
        Self::new(StompCommand::Disconnect)
    }

    /// First value of a header; repeated headers keep the first occurrence
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to the wire form, NUL terminated
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one frame from a text message
    pub fn decode(text: &str) -> Result<Self, FeedError> {
        // heart-beats and stray EOLs may precede the command
        let text = text.trim_start_matches(['\r', '\n']);
        let (head, rest) = text
            .split_once("\n\n")
            .or_else(|| text.split_once("\r\n\r\n"))
            .ok_or_else(|| FeedError::ProtocolError("missing header terminator".to_string()))?;

        let mut lines = head.lines();
        let command_line = lines
            .next()
            .map(str::trim_end)
            .ok_or_else(|| FeedError::ProtocolError("empty frame".to_string()))?;
        let command = StompCommand::parse(command_line).ok_or_else(|| {
            FeedError::ProtocolError(format!("unknown command: {}", command_line))
        })?;

        let unescape = command.escapes_headers();
        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                FeedError::ProtocolError(format!("malformed header: {}", line))
            })?;
            if unescape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let body = match rest.find('\0') {
            Some(end) => &rest[..end],
            None => rest,
        };

        Ok(Self {
            command,
            headers,
            body: body.to_string(),
        })
    }

    /// True for a bare heart-beat (EOL only)
    pub fn is_heartbeat(text: &str) -> bool {
        !text.is_empty() && text.chars().all(|c| c == '\n' || c == '\r')
    }
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, FeedError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(FeedError::ProtocolError(format!(
                    "invalid header escape: \\{}",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_subscribe() {
        let wire = Frame::subscribe("sub-1", "/topic/stock/005930").encode();
        assert!(wire.starts_with("SUBSCRIBE\n"));
        assert!(wire.contains("id:sub-1\n"));
        assert!(wire.contains("destination:/topic/stock/005930\n"));
        assert!(wire.ends_with("\n\n\0"));
    }

    #[test]
    fn test_decode_message() {
        let wire = "MESSAGE\nsubscription:sub-1\ndestination:/topic/stock/005930\nmessage-id:7\n\n{\"price\":\"71000\"}\0";
        let frame = Frame::decode(wire).unwrap();
        assert_eq!(frame.command, StompCommand::Message);
        assert_eq!(frame.header("subscription"), Some("sub-1"));
        assert_eq!(frame.body, "{\"price\":\"71000\"}");
    }

    #[test]
    fn test_decode_connected_with_leading_heartbeat() {
        let frame = Frame::decode("\nCONNECTED\nversion:1.2\n\n\0").unwrap();
        assert_eq!(frame.command, StompCommand::Connected);
        assert_eq!(frame.header("version"), Some("1.2"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_header_escaping() {
        let frame = Frame::new(StompCommand::Send).with_header("note", "a:b\nc");
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.header("note"), Some("a:b\nc"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Frame::decode("HELLO\n\n\0").is_err());
        assert!(Frame::decode("MESSAGE\nno terminator").is_err());
        assert!(Frame::decode("MESSAGE\nbad\\q:1\n\n\0").is_err());
    }

    #[test]
    fn test_heartbeat_detection() {
        assert!(Frame::is_heartbeat("\n"));
        assert!(Frame::is_heartbeat("\r\n"));
        assert!(!Frame::is_heartbeat(""));
        assert!(!Frame::is_heartbeat("MESSAGE\n"));
    }
}
