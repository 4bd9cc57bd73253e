//! Core types: directives, channel events, and errors.

use serde::Serialize;

/// One decoded push command.  Emitted and discarded, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directive {
    pub command: String,
    pub payload: serde_json::Value,
}

/// Everything a channel reports to its observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// First liveness confirmation of an attempt: the channel is up.
    Connect,
    /// An attempt ended.  `retryable = false` means the manager gave up.
    Disconnect { retryable: bool, message: String },
    Command(Directive),
    /// Non-fatal transport or setup error.
    Error { message: String },
    /// Malformed payload; processing continues.
    UnexpectedResponse { message: String },
}

/// Discriminant of [`ChannelEvent`], used to register per-kind handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    Command,
    Error,
    UnexpectedResponse,
}

impl ChannelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connect => EventKind::Connect,
            Self::Disconnect { .. } => EventKind::Disconnect,
            Self::Command(_) => EventKind::Command,
            Self::Error { .. } => EventKind::Error,
            Self::UnexpectedResponse { .. } => EventKind::UnexpectedResponse,
        }
    }
}

/// Why an active probe reported the channel as not alive.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("connection not initialized")]
    ConnectionMissing,
    #[error("connection destroyed")]
    ConnectionDestroyed,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("stream destroyed")]
    StreamDestroyed,
    #[error("stream closed")]
    StreamClosed,
    #[error("ping timeout after {0} seconds")]
    Timeout(u64),
    #[error("ping failed: {0}")]
    Transport(String),
    /// The manager task is gone (channel dropped).
    #[error("channel is shut down")]
    Shutdown,
}

/// Top-level channel error.
#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("config: {0}")]
    Config(String),
    #[error("transport: {0}")]
    Transport(#[from] crate::transport::TransportError),
    #[error("channel is shut down")]
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(ChannelEvent::Connect.kind(), EventKind::Connect);
        assert_eq!(
            ChannelEvent::Disconnect {
                retryable: true,
                message: String::new()
            }
            .kind(),
            EventKind::Disconnect
        );
        assert_eq!(
            ChannelEvent::UnexpectedResponse { message: "x".into() }.kind(),
            EventKind::UnexpectedResponse
        );
    }

    #[test]
    fn events_serialize_with_tag() {
        let ev = ChannelEvent::Command(Directive {
            command: "X".into(),
            payload: json!({ "a": 1 }),
        });
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({ "event": "command", "command": "X", "payload": { "a": 1 } })
        );

        let ev = ChannelEvent::Disconnect {
            retryable: false,
            message: "gave up".into(),
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({ "event": "disconnect", "retryable": false, "message": "gave up" })
        );
    }

    #[test]
    fn probe_timeout_message() {
        assert_eq!(
            ProbeError::Timeout(5).to_string(),
            "ping timeout after 5 seconds"
        );
    }
}
