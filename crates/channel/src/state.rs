//! Channel lifecycle states and close reasons.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Lifecycle of the single channel owned by a manager.
///
/// ```text
/// Disconnected ─connect─▶ Connecting ─opened─▶ AwaitingBoundary ─boundary─▶ Active
///                              │                     │                        │
///                              └──────── close trigger (first one wins) ──────┘
///                                                    ▼
///                                                 Closing
///                                   ┌────────────────┴───────────────┐
///                                   ▼                                ▼
///                           ReconnectScheduled ─timer─▶ Connecting   Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    /// Token request and transport open in flight.
    Connecting,
    /// Stream open, body format not seen yet.
    AwaitingBoundary,
    /// Body format seen, ping cycle running.
    Active,
    Closing,
    ReconnectScheduled,
    /// Stopped by the caller or out of retries.
    Terminated,
}

impl ChannelState {
    /// Only these states own an attempt that a close trigger may tear
    /// down.  Every other state makes the close path a no-op.
    pub fn accepts_close(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingBoundary | Self::Active
        )
    }

    /// An attempt is in flight; `connect()` is a no-op.
    pub fn has_attempt(self) -> bool {
        self.accepts_close() || self == Self::Closing
    }
}

/// Why an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    StreamClosed,
    ConnectionClosed,
    StreamError(String),
    ConnectionError(String),
    /// The transport could not be opened.
    OpenFailed(String),
    /// Non-success response status.
    Status(u16),
    /// No liveness confirmation before the initialization deadline.
    InitTimeout,
    /// Liveness failure or external request.
    Forced(String),
    /// `disconnect()` was called.
    Stopped,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamClosed => f.write_str("stream closed"),
            Self::ConnectionClosed => f.write_str("connection closed"),
            Self::StreamError(e) => write!(f, "stream error: {e}"),
            Self::ConnectionError(e) => write!(f, "connection error: {e}"),
            Self::OpenFailed(e) => write!(f, "connect failed: {e}"),
            Self::Status(code) => write!(f, "status {code}"),
            Self::InitTimeout => f.write_str("initialization timeout"),
            Self::Forced(reason) => f.write_str(reason),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Point-in-time view of a manager, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub state: ChannelState,
    pub attempt_count: u32,
    pub retry_scheduled: bool,
    pub connected: bool,
    /// Time since the last liveness confirmation.
    pub since_liveness: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_attempt_states_accept_close() {
        use ChannelState::*;
        for s in [Connecting, AwaitingBoundary, Active] {
            assert!(s.accepts_close(), "{s:?}");
        }
        for s in [Disconnected, Closing, ReconnectScheduled, Terminated] {
            assert!(!s.accepts_close(), "{s:?}");
        }
    }

    #[test]
    fn closing_still_counts_as_an_attempt() {
        assert!(ChannelState::Closing.has_attempt());
        assert!(!ChannelState::ReconnectScheduled.has_attempt());
        assert!(!ChannelState::Terminated.has_attempt());
    }

    #[test]
    fn reason_display() {
        assert_eq!(CloseReason::Status(403).to_string(), "status 403");
        assert_eq!(
            CloseReason::Forced("No pong after 30s".into()).to_string(),
            "No pong after 30s"
        );
    }
}
