//! Transport seam between the channel manager and the wire.
//!
//! A [`Transport`] opens one connection plus one streaming request and
//! hands back exclusive handles for both, together with an ordered event
//! channel.  The manager never touches sockets directly, which keeps the
//! lifecycle logic testable against a scripted transport.
//!
//! - [`Http2Transport`] speaks HTTP/2 over TLS (`h2` + `tokio-rustls`).

mod http2;

pub use http2::Http2Transport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

/// Path of the directive stream.
pub const DIRECTIVES_PATH: &str = "/v20160207/directives";

/// Fixed client identifier sent as `user-agent`.
pub const CLIENT_USER_AGENT: &str = "okhttp/4.3.2-SNAPSHOT";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The single streaming request issued per connection attempt.
#[derive(Clone)]
pub struct StreamRequest {
    pub authority: String,
    pub scheme: &'static str,
    pub method: http::Method,
    pub path: String,
    pub headers: Vec<(&'static str, String)>,
}

impl StreamRequest {
    /// The directive stream request for `host`, authenticated with `token`.
    pub fn directives(host: &str, token: &str) -> Self {
        Self {
            authority: host.to_string(),
            scheme: "https",
            method: http::Method::GET,
            path: DIRECTIVES_PATH.to_string(),
            headers: vec![
                ("authorization", format!("Bearer {token}")),
                ("accept-encoding", "gzip".to_string()),
                ("user-agent", CLIENT_USER_AGENT.to_string()),
            ],
        }
    }

    /// Look up a header value by (lowercase) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Build the `http::Request` for this stream.
    pub fn to_http(&self) -> Result<http::Request<()>, TransportError> {
        let uri = format!("{}://{}{}", self.scheme, self.authority, self.path);
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(uri);
        for (name, value) in &self.headers {
            builder = builder.header(*name, value.as_str());
        }
        builder
            .body(())
            .map_err(|e| TransportError::Setup(e.to_string()))
    }
}

impl std::fmt::Debug for StreamRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRequest")
            .field("authority", &self.authority)
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Events and handles
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Something that happened on the wire, delivered in arrival order.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Response headers arrived.
    Response { status: u16 },
    /// One raw chunk of the response body.
    Data(Bytes),
    StreamClosed,
    StreamError(String),
    ConnectionClosed,
    ConnectionError(String),
}

/// Lifecycle of a connection or stream handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandleState {
    Open = 0,
    Closed = 1,
    Destroyed = 2,
}

impl HandleState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Open,
            1 => Self::Closed,
            _ => Self::Destroyed,
        }
    }
}

/// Resolves with the round-trip time once the peer acknowledges a ping.
pub type PingFuture = BoxFuture<'static, Result<Duration, TransportError>>;

/// The connection half of an attempt.
pub trait ConnectionHandle: Send {
    /// Issue one transport-level ping.  An `Err` here means the ping could
    /// not even be sent.
    fn ping(&mut self) -> Result<PingFuture, TransportError>;

    /// Graceful close; a `ConnectionClosed` event follows.
    fn close(&mut self);

    /// Immediate teardown; no further events are guaranteed.
    fn destroy(&mut self);

    fn state(&self) -> HandleState;
}

/// The request-stream half of an attempt.
pub trait StreamHandle: Send {
    /// Graceful end; a `StreamClosed` event follows.
    fn end(&mut self);

    fn destroy(&mut self);

    fn state(&self) -> HandleState;
}

/// Everything a successful [`Transport::open`] hands to the manager.
pub struct OpenedStream {
    pub connection: Box<dyn ConnectionHandle>,
    pub stream: Box<dyn StreamHandle>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens the connection and issues the streaming request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: StreamRequest) -> Result<OpenedStream, TransportError>;
}

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request or connection could not even be constructed.
    #[error("setup: {0}")]
    Setup(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS: {0}")]
    Tls(String),

    #[error("HTTP/2: {0}")]
    Protocol(String),

    #[error("connection closed")]
    Closed,

    #[error("connection destroyed")]
    Destroyed,
}

impl TransportError {
    /// Setup failures abandon the attempt without scheduling a retry.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_request_carries_fixed_attributes() {
        let req = StreamRequest::directives("bob-dispatch-prod-eu.amazon.com", "tok");
        assert_eq!(req.method, http::Method::GET);
        assert_eq!(req.path, "/v20160207/directives");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        assert_eq!(req.header("accept-encoding"), Some("gzip"));
        assert_eq!(req.header("user-agent"), Some("okhttp/4.3.2-SNAPSHOT"));
    }

    #[test]
    fn to_http_uses_absolute_uri() {
        let req = StreamRequest::directives("example.net", "tok");
        let http_req = req.to_http().unwrap();
        assert_eq!(
            http_req.uri().to_string(),
            "https://example.net/v20160207/directives"
        );
        assert_eq!(http_req.headers()["authorization"], "Bearer tok");
    }

    #[test]
    fn invalid_authority_is_a_setup_error() {
        let req = StreamRequest::directives("bad host name", "tok");
        let err = req.to_http().unwrap_err();
        assert!(err.is_setup());
    }

    #[test]
    fn debug_hides_token() {
        let req = StreamRequest::directives("example.net", "secret-token");
        assert!(!format!("{req:?}").contains("secret-token"));
    }
}
