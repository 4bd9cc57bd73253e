//! HTTP/2-over-TLS transport built on `h2` and `tokio-rustls`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;

use super::{
    ConnectionHandle, HandleState, OpenedStream, PingFuture, StreamHandle, StreamRequest,
    Transport, TransportError, TransportEvent,
};

const HTTPS_PORT: u16 = 443;

/// Production transport: one TLS connection, one HTTP/2 stream.
pub struct Http2Transport {
    tls: TlsConnector,
    port: u16,
}

impl Http2Transport {
    /// Build a transport trusting the bundled web PKI roots.
    pub fn new() -> Result<Self, TransportError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| TransportError::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();
        config.alpn_protocols = vec![b"h2".to_vec()];

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
            port: HTTPS_PORT,
        })
    }

    /// Connect to a non-standard port (the authority stays unchanged).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

#[async_trait]
impl Transport for Http2Transport {
    async fn open(&self, request: StreamRequest) -> Result<OpenedStream, TransportError> {
        let http_request = request.to_http()?;
        let server_name = ServerName::try_from(request.authority.clone())
            .map_err(|e| TransportError::Setup(format!("invalid server name: {e}")))?;

        tracing::debug!(host = %request.authority, port = self.port, "opening HTTP/2 connection");

        let tcp = TcpStream::connect((request.authority.as_str(), self.port)).await?;
        tcp.set_nodelay(true)?;
        let tls = self.tls.connect(server_name, tcp).await?;

        let (client, mut connection) = h2::client::handshake(tls)
            .await
            .map_err(protocol_error)?;
        let ping_pong = connection
            .ping_pong()
            .ok_or_else(|| TransportError::Protocol("ping handle unavailable".into()))?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connection_state = Arc::new(AtomicU8::new(HandleState::Open as u8));
        let stream_state = Arc::new(AtomicU8::new(HandleState::Open as u8));

        // ── Connection driver ────────────────────────────────────────
        let connection_cancel = CancellationToken::new();
        let driver = {
            let cancel = connection_cancel.clone();
            let tx = events_tx.clone();
            let state = connection_state.clone();
            tokio::spawn(async move {
                let outcome = tokio::select! {
                    r = connection => r.err().map(|e| e.to_string()),
                    _ = cancel.cancelled() => None,
                };
                mark_closed(&state);
                let event = match outcome {
                    Some(e) => TransportEvent::ConnectionError(e),
                    None => TransportEvent::ConnectionClosed,
                };
                let _ = tx.send(event);
            })
        };

        // ── Request stream ───────────────────────────────────────────
        let mut client = match client.ready().await {
            Ok(c) => c,
            Err(e) => {
                connection_cancel.cancel();
                return Err(protocol_error(e));
            }
        };
        let (response, _send_stream) = match client.send_request(http_request, true) {
            Ok(pair) => pair,
            Err(e) => {
                connection_cancel.cancel();
                return Err(protocol_error(e));
            }
        };

        let stream_cancel = CancellationToken::new();
        let reader = {
            let cancel = stream_cancel.clone();
            let tx = events_tx;
            let state = stream_state.clone();
            tokio::spawn(async move {
                // Keeps the connection's request handle alive for the
                // lifetime of the stream.
                let _client = client;
                let event = read_stream(response, &tx, &cancel).await;
                mark_closed(&state);
                let _ = tx.send(event);
            })
        };

        Ok(OpenedStream {
            connection: Box::new(Http2Connection {
                ping_pong: Arc::new(Mutex::new(ping_pong)),
                state: connection_state,
                cancel: connection_cancel,
                driver,
            }),
            stream: Box::new(Http2Stream {
                state: stream_state,
                cancel: stream_cancel,
                reader,
            }),
            events: events_rx,
        })
    }
}

/// Forward headers and body chunks until the stream ends; returns the
/// terminal event.
async fn read_stream(
    response: h2::client::ResponseFuture,
    tx: &mpsc::UnboundedSender<TransportEvent>,
    cancel: &CancellationToken,
) -> TransportEvent {
    let response = tokio::select! {
        r = response => r,
        _ = cancel.cancelled() => return TransportEvent::StreamClosed,
    };
    let response = match response {
        Ok(r) => r,
        Err(e) => return TransportEvent::StreamError(e.to_string()),
    };

    let status = response.status().as_u16();
    tracing::debug!(status, "directive stream response");
    if tx.send(TransportEvent::Response { status }).is_err() {
        return TransportEvent::StreamClosed;
    }

    let mut body = response.into_body();
    loop {
        let next = tokio::select! {
            chunk = body.data() => chunk,
            _ = cancel.cancelled() => return TransportEvent::StreamClosed,
        };
        match next {
            Some(Ok(bytes)) => {
                let _ = body.flow_control().release_capacity(bytes.len());
                if tx.send(TransportEvent::Data(bytes)).is_err() {
                    return TransportEvent::StreamClosed;
                }
            }
            Some(Err(e)) => return TransportEvent::StreamError(e.to_string()),
            None => return TransportEvent::StreamClosed,
        }
    }
}

fn protocol_error(e: h2::Error) -> TransportError {
    match e.get_io() {
        Some(io) => TransportError::Io(std::io::Error::new(io.kind(), e.to_string())),
        None => TransportError::Protocol(e.to_string()),
    }
}

fn mark_closed(state: &AtomicU8) {
    let _ = state.compare_exchange(
        HandleState::Open as u8,
        HandleState::Closed as u8,
        Ordering::SeqCst,
        Ordering::SeqCst,
    );
}

fn load(state: &AtomicU8) -> HandleState {
    HandleState::from_u8(state.load(Ordering::SeqCst))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handles
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Http2Connection {
    ping_pong: Arc<Mutex<h2::PingPong>>,
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
    driver: JoinHandle<()>,
}

impl ConnectionHandle for Http2Connection {
    fn ping(&mut self) -> Result<PingFuture, TransportError> {
        match load(&self.state) {
            HandleState::Open => {}
            HandleState::Closed => return Err(TransportError::Closed),
            HandleState::Destroyed => return Err(TransportError::Destroyed),
        }
        let ping_pong = self.ping_pong.clone();
        Ok(Box::pin(async move {
            let started = Instant::now();
            let mut ping_pong = ping_pong.lock().await;
            ping_pong
                .ping(h2::Ping::opaque())
                .await
                .map_err(protocol_error)?;
            Ok(started.elapsed())
        }))
    }

    fn close(&mut self) {
        mark_closed(&self.state);
        self.cancel.cancel();
    }

    fn destroy(&mut self) {
        self.state
            .store(HandleState::Destroyed as u8, Ordering::SeqCst);
        self.cancel.cancel();
        self.driver.abort();
    }

    fn state(&self) -> HandleState {
        load(&self.state)
    }
}

struct Http2Stream {
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

impl StreamHandle for Http2Stream {
    fn end(&mut self) {
        mark_closed(&self.state);
        self.cancel.cancel();
    }

    fn destroy(&mut self) {
        self.state
            .store(HandleState::Destroyed as u8, Ordering::SeqCst);
        self.cancel.cancel();
        self.reader.abort();
    }

    fn state(&self) -> HandleState {
        load(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_closed_does_not_resurrect_destroyed() {
        let state = AtomicU8::new(HandleState::Destroyed as u8);
        mark_closed(&state);
        assert_eq!(load(&state), HandleState::Destroyed);

        let state = AtomicU8::new(HandleState::Open as u8);
        mark_closed(&state);
        assert_eq!(load(&state), HandleState::Closed);
    }

    #[tokio::test]
    async fn rejects_invalid_authority_before_dialing() {
        let transport = Http2Transport::new().unwrap();
        let err = transport
            .open(StreamRequest::directives("not a host", "tok"))
            .await
            .err()
            .unwrap();
        assert!(err.is_setup());
    }
}
