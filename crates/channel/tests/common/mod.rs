//! In-memory transport for driving a [`PushChannel`] from tests.
//!
//! Every `open()` is reported to the test as an [`Attempt`]; the test
//! then plays the server by pushing [`TransportEvent`]s.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::FutureExt;
use parking_lot::Mutex;
use pw_channel::transport::{
    ConnectionHandle, HandleState, OpenedStream, PingFuture, StreamHandle, StreamRequest,
    TransportEvent,
};
use pw_channel::{ChannelEvent, Transport, TransportError};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// How the fake server answers pings.
#[derive(Debug, Clone, Copy)]
pub enum PongMode {
    Immediate,
    After(Duration),
    Never,
}

/// What the next `open()` does.
#[derive(Debug, Clone)]
pub enum OpenMode {
    Succeed,
    Fail,
    SetupFail,
}

struct Shared {
    pong: Mutex<PongMode>,
    open: Mutex<OpenMode>,
    ping_fails: AtomicBool,
    attempts: mpsc::UnboundedSender<Attempt>,
}

#[derive(Clone)]
pub struct FakeTransport {
    shared: Arc<Shared>,
}

/// One `open()` call as seen by the fake server.
pub struct Attempt {
    pub request: StreamRequest,
    pub at: Instant,
    pub events: Option<mpsc::UnboundedSender<TransportEvent>>,
    pub connection_state: Arc<AtomicU8>,
    pub stream_state: Arc<AtomicU8>,
    pub destroys: Arc<AtomicU32>,
    pub pings: Arc<AtomicU32>,
}

impl Attempt {
    pub fn send(&self, event: TransportEvent) {
        self.events
            .as_ref()
            .expect("attempt has no stream")
            .send(event)
            .expect("channel dropped the stream");
    }

    pub fn respond(&self, status: u16) {
        self.send(TransportEvent::Response { status });
    }

    pub fn data(&self, chunk: &str) {
        self.send(TransportEvent::Data(Bytes::from(chunk.to_owned())));
    }

    /// 200 plus the first multipart boundary: starts the keepalive cycle.
    pub fn accept(&self) {
        self.respond(200);
        self.data("------abcdefghijklmnop\r\n");
    }

    pub fn destroyed(&self) -> bool {
        self.connection_state.load(Ordering::SeqCst) == HandleState::Destroyed as u8
    }
}

impl FakeTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Attempt>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            pong: Mutex::new(PongMode::Immediate),
            open: Mutex::new(OpenMode::Succeed),
            ping_fails: AtomicBool::new(false),
            attempts: tx,
        });
        (Self { shared }, rx)
    }

    pub fn set_pong(&self, mode: PongMode) {
        *self.shared.pong.lock() = mode;
    }

    pub fn set_open(&self, mode: OpenMode) {
        *self.shared.open.lock() = mode;
    }

    /// Make `ping()` itself fail, as if the frame could not be written.
    pub fn set_ping_fails(&self, fails: bool) {
        self.shared.ping_fails.store(fails, Ordering::SeqCst);
    }
}

struct FakeConnection {
    state: Arc<AtomicU8>,
    destroys: Arc<AtomicU32>,
    pings: Arc<AtomicU32>,
    shared: Arc<Shared>,
}

impl ConnectionHandle for FakeConnection {
    fn ping(&mut self) -> Result<PingFuture, TransportError> {
        if self.state() != HandleState::Open {
            return Err(TransportError::Closed);
        }
        if self.shared.ping_fails.load(Ordering::SeqCst) {
            return Err(TransportError::Protocol("send_ping: user error".into()));
        }
        self.pings.fetch_add(1, Ordering::SeqCst);
        let mode = *self.shared.pong.lock();
        Ok(async move {
            match mode {
                PongMode::Immediate => Ok(Duration::from_millis(1)),
                PongMode::After(d) => {
                    tokio::time::sleep(d).await;
                    Ok(d)
                }
                PongMode::Never => futures_util::future::pending().await,
            }
        }
        .boxed())
    }

    fn close(&mut self) {
        let _ = self.state.compare_exchange(
            HandleState::Open as u8,
            HandleState::Closed as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn destroy(&mut self) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        self.state.store(HandleState::Destroyed as u8, Ordering::SeqCst);
    }

    fn state(&self) -> HandleState {
        state_of(&self.state)
    }
}

struct FakeStream {
    state: Arc<AtomicU8>,
}

impl StreamHandle for FakeStream {
    fn end(&mut self) {
        self.state.store(HandleState::Closed as u8, Ordering::SeqCst);
    }

    fn destroy(&mut self) {
        self.state.store(HandleState::Destroyed as u8, Ordering::SeqCst);
    }

    fn state(&self) -> HandleState {
        state_of(&self.state)
    }
}

fn state_of(cell: &AtomicU8) -> HandleState {
    match cell.load(Ordering::SeqCst) {
        0 => HandleState::Open,
        1 => HandleState::Closed,
        _ => HandleState::Destroyed,
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, request: StreamRequest) -> Result<OpenedStream, TransportError> {
        let mode = self.shared.open.lock().clone();
        let connection_state = Arc::new(AtomicU8::new(HandleState::Open as u8));
        let stream_state = Arc::new(AtomicU8::new(HandleState::Open as u8));
        let destroys = Arc::new(AtomicU32::new(0));
        let pings = Arc::new(AtomicU32::new(0));

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let succeed = matches!(mode, OpenMode::Succeed);
        let _ = self.shared.attempts.send(Attempt {
            request,
            at: Instant::now(),
            events: succeed.then(|| events_tx),
            connection_state: connection_state.clone(),
            stream_state: stream_state.clone(),
            destroys: destroys.clone(),
            pings: pings.clone(),
        });

        match mode {
            OpenMode::Succeed => Ok(OpenedStream {
                connection: Box::new(FakeConnection {
                    state: connection_state,
                    destroys,
                    pings,
                    shared: self.shared.clone(),
                }),
                stream: Box::new(FakeStream {
                    state: stream_state,
                }),
                events: events_rx,
            }),
            OpenMode::Fail => Err(TransportError::Protocol("connection refused".into())),
            OpenMode::SetupFail => Err(TransportError::Setup("invalid header value".into())),
        }
    }
}

// ── Payload helpers ─────────────────────────────────────────────────

pub fn json_part(updates: Value) -> String {
    let doc = json!({
        "directive": {
            "header": { "namespace": "PushMessage", "name": "RenderingUpdate" },
            "payload": { "renderingUpdates": updates }
        }
    });
    format!("Content-Type: application/json\r\n\r\n{doc}\r\n")
}

pub fn update(command: &str, payload: Value) -> Value {
    let metadata = json!({ "command": command, "payload": payload.to_string() });
    json!({ "resourceId": "r1", "resourceMetadata": metadata.to_string() })
}

// ── Event helpers ───────────────────────────────────────────────────

/// Next event, failing the test if none arrives within `within`.
pub async fn next_event(
    rx: &mut mpsc::UnboundedReceiver<ChannelEvent>,
    within: Duration,
) -> ChannelEvent {
    tokio::time::timeout(within, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event bus closed")
}

/// Skip events until one matches.
pub async fn wait_for<F>(
    rx: &mut mpsc::UnboundedReceiver<ChannelEvent>,
    within: Duration,
    mut pred: F,
) -> ChannelEvent
where
    F: FnMut(&ChannelEvent) -> bool,
{
    let deadline = Instant::now() + within;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        let event = next_event(rx, left).await;
        if pred(&event) {
            return event;
        }
    }
}

pub async fn next_attempt(rx: &mut mpsc::UnboundedReceiver<Attempt>, within: Duration) -> Attempt {
    tokio::time::timeout(within, rx.recv())
        .await
        .expect("timed out waiting for a connection attempt")
        .expect("transport dropped")
}

/// Assert no attempt is made within `within`.
pub async fn no_attempt(rx: &mut mpsc::UnboundedReceiver<Attempt>, within: Duration) {
    if let Ok(Some(a)) = tokio::time::timeout(within, rx.recv()).await {
        panic!("unexpected connection attempt to {}", a.request.authority);
    }
}

pub fn is_disconnect(e: &ChannelEvent) -> bool {
    matches!(e, ChannelEvent::Disconnect { .. })
}
