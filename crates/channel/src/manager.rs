//! The channel manager: a single task that owns every piece of channel
//! state and processes [`Input`]s one at a time.
//!
//! Transport events, timer firings and caller requests all arrive on one
//! queue, so there is never more than one writer.  Inputs that belong to a
//! superseded attempt carry an old `generation` and are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::credentials::CredentialProvider;
use crate::decoder::{self, Chunk};
use crate::endpoint::resolve_endpoint;
use crate::events::EventBus;
use crate::keepalive::{KeepaliveTimings, Liveness};
use crate::reconnect::ReconnectPolicy;
use crate::state::{ChannelState, ChannelStatus, CloseReason};
use crate::timer::TaskSlot;
use crate::transport::{
    ConnectionHandle, HandleState, OpenedStream, StreamHandle, StreamRequest, Transport,
    TransportError, TransportEvent,
};
use crate::types::{ChannelEvent, ProbeError};

/// Receives human-readable lifecycle lines.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

const GIVE_UP_MESSAGE: &str = "Too many failed retries. Check credentials and configuration";

/// Immutable configuration of a manager.
pub(crate) struct Settings {
    pub endpoint_override: Option<String>,
    pub region: Option<String>,
    pub policy: ReconnectPolicy,
    pub timings: KeepaliveTimings,
    pub credentials: Arc<dyn CredentialProvider>,
    pub transport: Arc<dyn Transport>,
    pub logger: Option<LogSink>,
}

pub(crate) type ProbeReply = oneshot::Sender<Result<Duration, ProbeError>>;

pub(crate) enum Input {
    Connect,
    RetryDue,
    TokenReady {
        generation: u64,
        token: Option<String>,
    },
    Opened {
        generation: u64,
        result: Result<OpenedStream, TransportError>,
    },
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    AuthRefreshed {
        generation: u64,
        token: Option<String>,
    },
    InitDeadline {
        generation: u64,
    },
    PingTick {
        generation: u64,
    },
    Pong {
        generation: u64,
        result: Result<Duration, TransportError>,
        periodic: bool,
    },
    PongDeadline {
        generation: u64,
    },
    PongGraceExpired {
        generation: u64,
    },
    Probe {
        reply: ProbeReply,
    },
    ProbeDone {
        generation: u64,
        result: Result<Duration, ProbeError>,
        reply: ProbeReply,
    },
    LiveCheck {
        reply: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<ChannelStatus>,
    },
    ForceClose {
        reason: String,
    },
    Disconnect,
    Shutdown,
}

/// Connection and stream of the current attempt; never reused.
struct TransportHandles {
    connection: Box<dyn ConnectionHandle>,
    stream: Box<dyn StreamHandle>,
}

impl TransportHandles {
    fn destroy(mut self) {
        self.stream.destroy();
        self.connection.destroy();
    }
}

pub(crate) struct ChannelManager {
    settings: Settings,
    state: ChannelState,
    /// Set by `disconnect()`; cleared by an explicit `connect()`.
    stop: bool,
    generation: u64,
    token: Option<String>,
    attempt_count: u32,
    /// Set by a 403: the retry flavor the next close of this attempt uses.
    auth_rejected: Option<bool>,
    handles: Option<TransportHandles>,
    liveness: Liveness,
    retry_timer: TaskSlot,
    init_deadline: TaskSlot,
    ping_cycle: TaskSlot,
    pong_deadline: TaskSlot,
    event_pump: TaskSlot,
    connected: Arc<AtomicBool>,
    bus: EventBus,
    inputs: mpsc::UnboundedSender<Input>,
}

impl ChannelManager {
    pub fn new(
        settings: Settings,
        connected: Arc<AtomicBool>,
        bus: EventBus,
        inputs: mpsc::UnboundedSender<Input>,
    ) -> Self {
        Self {
            settings,
            state: ChannelState::Disconnected,
            stop: false,
            generation: 0,
            token: None,
            attempt_count: 0,
            auth_rejected: None,
            handles: None,
            liveness: Liveness::default(),
            retry_timer: TaskSlot::default(),
            init_deadline: TaskSlot::default(),
            ping_cycle: TaskSlot::default(),
            pong_deadline: TaskSlot::default(),
            event_pump: TaskSlot::default(),
            connected,
            bus,
            inputs,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>) {
        while let Some(input) = rx.recv().await {
            if let Input::Shutdown = input {
                tracing::debug!("channel handle dropped, shutting down");
                self.disconnect();
                break;
            }
            self.handle(input);
        }
    }

    fn handle(&mut self, input: Input) {
        match input {
            Input::Connect => self.connect(true),
            Input::RetryDue => {
                if self.retry_timer.is_armed() {
                    self.retry_timer.clear();
                    self.connect(false);
                }
            }
            Input::TokenReady { generation, token } => self.on_token(generation, token),
            Input::Opened { generation, result } => self.on_opened(generation, result),
            Input::Transport { generation, event } => self.on_transport_event(generation, event),
            Input::AuthRefreshed { generation, token } => self.on_auth_refreshed(generation, token),
            Input::InitDeadline { generation } => self.on_init_deadline(generation),
            Input::PingTick { generation } => self.on_ping_tick(generation),
            Input::Pong {
                generation,
                result,
                periodic,
            } => self.on_pong(generation, result, periodic),
            Input::PongDeadline { generation } => self.on_pong_deadline(generation),
            Input::PongGraceExpired { generation } => self.on_pong_grace_expired(generation),
            Input::Probe { reply } => self.probe(reply),
            Input::ProbeDone {
                generation,
                result,
                reply,
            } => self.on_probe_done(generation, result, reply),
            Input::LiveCheck { reply } => {
                let live = self.is_live();
                let _ = reply.send(live);
            }
            Input::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Input::ForceClose { reason } => self.force_close(reason),
            Input::Disconnect => self.disconnect(),
            Input::Shutdown => self.disconnect(),
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn emit(&self, event: ChannelEvent) {
        self.bus.emit(event);
    }

    fn note(&self, line: &str) {
        if let Some(sink) = &self.settings.logger {
            sink(line);
        }
    }

    fn set_connected(&self, value: bool) {
        self.connected.store(value, Ordering::SeqCst);
    }

    /// Input belongs to the attempt that is still running.
    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.state.accepts_close()
    }

    /// Closure that feeds `input` back into the queue when a timer fires.
    fn schedule(&self, input: Input) -> impl FnOnce() + Send + 'static {
        let tx = self.inputs.clone();
        move || {
            let _ = tx.send(input);
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Connection lifecycle
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn connect(&mut self, explicit: bool) {
        if explicit {
            self.stop = false;
        } else if self.stop {
            return;
        }
        if self.state.has_attempt() {
            tracing::debug!(state = ?self.state, "connect ignored: attempt in progress");
            return;
        }

        self.retry_timer.cancel();
        self.generation += 1;
        self.state = ChannelState::Connecting;
        self.auth_rejected = None;
        self.liveness.reset_attempt();

        tracing::debug!(
            generation = self.generation,
            attempt = self.attempt_count,
            "requesting access token"
        );

        let generation = self.generation;
        let credentials = self.settings.credentials.clone();
        let tx = self.inputs.clone();
        tokio::spawn(async move {
            let token = credentials.access_token().await;
            let _ = tx.send(Input::TokenReady { generation, token });
        });
    }

    fn on_token(&mut self, generation: u64, token: Option<String>) {
        if generation != self.generation || self.state != ChannelState::Connecting {
            return;
        }
        match token {
            Some(token) => self.token = Some(token),
            None => tracing::warn!("credential provider returned no token, reusing the previous one"),
        }

        let host = resolve_endpoint(
            self.settings.endpoint_override.as_deref(),
            self.settings.region.as_deref(),
        );
        tracing::info!(host = %host, generation, "opening directive stream");
        self.note(&format!("Use host {host}"));

        let request = StreamRequest::directives(&host, self.token.as_deref().unwrap_or_default());

        let fire = self.schedule(Input::InitDeadline { generation });
        self.init_deadline.arm(self.settings.timings.init_timeout, fire);

        let transport = self.settings.transport.clone();
        let tx = self.inputs.clone();
        tokio::spawn(async move {
            let result = transport.open(request).await;
            let _ = tx.send(Input::Opened { generation, result });
        });
    }

    fn on_opened(&mut self, generation: u64, result: Result<OpenedStream, TransportError>) {
        if generation != self.generation || self.state != ChannelState::Connecting {
            if let Ok(opened) = result {
                tracing::debug!(generation, "discarding connection of a superseded attempt");
                TransportHandles {
                    connection: opened.connection,
                    stream: opened.stream,
                }
                .destroy();
            }
            return;
        }

        match result {
            Ok(opened) => {
                let OpenedStream {
                    connection,
                    stream,
                    mut events,
                } = opened;
                self.handles = Some(TransportHandles { connection, stream });

                let tx = self.inputs.clone();
                self.event_pump.spawn(async move {
                    while let Some(event) = events.recv().await {
                        if tx.send(Input::Transport { generation, event }).is_err() {
                            break;
                        }
                    }
                });
                self.state = ChannelState::AwaitingBoundary;
                tracing::debug!(generation, "directive stream open");
            }
            Err(e) if e.is_setup() => {
                tracing::error!(error = %e, "connection setup failed, attempt abandoned");
                self.note(&format!("Error on Init {e}"));
                self.init_deadline.cancel();
                self.state = ChannelState::Disconnected;
                self.emit(ChannelEvent::Error {
                    message: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "connection failed");
                self.emit(ChannelEvent::Error {
                    message: e.to_string(),
                });
                self.close(CloseReason::OpenFailed(e.to_string()), false);
            }
        }
    }

    fn on_transport_event(&mut self, generation: u64, event: TransportEvent) {
        if !self.is_current(generation) {
            return;
        }
        match event {
            TransportEvent::Response { status } => self.on_response(status),
            TransportEvent::Data(bytes) => self.on_data(&bytes),
            TransportEvent::StreamClosed => self.close(CloseReason::StreamClosed, false),
            TransportEvent::ConnectionClosed => self.close(CloseReason::ConnectionClosed, false),
            TransportEvent::StreamError(e) => {
                tracing::warn!(error = %e, "stream error");
                self.note(&format!("Stream-Error: {e}"));
                self.emit(ChannelEvent::Error { message: e.clone() });
                self.close(CloseReason::StreamError(e), false);
            }
            TransportEvent::ConnectionError(e) => {
                tracing::warn!(error = %e, "connection error");
                self.note(&format!("Client-Error: {e}"));
                self.emit(ChannelEvent::Error { message: e.clone() });
                self.close(CloseReason::ConnectionError(e), false);
            }
        }
    }

    /// The close path.  Every terminal condition ends up here; only the
    /// first trigger of an attempt does anything.
    fn close(&mut self, reason: CloseReason, immediate: bool) {
        if !self.state.accepts_close() {
            tracing::debug!(state = ?self.state, reason = %reason, "close already handled");
            return;
        }
        self.state = ChannelState::Closing;
        self.set_connected(false);

        // The server usually ends the stream right after a 403, before the
        // refresh completes.
        let (reason, immediate) = match self.auth_rejected.take() {
            Some(fast) => (CloseReason::Status(403), fast),
            None => (reason, immediate),
        };

        if let Some(handles) = self.handles.take() {
            handles.destroy();
        }
        self.event_pump.cancel();
        self.init_deadline.cancel();
        self.ping_cycle.cancel();
        self.pong_deadline.cancel();
        self.liveness.reset_attempt();

        tracing::info!(reason = %reason, generation = self.generation, "channel closed");
        self.note(&format!("Close: {reason}"));

        if self.stop {
            self.state = ChannelState::Terminated;
            return;
        }

        self.attempt_count = self.attempt_count.saturating_add(1);
        if self.settings.policy.should_give_up(self.attempt_count) {
            tracing::error!(attempts = self.attempt_count, "reconnect attempts exhausted");
            self.note(GIVE_UP_MESSAGE);
            self.state = ChannelState::Terminated;
            self.emit(ChannelEvent::Disconnect {
                retryable: false,
                message: GIVE_UP_MESSAGE.into(),
            });
            return;
        }

        let delay = self
            .settings
            .policy
            .delay_for_attempt(self.attempt_count, immediate);
        tracing::info!(
            delay_secs = delay.as_secs(),
            attempt = self.attempt_count,
            "reconnect scheduled"
        );
        let message = format!("Retry Connection in {}s ({reason})", delay.as_secs());
        self.note(&message);

        let fire = self.schedule(Input::RetryDue);
        self.retry_timer.arm(delay, fire);
        self.state = ChannelState::ReconnectScheduled;
        self.emit(ChannelEvent::Disconnect {
            retryable: true,
            message,
        });
    }

    fn disconnect(&mut self) {
        self.stop = true;
        self.retry_timer.cancel();
        self.init_deadline.cancel();
        if self.state.accepts_close() {
            self.close(CloseReason::Stopped, false);
        } else if self.state != ChannelState::Terminated {
            self.state = ChannelState::Terminated;
        }
        self.set_connected(false);
    }

    fn force_close(&mut self, reason: String) {
        tracing::info!(reason = %reason, "force closing");
        self.note(&format!("Force closing - {reason}"));
        self.set_connected(false);
        if self.state.accepts_close() {
            self.close(CloseReason::Forced(reason), false);
        } else {
            tracing::debug!(state = ?self.state, "force close: no attempt to close");
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Credential refresh
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn on_response(&mut self, status: u16) {
        match status {
            200 => tracing::debug!("directive stream accepted"),
            403 => {
                tracing::warn!(status, "authentication rejected, refreshing token");
                self.note("Error 403, refreshing token");
                self.auth_rejected = Some(
                    self.settings
                        .policy
                        .auth_retry_is_immediate(self.attempt_count),
                );
                let generation = self.generation;
                let credentials = self.settings.credentials.clone();
                let tx = self.inputs.clone();
                tokio::spawn(async move {
                    let token = credentials.refresh().await;
                    let _ = tx.send(Input::AuthRefreshed { generation, token });
                });
            }
            other => {
                tracing::warn!(status = other, "unexpected response status");
                self.close(CloseReason::Status(other), false);
            }
        }
    }

    fn on_auth_refreshed(&mut self, generation: u64, token: Option<String>) {
        if let Some(token) = token {
            self.token = Some(token);
        }
        if !self.is_current(generation) {
            return;
        }
        self.close(CloseReason::Status(403), false);
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Stream decoding
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn on_data(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        match decoder::classify(&text) {
            Chunk::Boundary => self.on_boundary(),
            Chunk::Json(part) => {
                for outcome in decoder::decode_json_part(part) {
                    match outcome {
                        Ok(directive) => {
                            tracing::debug!(command = %directive.command, "directive received");
                            self.note(&format!(
                                "Command {}: {}",
                                directive.command, directive.payload
                            ));
                            self.emit(ChannelEvent::Command(directive));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "unexpected response");
                            self.note(&format!("Unexpected Response {e}"));
                            self.emit(ChannelEvent::UnexpectedResponse {
                                message: e.to_string(),
                            });
                        }
                    }
                }
            }
            Chunk::Other => tracing::trace!(len = bytes.len(), "ignoring chunk"),
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Keepalive
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn on_boundary(&mut self) {
        if self.liveness.cycle_armed {
            return;
        }
        self.liveness.cycle_armed = true;
        self.state = ChannelState::Active;

        if !self.send_ping(false) {
            return;
        }

        let generation = self.generation;
        let period = self.settings.timings.ping_interval;
        let tx = self.inputs.clone();
        self.ping_cycle.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if tx.send(Input::PingTick { generation }).is_err() {
                    break;
                }
            }
        });
    }

    /// Issue one ping; the pong comes back as [`Input::Pong`].  A ping that
    /// cannot be sent force-closes the attempt and returns `false`.
    fn send_ping(&mut self, periodic: bool) -> bool {
        let Some(handles) = self.handles.as_mut() else {
            return false;
        };
        match handles.connection.ping() {
            Ok(pong) => {
                let generation = self.generation;
                let tx = self.inputs.clone();
                tokio::spawn(async move {
                    let result = pong.await;
                    let _ = tx.send(Input::Pong {
                        generation,
                        result,
                        periodic,
                    });
                });
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "ping could not be sent");
                self.note(&format!("Error on Ping {e}"));
                self.force_close("Ping exception".into());
                false
            }
        }
    }

    fn on_ping_tick(&mut self, generation: u64) {
        if generation != self.generation || self.state != ChannelState::Active {
            return;
        }
        tracing::debug!("sending ping");
        if !self.send_ping(true) {
            return;
        }
        self.liveness.ping_sent_at = Some(Instant::now());

        let timeout = self.settings.timings.pong_timeout;
        let fire = self.schedule(Input::PongDeadline { generation });
        self.pong_deadline.arm(timeout, fire);
    }

    fn on_pong(&mut self, generation: u64, result: Result<Duration, TransportError>, periodic: bool) {
        if !self.is_current(generation) {
            return;
        }
        match result {
            Ok(rtt) => {
                tracing::trace!(rtt_ms = rtt.as_millis() as u64, "pong");
                self.confirm_liveness(periodic);
            }
            Err(e) => tracing::warn!(error = %e, "ping failed"),
        }
    }

    /// A pong arrived: refresh liveness and, on the first one of the
    /// attempt, declare the channel up.
    fn confirm_liveness(&mut self, periodic: bool) {
        self.liveness.confirm(Instant::now());
        self.pong_deadline.cancel();
        self.set_connected(true);

        let first = self.init_deadline.cancel();
        if first || periodic {
            self.attempt_count = 0;
        }
        if first {
            tracing::info!(generation = self.generation, "channel initialized");
            self.note("Initialization completed");
            self.emit(ChannelEvent::Connect);
        }
    }

    fn on_pong_deadline(&mut self, generation: u64) {
        if generation != self.generation
            || self.state != ChannelState::Active
            || !self.pong_deadline.is_armed()
        {
            return;
        }
        self.pong_deadline.clear();

        let now = Instant::now();
        let timings = &self.settings.timings;
        if self.liveness.confirmed_within(now, timings.pong_grace) {
            tracing::debug!("pong deadline passed after a recent confirmation, false alarm");
            self.note("Pong received late, false alarm");
            return;
        }

        let remaining = self.liveness.grace_remaining(now, timings.pong_grace);
        if remaining.is_zero() {
            let reason = format!("No pong after {}s", timings.pong_timeout.as_secs());
            self.force_close(reason);
            return;
        }

        tracing::debug!(
            remaining_ms = remaining.as_millis() as u64,
            "no pong yet, waiting out the grace margin"
        );
        let fire = self.schedule(Input::PongGraceExpired { generation });
        self.pong_deadline.arm(remaining, fire);
    }

    fn on_pong_grace_expired(&mut self, generation: u64) {
        if generation != self.generation
            || self.state != ChannelState::Active
            || !self.pong_deadline.is_armed()
        {
            return;
        }
        self.pong_deadline.clear();
        if self.liveness.ping_sent_at.is_none() {
            return;
        }
        let reason = format!(
            "No pong after {}s",
            self.settings.timings.pong_timeout.as_secs()
        );
        self.note(&reason);
        self.force_close(reason);
    }

    fn on_init_deadline(&mut self, generation: u64) {
        // A deadline cancelled after it fired still has its input queued.
        if generation != self.generation || !self.init_deadline.is_armed() {
            return;
        }
        self.init_deadline.clear();
        if !self.state.accepts_close() {
            return;
        }
        let secs = self.settings.timings.init_timeout.as_secs();
        tracing::warn!(timeout_secs = secs, "initialization not done in time");
        self.note(&format!("Initialization not done within {secs}s"));
        self.close(CloseReason::InitTimeout, false);
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Liveness queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn probe(&mut self, reply: ProbeReply) {
        let started = match self.handles.as_mut() {
            None => Err(ProbeError::ConnectionMissing),
            Some(h) => match (h.connection.state(), h.stream.state()) {
                (HandleState::Destroyed, _) => Err(ProbeError::ConnectionDestroyed),
                (HandleState::Closed, _) => Err(ProbeError::ConnectionClosed),
                (_, HandleState::Destroyed) => Err(ProbeError::StreamDestroyed),
                (_, HandleState::Closed) => Err(ProbeError::StreamClosed),
                _ => h
                    .connection
                    .ping()
                    .map_err(|e| ProbeError::Transport(e.to_string())),
            },
        };

        let pong = match started {
            Ok(pong) => pong,
            Err(e) => {
                tracing::debug!(error = %e, "probe failed");
                self.note(&format!("Ping failed - {e}"));
                if e != ProbeError::ConnectionMissing {
                    self.set_connected(false);
                }
                let _ = reply.send(Err(e));
                return;
            }
        };

        let generation = self.generation;
        let timeout = self.settings.timings.probe_timeout;
        let tx = self.inputs.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, pong).await {
                Ok(Ok(rtt)) => Ok(rtt),
                Ok(Err(e)) => Err(ProbeError::Transport(e.to_string())),
                Err(_) => Err(ProbeError::Timeout(timeout.as_secs())),
            };
            let _ = tx.send(Input::ProbeDone {
                generation,
                result,
                reply,
            });
        });
    }

    fn on_probe_done(
        &mut self,
        generation: u64,
        result: Result<Duration, ProbeError>,
        reply: ProbeReply,
    ) {
        if generation == self.generation {
            match &result {
                Ok(rtt) => {
                    tracing::debug!(rtt_ms = rtt.as_millis() as u64, "probe succeeded");
                    self.note(&format!("Ping successful ({}ms)", rtt.as_millis()));
                    self.liveness.last_liveness = Some(Instant::now());
                    self.set_connected(true);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "probe failed");
                    self.note(&format!("Ping failed - {e}"));
                    self.set_connected(false);
                }
            }
        }
        let _ = reply.send(result);
    }

    /// Full re-derivation of liveness from every piece of state.
    fn is_live(&mut self) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        let Some(handles) = &self.handles else {
            return false;
        };
        if handles.connection.state() != HandleState::Open
            || handles.stream.state() != HandleState::Open
        {
            return false;
        }
        if self.retry_timer.is_armed() || self.init_deadline.is_armed() {
            return false;
        }
        if !self.state.accepts_close() {
            return false;
        }
        if self
            .liveness
            .is_stale(Instant::now(), self.settings.timings.stale_after)
        {
            tracing::info!("no liveness confirmation for too long, marking disconnected");
            self.note("Last pong too old, marking as disconnected");
            self.set_connected(false);
            return false;
        }
        true
    }

    fn status(&self) -> ChannelStatus {
        ChannelStatus {
            state: self.state,
            attempt_count: self.attempt_count,
            retry_scheduled: self.retry_timer.is_armed(),
            connected: self.connected.load(Ordering::SeqCst),
            since_liveness: self.liveness.last_liveness.map(|t| t.elapsed()),
        }
    }
}
