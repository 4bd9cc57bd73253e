//! Public handle to a push channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::events::EventBus;
use crate::manager::{ChannelManager, Input, Settings};
use crate::state::ChannelStatus;
use crate::types::{ChannelError, ChannelEvent, EventKind, ProbeError};

/// A self-healing directive channel.
///
/// Create via [`PushChannelBuilder`](crate::builder::PushChannelBuilder).
/// Cloning is cheap; all clones drive the same channel.  The background
/// task stops when the last clone is dropped.
#[derive(Clone)]
pub struct PushChannel {
    inner: Arc<Inner>,
}

struct Inner {
    inputs: mpsc::UnboundedSender<Input>,
    connected: Arc<AtomicBool>,
    bus: EventBus,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let _ = self.inputs.send(Input::Shutdown);
    }
}

impl PushChannel {
    /// Start a new builder.
    pub fn builder() -> crate::builder::PushChannelBuilder {
        crate::builder::PushChannelBuilder::new()
    }

    /// Spawn the manager task.  Must be called inside a tokio runtime.
    pub(crate) fn spawn(settings: Settings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let bus = EventBus::new();

        let manager = ChannelManager::new(settings, connected.clone(), bus.clone(), tx.clone());
        tokio::spawn(manager.run(rx));

        Self {
            inner: Arc::new(Inner {
                inputs: tx,
                connected,
                bus,
            }),
        }
    }

    fn send(&self, input: Input) -> Result<(), ChannelError> {
        self.inner
            .inputs
            .send(input)
            .map_err(|_| ChannelError::Shutdown)
    }

    /// Start an attempt.  A no-op while one is in flight; clears a previous
    /// [`disconnect`](Self::disconnect).
    pub fn connect(&self) {
        if self.send(Input::Connect).is_err() {
            tracing::warn!("connect on a shut down channel");
        }
    }

    /// Stop for good: tear down the current attempt and cancel any pending
    /// retry.  Idempotent.
    pub fn disconnect(&self) {
        let _ = self.send(Input::Disconnect);
    }

    /// Tear down the current attempt through the normal close path, which
    /// schedules a retry.  A no-op when nothing is open.
    pub fn force_close(&self, reason: impl Into<String>) {
        let _ = self.send(Input::ForceClose {
            reason: reason.into(),
        });
    }

    /// Cached liveness flag.  Cheap; may lag behind reality.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Re-derives liveness from the handles, pending timers and the last
    /// confirmation.  Marks the channel disconnected when it went stale.
    pub async fn is_connected_v2(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.send(Input::LiveCheck { reply }).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Active probe: ping the server and wait for the pong.
    pub async fn ping(&self) -> Result<Duration, ProbeError> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::Probe { reply })
            .map_err(|_| ProbeError::Shutdown)?;
        rx.await.map_err(|_| ProbeError::Shutdown)?
    }

    pub async fn status(&self) -> Result<ChannelStatus, ChannelError> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::Status { reply })?;
        rx.await.map_err(|_| ChannelError::Shutdown)
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Register a handler for one kind of event.
    pub fn on<F>(&self, kind: EventKind, f: F)
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.inner.bus.on(kind, f);
    }

    /// Register a handler for every event.
    pub fn on_any<F>(&self, f: F)
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.inner.bus.on_any(f);
    }

    /// Receive every event from now on through a channel.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChannelEvent> {
        self.inner.bus.subscribe()
    }
}

impl std::fmt::Debug for PushChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushChannel")
            .field("connected", &self.is_connected())
            .finish()
    }
}
