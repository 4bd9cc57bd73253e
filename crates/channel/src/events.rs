//! Publish/subscribe for [`ChannelEvent`]s.
//!
//! Handlers run synchronously on the manager task, in registration order,
//! for every event in emission order.  They must not block.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::types::{ChannelEvent, EventKind};

pub type EventHandler = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    by_kind: HashMap<EventKind, Vec<EventHandler>>,
    any: Vec<EventHandler>,
    /// Pruned once their receiver is dropped.
    subscribers: Vec<mpsc::UnboundedSender<ChannelEvent>>,
}

/// Registered handler lists, shared between the public handle and the
/// manager task.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<Handlers>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one kind of event.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .by_kind
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Register a handler for every event.
    pub fn on_any<F>(&self, handler: F)
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.handlers.write().any.push(Arc::new(handler));
    }

    /// Forward every event into an unbounded channel.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChannelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.handlers.write().subscribers.push(tx);
        rx
    }

    /// Deliver `event` to the per-kind handlers, the catch-all ones, then
    /// the subscribers.
    pub(crate) fn emit(&self, event: ChannelEvent) {
        // Snapshot so a handler may register further handlers.
        let targets: Vec<EventHandler> = {
            let handlers = self.handlers.read();
            handlers
                .by_kind
                .get(&event.kind())
                .into_iter()
                .flatten()
                .chain(handlers.any.iter())
                .cloned()
                .collect()
        };
        for handler in targets {
            handler(&event);
        }
        self.handlers
            .write()
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
