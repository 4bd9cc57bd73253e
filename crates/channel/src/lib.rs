//! `pw-channel`: persistent client for a server-push directive channel.
//!
//! One long-lived HTTP/2 GET stream carries multipart chunks; JSON parts
//! hold directives that are decoded and emitted as events.  The channel
//! keeps itself alive: it pings on a fixed cadence, treats missing pongs
//! as a dead connection, and reconnects with a linear back-off.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  Input   ┌──────────────────────────────────────────┐
//! │ PushChannel  │ ───────▶ │ ChannelManager (one task, owns all state) │
//! │ (clone-able) │          │   state machine · timers · liveness       │
//! └──────────────┘          └───────┬───────────────────────┬──────────┘
//!        ▲                          │ open / ping           │ emit
//!        │ on / subscribe           ▼                       ▼
//!        │                  ┌──────────────┐        ┌──────────────┐
//!        └───────────────── │  Transport   │        │   EventBus   │
//!                           │ (HTTP/2+TLS) │        └──────────────┘
//!                           └──────────────┘
//! ```
//!
//! # Connection flow
//!
//! 1. Fetch a token from the [`CredentialProvider`], resolve the host
//! 2. Open `GET /v20160207/directives`; arm the 30s initialization deadline
//! 3. First multipart boundary: send a ping, start the 180s ping cycle
//! 4. First pong: emit [`ChannelEvent::Connect`], reset the failure count
//! 5. Any close trigger: tear down once, emit `Disconnect`, schedule a retry

pub mod builder;
pub mod client;
pub mod credentials;
pub mod decoder;
pub mod endpoint;
pub mod events;
pub mod keepalive;
mod manager;
pub mod reconnect;
pub mod state;
mod timer;
pub mod transport;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::PushChannelBuilder;
pub use client::PushChannel;
pub use credentials::{CredentialProvider, FnCredentials, RefreshTokenProvider, StaticToken};
pub use endpoint::{resolve_endpoint, DEFAULT_ENDPOINT};
pub use events::{EventBus, EventHandler};
pub use keepalive::KeepaliveTimings;
pub use manager::LogSink;
pub use reconnect::ReconnectPolicy;
pub use state::{ChannelState, ChannelStatus, CloseReason};
pub use transport::{Http2Transport, Transport, TransportError};
pub use types::{ChannelError, ChannelEvent, Directive, EventKind, ProbeError};
