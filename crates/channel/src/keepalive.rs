//! Liveness bookkeeping: ping cadence, pong deadlines, staleness.

use std::time::Duration;

use pw_domain::config::KeepaliveConfig;
use tokio::time::Instant;

/// Keepalive timings.
#[derive(Debug, Clone)]
pub struct KeepaliveTimings {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub pong_grace: Duration,
    pub init_timeout: Duration,
    pub stale_after: Duration,
    pub probe_timeout: Duration,
}

impl Default for KeepaliveTimings {
    fn default() -> Self {
        Self::from(&KeepaliveConfig::default())
    }
}

impl From<&KeepaliveConfig> for KeepaliveTimings {
    fn from(cfg: &KeepaliveConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(cfg.ping_interval_secs),
            pong_timeout: Duration::from_secs(cfg.pong_timeout_secs),
            pong_grace: Duration::from_secs(cfg.pong_grace_secs),
            init_timeout: Duration::from_secs(cfg.init_timeout_secs),
            stale_after: Duration::from_secs(cfg.stale_after_secs),
            probe_timeout: Duration::from_secs(cfg.probe_timeout_secs),
        }
    }
}

/// Liveness facts for the current manager.
///
/// `last_liveness` survives reconnects; the rest is per attempt.
#[derive(Debug, Default)]
pub(crate) struct Liveness {
    pub last_liveness: Option<Instant>,
    /// When the outstanding periodic ping was sent.
    pub ping_sent_at: Option<Instant>,
    /// Set once the first boundary chunk armed the ping cycle.
    pub cycle_armed: bool,
}

impl Liveness {
    pub fn reset_attempt(&mut self) {
        self.ping_sent_at = None;
        self.cycle_armed = false;
    }

    pub fn confirm(&mut self, now: Instant) {
        self.last_liveness = Some(now);
        self.ping_sent_at = None;
    }

    /// A confirmation within `grace` of `now` turns a pong-deadline alarm
    /// into a false alarm.
    pub fn confirmed_within(&self, now: Instant, grace: Duration) -> bool {
        self.last_liveness
            .is_some_and(|t| now.saturating_duration_since(t) < grace)
    }

    /// Passive check: no confirmation for longer than `stale_after`.
    pub fn is_stale(&self, now: Instant, stale_after: Duration) -> bool {
        self.last_liveness
            .is_some_and(|t| now.saturating_duration_since(t) > stale_after)
    }

    /// Time left of the grace window measured from the outstanding ping.
    pub fn grace_remaining(&self, now: Instant, grace: Duration) -> Duration {
        match self.ping_sent_at {
            Some(sent) => (sent + grace).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }
}
