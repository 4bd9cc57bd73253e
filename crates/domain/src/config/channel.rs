use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where and how the push channel connects.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    /// Bare host name that replaces the region lookup entirely.
    #[serde(default)]
    pub endpoint_override: Option<String>,

    /// Region code (account marketplace domain, e.g. `amazon.com`) used to
    /// pick the dispatch endpoint.
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub keepalive: KeepaliveConfig,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Liveness timings, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// Interval of the periodic transport ping once the body has started.
    #[serde(default = "d_ping_interval")]
    pub ping_interval_secs: u64,

    /// How long a periodic ping may go unanswered.
    #[serde(default = "d_pong_timeout")]
    pub pong_timeout_secs: u64,

    /// A liveness confirmation younger than this cancels a pong-deadline
    /// alarm.
    #[serde(default = "d_pong_grace")]
    pub pong_grace_secs: u64,

    /// The first liveness confirmation must arrive within this window.
    #[serde(default = "d_init_timeout")]
    pub init_timeout_secs: u64,

    /// Passive staleness threshold used by the full liveness check.
    #[serde(default = "d_stale_after")]
    pub stale_after_secs: u64,

    /// Timeout of an on-demand probe.
    #[serde(default = "d_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: d_ping_interval(),
            pong_timeout_secs: d_pong_timeout(),
            pong_grace_secs: d_pong_grace(),
            init_timeout_secs: d_init_timeout(),
            stale_after_secs: d_stale_after(),
            probe_timeout_secs: d_probe_timeout(),
        }
    }
}

/// Reconnect backoff and retry ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Failures beyond this count end the session for good.
    #[serde(default = "d_max_attempts")]
    pub max_attempts: u32,

    /// Delay added per consecutive failure.
    #[serde(default = "d_backoff_step")]
    pub backoff_step_secs: u64,

    /// Upper bound on the delay between attempts.
    #[serde(default = "d_max_delay")]
    pub max_delay_secs: u64,

    /// On an authentication failure, retry immediately while fewer than
    /// this many consecutive attempts have failed.
    #[serde(default = "d_auth_fast_retry_below")]
    pub auth_fast_retry_below: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: d_max_attempts(),
            backoff_step_secs: d_backoff_step(),
            max_delay_secs: d_max_delay(),
            auth_fast_retry_below: d_auth_fast_retry_below(),
        }
    }
}

fn d_ping_interval() -> u64 {
    180
}
fn d_pong_timeout() -> u64 {
    30
}
fn d_pong_grace() -> u64 {
    35
}
fn d_init_timeout() -> u64 {
    30
}
fn d_stale_after() -> u64 {
    300
}
fn d_probe_timeout() -> u64 {
    5
}
fn d_max_attempts() -> u32 {
    100
}
fn d_backoff_step() -> u64 {
    5
}
fn d_max_delay() -> u64 {
    60
}
fn d_auth_fast_retry_below() -> u32 {
    3
}
