//! Reconnect policy: linear back-off with a cap and a retry ceiling.

use std::time::Duration;

use pw_domain::config::ReconnectConfig;

/// Controls how the channel reconnects after an attempt ends.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay for the first failure and for immediate retries.
    pub immediate_delay: Duration,
    /// Delay added per consecutive failure.
    pub step: Duration,
    /// Maximum delay between attempts (cap).
    pub max_delay: Duration,
    /// Consecutive failures beyond this count are permanent.
    pub max_attempts: u32,
    /// Authentication failures retry immediately while the failure count
    /// is below this value.
    pub auth_fast_retry_below: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            immediate_delay: Duration::from_secs(1),
            step: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            max_attempts: 100,
            auth_fast_retry_below: 3,
        }
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(cfg: &ReconnectConfig) -> Self {
        Self {
            step: Duration::from_secs(cfg.backoff_step_secs),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
            max_attempts: cfg.max_attempts,
            auth_fast_retry_below: cfg.auth_fast_retry_below,
            ..Self::default()
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the next attempt, given the failure count *after*
    /// counting the failure that just happened.
    pub fn delay_for_attempt(&self, attempt: u32, immediate: bool) -> Duration {
        if immediate || attempt <= 1 {
            return self.immediate_delay;
        }
        self.step.saturating_mul(attempt).min(self.max_delay)
    }

    /// Whether the given failure count exceeds the ceiling.
    pub fn should_give_up(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }

    /// Whether an authentication failure may skip the back-off.
    pub fn auth_retry_is_immediate(&self, attempt: u32) -> bool {
        attempt < self.auth_fast_retry_below
    }
}
