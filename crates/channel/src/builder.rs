//! Builder pattern for constructing a [`PushChannel`].

use std::sync::Arc;

use pw_domain::config::ChannelConfig;

use crate::client::PushChannel;
use crate::credentials::CredentialProvider;
use crate::keepalive::KeepaliveTimings;
use crate::manager::{LogSink, Settings};
use crate::reconnect::ReconnectPolicy;
use crate::transport::{Http2Transport, Transport};
use crate::types::ChannelError;

/// Fluent builder for [`PushChannel`].
///
/// # Example
///
/// ```rust,no_run
/// # use pw_channel::{PushChannelBuilder, StaticToken};
/// # async fn demo() -> Result<(), pw_channel::ChannelError> {
/// let channel = PushChannelBuilder::new()
///     .region("amazon.de")
///     .credentials(StaticToken::new("Atza|..."))
///     .build()?;
/// channel.connect();
/// # Ok(())
/// # }
/// ```
pub struct PushChannelBuilder {
    endpoint_override: Option<String>,
    region: Option<String>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    transport: Option<Arc<dyn Transport>>,
    policy: ReconnectPolicy,
    timings: KeepaliveTimings,
    logger: Option<LogSink>,
}

impl PushChannelBuilder {
    pub fn new() -> Self {
        Self {
            endpoint_override: None,
            region: None,
            credentials: None,
            transport: None,
            policy: ReconnectPolicy::default(),
            timings: KeepaliveTimings::default(),
            logger: None,
        }
    }

    /// Endpoint, region and timings from the `[channel]` config section.
    pub fn from_config(cfg: &ChannelConfig) -> Self {
        Self {
            endpoint_override: cfg.endpoint_override.clone(),
            region: cfg.region.clone(),
            policy: ReconnectPolicy::from(&cfg.reconnect),
            timings: KeepaliveTimings::from(&cfg.keepalive),
            ..Self::new()
        }
    }

    // ── Endpoint ─────────────────────────────────────────────────────

    /// Host name that bypasses region resolution.
    pub fn endpoint_override(mut self, host: impl Into<String>) -> Self {
        self.endpoint_override = Some(host.into());
        self
    }

    /// Marketplace domain (e.g. `"amazon.de"`) used to pick the host.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    // ── Collaborators ────────────────────────────────────────────────

    /// Required.
    pub fn credentials(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.credentials = Some(Arc::new(provider));
        self
    }

    pub fn credentials_arc(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Replace the HTTP/2 transport (default [`Http2Transport`]).
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Receives one human-readable line per lifecycle step.
    pub fn logger<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(f));
        self
    }

    // ── Behavior ─────────────────────────────────────────────────────

    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn keepalive(mut self, timings: KeepaliveTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Build the [`PushChannel`] and spawn its manager task.  Does not
    /// connect.  Must be called inside a tokio runtime.
    pub fn build(self) -> Result<PushChannel, ChannelError> {
        let credentials = self
            .credentials
            .ok_or_else(|| ChannelError::Config("credentials are required".into()))?;
        if self.policy.max_attempts == 0 {
            return Err(ChannelError::Config("max_attempts must be at least 1".into()));
        }
        let t = &self.timings;
        for (name, value) in [
            ("ping_interval", t.ping_interval),
            ("pong_timeout", t.pong_timeout),
            ("init_timeout", t.init_timeout),
            ("probe_timeout", t.probe_timeout),
        ] {
            if value.is_zero() {
                return Err(ChannelError::Config(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(Http2Transport::new()?),
        };

        Ok(PushChannel::spawn(Settings {
            endpoint_override: self.endpoint_override,
            region: self.region,
            policy: self.policy,
            timings: self.timings,
            credentials,
            transport,
            logger: self.logger,
        }))
    }
}

impl Default for PushChannelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
