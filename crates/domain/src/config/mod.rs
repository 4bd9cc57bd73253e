mod auth;
mod channel;
mod logging;
mod observability;

pub use auth::*;
pub use channel::*;
pub use logging::*;
pub use observability::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a config validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load the configuration at `path`, or the defaults when the file
    /// does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Some(host) = &self.channel.endpoint_override {
            if host.trim().is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "channel.endpoint_override".into(),
                    message: "endpoint override must not be empty when set".into(),
                });
            } else if host.contains("://") || host.contains('/') {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "channel.endpoint_override".into(),
                    message: "expected a bare host name (no scheme or path)".into(),
                });
            }
        }

        let ka = &self.channel.keepalive;
        for (field, value) in [
            ("channel.keepalive.ping_interval_secs", ka.ping_interval_secs),
            ("channel.keepalive.pong_timeout_secs", ka.pong_timeout_secs),
            ("channel.keepalive.init_timeout_secs", ka.init_timeout_secs),
            ("channel.keepalive.probe_timeout_secs", ka.probe_timeout_secs),
        ] {
            if value == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: field.into(),
                    message: "must be greater than 0".into(),
                });
            }
        }

        if ka.pong_grace_secs < ka.pong_timeout_secs {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "channel.keepalive.pong_grace_secs".into(),
                message: "grace margin is shorter than the pong timeout; late pongs are never tolerated".into(),
            });
        }

        if ka.ping_interval_secs <= ka.pong_timeout_secs {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "channel.keepalive.ping_interval_secs".into(),
                message: "ping interval should exceed the pong timeout".into(),
            });
        }

        let rc = &self.channel.reconnect;
        if rc.max_attempts == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "channel.reconnect.max_attempts".into(),
                message: "must be greater than 0".into(),
            });
        }
        if rc.max_delay_secs < rc.backoff_step_secs {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "channel.reconnect.max_delay_secs".into(),
                message: "cap is below a single backoff step".into(),
            });
        }

        if !self.auth.has_source() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "auth".into(),
                message: "no access_token, access_token_env, refresh_token or refresh_token_env configured".into(),
            });
        }
        if self.auth.access_token.is_some() || self.auth.refresh_token.is_some() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "auth".into(),
                message: "plaintext token in config; prefer the *_env fields".into(),
            });
        }
        if self.auth.uses_refresh() && self.auth.token_url.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "auth.token_url".into(),
                message: "token_url is required for refresh-token auth".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "observability.sample_rate".into(),
                message: "must be between 0.0 and 1.0".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token() -> Config {
        let mut cfg = Config::default();
        cfg.auth.access_token_env = Some("PUSHWIRE_TOKEN".into());
        cfg
    }

    #[test]
    fn defaults_validate_cleanly_with_token_source() {
        assert!(with_token().validate().is_empty());
    }

    #[test]
    fn missing_auth_is_an_error() {
        let issues = Config::default().validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "auth" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn override_with_scheme_is_rejected() {
        let mut cfg = with_token();
        cfg.channel.endpoint_override = Some("https://example.com".into());
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "channel.endpoint_override");
    }

    #[test]
    fn zero_max_attempts_is_an_error() {
        let mut cfg = with_token();
        cfg.channel.reconnect.max_attempts = 0;
        assert!(cfg
            .validate()
            .iter()
            .any(|i| i.field == "channel.reconnect.max_attempts"));
    }

    #[test]
    fn display_tags_severity() {
        let issue = ConfigError {
            severity: ConfigSeverity::Warning,
            field: "auth".into(),
            message: "careful".into(),
        };
        assert_eq!(issue.to_string(), "[WARN] auth: careful");
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path().join("absent.toml")).unwrap();
        assert!(cfg.channel.region.is_none());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pushwire.toml");
        std::fs::write(&path, "[channel]\nregion = \"amazon.de\"\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.channel.region.as_deref(), Some("amazon.de"));
    }
}
