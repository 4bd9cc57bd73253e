//! Bearer-token providers.
//!
//! The manager asks for a token on every connect and asks for a fresh one
//! after an authentication failure.  `None` means "no token available";
//! the manager then keeps whatever token it last had.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::time::Instant;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current token, used on connect.
    async fn access_token(&self) -> Option<String>;

    /// Token after the server rejected the current one.
    async fn refresh(&self) -> Option<String> {
        self.access_token().await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Static token
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A fixed bearer token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Closure adaptor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

type TokenFuture = Pin<Box<dyn Future<Output = Option<String>> + Send>>;

/// Wraps an async closure; used for both connect and refresh.
pub struct FnCredentials {
    f: Box<dyn Fn() -> TokenFuture + Send + Sync>,
}

impl FnCredentials {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        Self {
            f: Box::new(move || Box::pin(f())),
        }
    }
}

#[async_trait]
impl CredentialProvider for FnCredentials {
    async fn access_token(&self) -> Option<String> {
        (self.f)().await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OAuth 2.0 refresh-token grant
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Refresh proactively when less than this much lifetime remains.
const REFRESH_WINDOW: Duration = Duration::from_secs(300);

/// Assumed lifetime when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Exchanges a long-lived refresh token for short-lived access tokens.
pub struct RefreshTokenProvider {
    client: reqwest::Client,
    token_url: String,
    refresh_token: String,
    client_id: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshTokenProvider {
    pub fn new(token_url: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: token_url.into(),
            refresh_token: refresh_token.into(),
            client_id: None,
            cached: Mutex::new(None),
        }
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    fn cached_token(&self, now: Instant) -> Option<String> {
        self.cached
            .lock()
            .as_ref()
            .filter(|c| c.expires_at.saturating_duration_since(now) > REFRESH_WINDOW)
            .map(|c| c.access_token.clone())
    }

    async fn exchange(&self) -> Result<TokenResponse, pw_domain::Error> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
        ];
        if let Some(id) = &self.client_id {
            form.push(("client_id", id.as_str()));
        }

        let resp = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| pw_domain::Error::Auth(format!("token refresh request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| pw_domain::Error::Auth(format!("reading refresh response: {e}")))?;

        if !status.is_success() {
            return Err(pw_domain::Error::Auth(format!(
                "token refresh returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_fresh(&self) -> Option<String> {
        match self.exchange().await {
            Ok(token) => {
                let lifetime = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
                tracing::debug!(expires_in = lifetime, "access token refreshed");
                *self.cached.lock() = Some(CachedToken {
                    access_token: token.access_token.clone(),
                    expires_at: Instant::now() + Duration::from_secs(lifetime),
                });
                Some(token.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "access token refresh failed");
                None
            }
        }
    }
}

#[async_trait]
impl CredentialProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Option<String> {
        if let Some(token) = self.cached_token(Instant::now()) {
            return Some(token);
        }
        self.fetch_fresh().await
    }

    async fn refresh(&self) -> Option<String> {
        self.cached.lock().take();
        self.fetch_fresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn static_token_is_returned_for_both_calls() {
        let p = StaticToken::new("abc");
        assert_eq!(p.access_token().await.as_deref(), Some("abc"));
        assert_eq!(p.refresh().await.as_deref(), Some("abc"));
        assert_eq!(format!("{p:?}"), "StaticToken([REDACTED])");
    }

    #[tokio::test]
    async fn fn_credentials_call_the_closure_each_time() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let p = FnCredentials::new(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move { Some(format!("token-{n}")) }
        });
        assert_eq!(p.access_token().await.as_deref(), Some("token-0"));
        assert_eq!(p.refresh().await.as_deref(), Some("token-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn token_response_parses_without_expiry() {
        let t: TokenResponse = serde_json::from_str(r#"{"access_token":"Atza|x"}"#).unwrap();
        assert_eq!(t.access_token, "Atza|x");
        assert!(t.expires_in.is_none());
    }

    #[tokio::test]
    async fn cache_respects_refresh_window() {
        let p = RefreshTokenProvider::new("http://127.0.0.1:9/token", "refresh");
        let now = Instant::now();
        *p.cached.lock() = Some(CachedToken {
            access_token: "fresh".into(),
            expires_at: now + Duration::from_secs(3600),
        });
        assert_eq!(p.cached_token(now).as_deref(), Some("fresh"));

        *p.cached.lock() = Some(CachedToken {
            access_token: "expiring".into(),
            expires_at: now + Duration::from_secs(60),
        });
        assert!(p.cached_token(now).is_none());
    }
}
