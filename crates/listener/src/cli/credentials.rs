use std::sync::Arc;

use anyhow::Context;
use pw_channel::{CredentialProvider, RefreshTokenProvider, StaticToken};
use pw_domain::config::AuthConfig;

/// Build the credential provider selected by `[auth]`.
///
/// A refresh token wins over a static access token.  `*_env` names are
/// resolved here so a missing variable fails at startup.
pub fn from_config(auth: &AuthConfig) -> anyhow::Result<Arc<dyn CredentialProvider>> {
    if let Some(refresh_token) = secret(&auth.refresh_token, &auth.refresh_token_env)? {
        let mut provider = RefreshTokenProvider::new(auth.token_url.clone(), refresh_token);
        if let Some(id) = &auth.client_id {
            provider = provider.client_id(id.clone());
        }
        tracing::debug!(token_url = %auth.token_url, "using refresh-token credentials");
        return Ok(Arc::new(provider));
    }
    if let Some(token) = secret(&auth.access_token, &auth.access_token_env)? {
        tracing::debug!("using static access token");
        return Ok(Arc::new(StaticToken::new(token)));
    }
    anyhow::bail!("no credentials configured: set [auth] access_token or refresh_token")
}

fn secret(plain: &Option<String>, env: &Option<String>) -> anyhow::Result<Option<String>> {
    if let Some(value) = plain {
        return Ok(Some(value.clone()));
    }
    match env {
        Some(var) => std::env::var(var)
            .map(Some)
            .with_context(|| format!("reading credential from ${var}")),
        None => Ok(None),
    }
}
