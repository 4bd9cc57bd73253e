use serde::{Deserialize, Serialize};

/// Where the bearer token comes from.
///
/// Precedence: a refresh token (plaintext or env) selects the OAuth
/// refresh-token grant; otherwise a static access token is used.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub access_token: Option<String>,

    /// Name of an environment variable holding the access token.
    #[serde(default)]
    pub access_token_env: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Name of an environment variable holding the refresh token.
    #[serde(default)]
    pub refresh_token_env: Option<String>,

    /// OAuth 2.0 token endpoint for the refresh-token grant.
    #[serde(default = "d_token_url")]
    pub token_url: String,

    #[serde(default)]
    pub client_id: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            access_token_env: None,
            refresh_token: None,
            refresh_token_env: None,
            token_url: d_token_url(),
            client_id: None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("access_token_env", &self.access_token_env)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token_env", &self.refresh_token_env)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl AuthConfig {
    pub fn uses_refresh(&self) -> bool {
        self.refresh_token.is_some() || self.refresh_token_env.is_some()
    }

    pub fn has_source(&self) -> bool {
        self.uses_refresh() || self.access_token.is_some() || self.access_token_env.is_some()
    }
}

fn d_token_url() -> String {
    "https://api.amazon.com/auth/o2/token".into()
}
