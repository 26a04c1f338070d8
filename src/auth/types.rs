//! Auth configuration types

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Seconds before expiry at which a token is already treated as stale
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// How requests to the offers API are authorized
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authorization header
    #[default]
    None,

    /// Fixed bearer token, never refreshed
    Bearer {
        /// The bearer token
        token: String,
    },

    /// Token obtained from the partner token endpoint
    ClientCredentials(ClientCredentials),
}

impl AuthConfig {
    /// Create a client credentials config
    pub fn client_credentials(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self::ClientCredentials(ClientCredentials {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes,
        })
    }

    /// Whether a rejected token can be replaced by a fresh one
    pub fn is_refreshable(&self) -> bool {
        matches!(self, Self::ClientCredentials(_))
    }
}

/// Partner application credentials for the OAuth2 client-credentials grant
#[derive(Clone)]
pub struct ClientCredentials {
    /// Token endpoint, realm included
    pub token_url: String,
    /// Application identifier
    pub client_id: String,
    /// Application secret
    pub client_secret: String,
    /// Scopes, sent space-separated
    pub scopes: Vec<String>,
}

impl ClientCredentials {
    /// Form body of the token request
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
        ];
        if !self.scopes.is_empty() {
            form.push(("scope", self.scopes.join(" ")));
        }
        form
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Access token held between requests
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires, if the endpoint said
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// A token granted at `now`, valid for `expires_in` seconds when given
    pub fn issued_at(token: String, now: DateTime<Utc>, expires_in: Option<i64>) -> Self {
        Self {
            token,
            expires_at: expires_in.and_then(|secs| {
                Duration::try_seconds(secs).and_then(|ttl| now.checked_add_signed(ttl))
            }),
        }
    }

    /// Whether the token should be replaced before use at `now`
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + Duration::seconds(EXPIRY_MARGIN_SECS) >= expires_at)
    }
}
