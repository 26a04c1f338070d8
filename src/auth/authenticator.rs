//! Request authorization for the offers API

use super::types::{AuthConfig, CachedToken, ClientCredentials};
use crate::error::{Error, Result};
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Attaches `Authorization: Bearer` to outgoing requests
///
/// With client credentials the access token is fetched on first use and
/// reused until it comes within [`super::EXPIRY_MARGIN_SECS`] of expiry or
/// is [invalidated](Self::invalidate).
pub struct Authenticator {
    config: AuthConfig,
    token: RwLock<Option<CachedToken>>,
    client: Client,
}

impl Authenticator {
    /// Authenticator issuing its token requests on `client`
    pub fn new(config: AuthConfig, client: Client) -> Self {
        Self {
            config,
            token: RwLock::new(None),
            client,
        }
    }

    /// Add the authorization header, fetching a token if needed
    pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(request),
            AuthConfig::Bearer { token } => Ok(request.bearer_auth(token)),
            AuthConfig::ClientCredentials(credentials) => {
                let token = self.access_token(credentials).await?;
                Ok(request.bearer_auth(token))
            }
        }
    }

    /// Forget the current token after the API rejected it
    ///
    /// Returns false when there is no way to get another one, in which case
    /// replaying the request is pointless.
    pub async fn invalidate(&self) -> bool {
        self.token.write().await.take();
        self.config.is_refreshable()
    }

    async fn access_token(&self, credentials: &ClientCredentials) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if !token.is_stale(Utc::now()) {
                return Ok(token.token.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Refreshed by a concurrent caller while waiting for the lock
        if let Some(token) = slot.as_ref() {
            if !token.is_stale(Utc::now()) {
                return Ok(token.token.clone());
            }
        }

        let token = self.request_token(credentials).await?;
        let access = token.token.clone();
        *slot = Some(token);
        Ok(access)
    }

    async fn request_token(&self, credentials: &ClientCredentials) -> Result<CachedToken> {
        debug!(token_url = %credentials.token_url, "Requesting access token");

        let response = self
            .client
            .post(&credentials.token_url)
            .form(&credentials.form())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::OAuth2 {
                message: format!("token endpoint answered {}: {body}", status.as_u16()),
            });
        }

        let granted: TokenGrant = response.json().await?;
        Ok(CachedToken::issued_at(granted.access_token, Utc::now(), granted.expires_in))
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.config {
            AuthConfig::None => "none",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::ClientCredentials(_) => "client_credentials",
        };
        f.debug_struct("Authenticator")
            .field("kind", &kind)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}
