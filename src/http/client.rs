//! Retrying HTTP client for the offers API
//!
//! Only transient failures are retried: 429 (after `Retry-After`), 500, 502,
//! 503 and 504, timeouts and refused connections. Any other response comes
//! back as-is so the search layer can read 206 pages and client errors.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{Error, Result};
use crate::types::BackoffType;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// When and how long to wait before sending a request again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound of any delay
    pub max_backoff: Duration,
    /// Growth of the delay between retries
    pub backoff: BackoffType,
}

impl Default for RetryPolicy {
    /// 4 retries from 200 ms, doubling
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            backoff: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0 for the first one)
    pub fn delay(&self, retry: u32) -> Duration {
        let delay = match self.backoff {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(retry.saturating_add(1)),
            BackoffType::Exponential => self
                .initial_backoff
                .saturating_mul(2u32.saturating_pow(retry)),
        };
        delay.min(self.max_backoff)
    }
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Prefix of relative request paths
    pub base_url: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry behaviour on transient failures
    pub retry: RetryPolicy,
    /// Token bucket, `None` to send unthrottled
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            rate_limit: Some(RateLimiterConfig::default()),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Set the backoff curve
    pub fn backoff(mut self, backoff: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.retry.backoff = backoff;
        self.config.retry.initial_backoff = initial;
        self.config.retry.max_backoff = max;
        self
    }

    /// Set or clear the rate limit
    pub fn rate_limit(mut self, config: Option<RateLimiterConfig>) -> Self {
        self.config.rate_limit = config;
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(self) -> Self {
        self.rate_limit(None)
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client with retry and rate limiting
///
/// One instance owns the connection pool; it is shared by every request of a
/// harvest so connections are reused across windows.
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create an unauthenticated client
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ft-offers/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        })
    }

    /// Create a client that authorizes every request
    ///
    /// Token requests share the connection pool but bypass retries and the
    /// rate limit.
    pub fn with_auth(config: HttpClientConfig, auth: AuthConfig) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.authenticator = Some(Authenticator::new(auth, client.client.clone()));
        Ok(client)
    }

    /// Get the authenticator, if any
    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    /// Send a request, retrying transient failures
    ///
    /// `query` pairs are sent in order. Once retries run out, the last
    /// failure is returned: `RateLimited`, `HttpStatus`, `Timeout` or `Http`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Response> {
        let url = self.build_url(path);
        let policy = &self.config.retry;
        let mut retry = 0;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.acquire().await;
            }

            let mut request = self.client.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(auth) = &self.authenticator {
                request = auth.authorize(request).await?;
            }

            let (wait, failure) = match request.send().await {
                Ok(response) => match response.status() {
                    status if status == StatusCode::TOO_MANY_REQUESTS => {
                        let seconds = retry_after_seconds(&response);
                        (
                            Duration::from_secs(seconds),
                            Error::RateLimited {
                                retry_after_seconds: seconds,
                            },
                        )
                    }
                    status if is_transient(status) => {
                        let body = response.text().await.unwrap_or_default();
                        (policy.delay(retry), Error::http_status(status.as_u16(), body))
                    }
                    status => {
                        debug!(status = status.as_u16(), %method, %url, "Response");
                        return Ok(response);
                    }
                },
                Err(e) if e.is_timeout() => (
                    policy.delay(retry),
                    Error::Timeout {
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    },
                ),
                Err(e) if e.is_connect() => (policy.delay(retry), Error::Http(e)),
                Err(e) => return Err(Error::Http(e)),
            };

            if retry >= policy.max_retries {
                return Err(failure);
            }
            retry += 1;
            warn!(
                error = %failure,
                retry,
                max_retries = policy.max_retries,
                wait_ms = wait.as_millis() as u64,
                "Transient failure, retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Join a path onto the base URL; absolute URLs pass through
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

fn retry_after_seconds(response: &Response) -> u64 {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1)
}
