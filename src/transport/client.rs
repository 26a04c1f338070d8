//! HTTP implementation of the transport contract

use super::types::{ApiResponse, Transport};
use crate::error::Result;
use crate::http::HttpClient;
use crate::search::QueryParams;
use async_trait::async_trait;
use reqwest::Method;
use tracing::warn;

/// Transport over the retrying, rate-limited [`HttpClient`]
///
/// A 403 means the access token expired: the cached token is dropped and
/// the call is replayed exactly once with a fresh one.
#[derive(Debug)]
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    /// Wrap an HTTP client
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    async fn send(&self, method: Method, path: &str, params: &QueryParams) -> Result<ApiResponse> {
        let query = params.to_query_pairs();
        let response = self.client.send(method.clone(), path, &query).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = if method == Method::HEAD {
            String::new()
        } else {
            response.text().await?
        };

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_authenticated(
        &self,
        method: Method,
        path: &str,
        params: &QueryParams,
    ) -> Result<ApiResponse> {
        let response = self.send(method.clone(), path, params).await?;
        if response.status != 403 {
            return Ok(response);
        }

        match self.client.authenticator() {
            Some(auth) if auth.invalidate().await => {
                warn!(path, "Access token rejected (403), retrying with a new token");
                self.send(method, path, params).await
            }
            _ => Ok(response),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<ApiResponse> {
        self.send_authenticated(Method::GET, path, params).await
    }

    async fn head(&self, path: &str, params: &QueryParams) -> Result<ApiResponse> {
        self.send_authenticated(Method::HEAD, path, params).await
    }
}
