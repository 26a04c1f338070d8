//! Transport contract and response type

use crate::error::Result;
use crate::search::QueryParams;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// A response as seen by the search engine
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body (empty for HEAD)
    pub body: String,
}

impl ApiResponse {
    /// Create a response with no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header
    ///
    /// Invalid header names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Get a header as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Full result delivered (200)
    pub fn is_complete(&self) -> bool {
        self.status == 200
    }

    /// Partial result delivered (206)
    pub fn is_partial(&self) -> bool {
        self.status == 206
    }
}

/// Authenticated access to the offers API
///
/// Implementations attach authorization, retry transient failures and
/// refresh an expired token themselves. Every status they cannot absorb is
/// returned in the [`ApiResponse`]; `Err` means the call could not be made.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Authenticated GET
    async fn get(&self, path: &str, params: &QueryParams) -> Result<ApiResponse>;

    /// Authenticated HEAD
    async fn head(&self, path: &str, params: &QueryParams) -> Result<ApiResponse>;
}
