//! HTTP client module
//!
//! Provides the HTTP client with bounded retry, backoff and rate limiting
//! that sits underneath the search transport.

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RetryPolicy};
pub use rate_limit::{RateLimiter, RateLimiterConfig, API_REQUESTS_PER_SECOND};

#[cfg(test)]
mod tests;
