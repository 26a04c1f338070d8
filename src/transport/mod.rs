//! Transport module
//!
//! The two calls the search engine needs from its environment: an
//! authenticated GET and an authenticated HEAD against the offers API.
//!
//! `HttpTransport` is the production implementation over [`crate::http::HttpClient`].
//! Tests drive the engine with scripted implementations of [`Transport`].

mod client;
mod types;

pub use client::HttpTransport;
pub use types::{ApiResponse, Transport};

#[cfg(test)]
mod tests;
