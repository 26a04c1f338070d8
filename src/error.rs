//! Error types for ft-offers
//!
//! Every fallible call in the crate returns [`Result`]. Whether an error ends
//! a harvest or only the window it came from is decided by the search layer,
//! not here.

use thiserror::Error;

/// The main error type for ft-offers
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Token Errors
    // ============================================================================
    #[error("OAuth2 error: {message}")]
    OAuth2 { message: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Still rate limited after retries, server asked to wait {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Search Errors
    // ============================================================================
    #[error("Invalid value for search parameter '{key}': {message}")]
    InvalidParam { key: String, message: String },

    #[error("Invalid creation window: {start} is after {end}")]
    InvalidWindow { start: String, end: String },

    #[error("Malformed {header} header: '{value}'")]
    MalformedRange { header: String, value: String },

    #[error("Window {window} holds {count} offers and cannot be split any further")]
    UnsplittableWindow { window: String, count: u64 },

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid search parameter error
    pub fn invalid_param(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a malformed range header error
    pub fn malformed_range(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedRange {
            header: header.into(),
            value: value.into(),
        }
    }
}

/// Result type alias for ft-offers
pub type Result<T> = std::result::Result<T, Error>;

/// Wrap an error with a description of what was being attempted
pub trait ResultExt<T> {
    /// Add lazily built context to an error
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: f(),
            source: Box::new(e.into()),
        })
    }
}
