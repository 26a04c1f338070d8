//! Authentication module
//!
//! The offers API wants a bearer token on every call. Partner applications
//! get one from the token endpoint with the OAuth2 client-credentials grant;
//! a fixed token or no header at all are accepted for tests and proxies.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken, ClientCredentials, EXPIRY_MARGIN_SECS};
