// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # ft-offers
//!
//! Exhaustive harvesting of job offers from the France Travail offers API.
//!
//! The search endpoint will page through at most 3000 results for a query.
//! Larger queries are cut along their creation-date window until every piece
//! fits, and the pieces are walked one after the other, oldest first.
//!
//! ## Features
//!
//! - **Adaptive partitioning**: Recursive bisection of the creation-date window
//! - **Partial-content paging**: `Content-Range` / `Accept-Range` driven page walks
//! - **Lazy streaming**: Nothing is fetched before the consumer asks for it
//! - **OAuth2**: Client-credentials token, cached and renewed on 403
//! - **Resilient HTTP**: Retry with backoff on 429/5xx, rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ft_offers::{HarvestConfig, OfferSearch, QueryParams, Result};
//! use ft_offers::http::HttpClient;
//! use ft_offers::transport::HttpTransport;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut config = HarvestConfig::default();
//!     config.apply_credentials(None, None);
//!
//!     let client = HttpClient::with_auth(config.to_http_client_config(), config.to_auth_config()?)?;
//!     let search = OfferSearch::new(Arc::new(HttpTransport::new(client)));
//!
//!     let offers = search
//!         .collect_all(QueryParams::new().with("departement", "42"))
//!         .await?;
//!     println!("{} offers", offers.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 OfferSearch / OfferStream                    │
//! │        count(params)   stream(params) → Stream<Chunk>        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────────┬──────────────┴───────────┬───────────────────┐
//! │  CountProbe  │   WindowPartitioner      │   ChunkWalker     │
//! │  HEAD total  │   [start, mid] [mid+1s,  │   200 / 206 pages │
//! │              │   end], publieeDepuis    │   PageCursor      │
//! └──────────────┴──────────────────────────┴───────────────────┘
//!                               │
//! ┌─────────────────────────────┴───────────────────────────────┐
//! │  Transport (get, head)  ←  HttpTransport                    │
//! │     HttpClient: retry, backoff, rate limit · Authenticator  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Harvest configuration
pub mod config;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Authenticated GET/HEAD against the offers API
pub mod transport;

/// Windowed, paged offer search
pub mod search;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::HarvestConfig;
pub use error::{Error, Result};
pub use search::{Chunk, OfferSearch, OfferStream, QueryParams, SearchConfig};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
