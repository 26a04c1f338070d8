//! Search module
//!
//! Harvests every offer matching a query despite the API's cap on how many
//! results one query can page through.
//!
//! # Overview
//!
//! The search module provides:
//! - `QueryParams` - Search filters, including the creation-date bounds
//! - `CountProbe` - HEAD request returning the total match count
//! - `WindowPartitioner` - Bisection of a query along its creation-date window
//! - `ChunkWalker` - Paged fetching of one window under the ceiling
//! - `OfferStream` - Lazy, chronological traversal of a whole query
//! - `OfferSearch` - Entry point tying these to a [`Transport`]
//!
//! # Example
//!
//! ```rust,ignore
//! use ft_offers::search::{OfferSearch, QueryParams};
//! use futures::StreamExt;
//!
//! let search = OfferSearch::new(transport);
//! let params = QueryParams::new().with("departement", "42");
//! let mut chunks = std::pin::pin!(search.stream(params));
//! while let Some(chunk) = chunks.next().await {
//!     for offer in chunk?.records {
//!         println!("{offer}");
//!     }
//! }
//! ```

mod count;
mod params;
mod stream;
mod types;
mod walker;
mod window;

pub use count::{
    parse_accept_range, parse_content_range_total, CountProbe, ACCEPT_RANGE, CONTENT_RANGE,
};
pub use params::{
    format_date, parse_date, ParamValue, QueryParams, DATE_FORMAT, MAX_CREATION_DATE,
    MIN_CREATION_DATE, PUBLISHED_SINCE,
};
pub use stream::OfferStream;
pub use types::{
    Chunk, HarvestStats, SearchConfig, DEFAULT_CEILING, DEFAULT_MAX_CREATION_DAYS,
    DEFAULT_SEARCH_PATH,
};
pub use walker::{ChunkWalker, PageCursor};
pub use window::{
    days_before, truncate_to_second, Clock, FixedClock, SystemClock, Window, WindowPartitioner,
};

use crate::error::Result;
use crate::transport::Transport;
use crate::types::Record;
use futures::Stream;
use std::sync::Arc;

/// Offer search over a transport
#[derive(Clone)]
pub struct OfferSearch {
    transport: Arc<dyn Transport>,
    search_path: String,
    config: SearchConfig,
    clock: Arc<dyn Clock>,
}

impl OfferSearch {
    /// Create a search with default configuration and the wall clock
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            config: SearchConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set search configuration
    #[must_use]
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the path of the search endpoint
    #[must_use]
    pub fn with_search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = path.into();
        self
    }

    /// Set the clock used for default windows
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the search configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Total number of offers matching `params`, `None` if the API did not say
    pub async fn count(&self, params: &QueryParams) -> Result<Option<u64>> {
        CountProbe::new(self.transport.as_ref(), &self.search_path)
            .count(params)
            .await
    }

    /// Traverse every offer matching `params`
    ///
    /// Uses the configured look-back when `params` has no `minCreationDate`.
    pub fn offers(&self, params: QueryParams) -> OfferStream<'_> {
        self.offers_with_max_days(params, self.config.max_creation_days)
    }

    /// Traverse every offer matching `params` with an explicit look-back
    ///
    /// "Now" is read from the clock once, here.
    pub fn offers_with_max_days(
        &self,
        params: QueryParams,
        max_creation_days: i64,
    ) -> OfferStream<'_> {
        OfferStream::new(
            self.transport.as_ref(),
            &self.search_path,
            &self.config,
            params,
            truncate_to_second(self.clock.now()),
            max_creation_days,
        )
    }

    /// Lazy stream of chunks for `params`
    pub fn stream(&self, params: QueryParams) -> impl Stream<Item = Result<Chunk>> + Send + '_ {
        self.offers(params).into_stream()
    }

    /// Lazy stream of chunks for `params` with an explicit look-back
    pub fn stream_with_max_days(
        &self,
        params: QueryParams,
        max_creation_days: i64,
    ) -> impl Stream<Item = Result<Chunk>> + Send + '_ {
        self.offers_with_max_days(params, max_creation_days)
            .into_stream()
    }

    /// Fetch every offer matching `params` into memory
    pub async fn collect_all(&self, params: QueryParams) -> Result<Vec<Record>> {
        self.offers(params).collect_records().await
    }

    /// Fetch every offer matching `params` into memory, with an explicit look-back
    pub async fn collect_all_with_max_days(
        &self,
        params: QueryParams,
        max_creation_days: i64,
    ) -> Result<Vec<Record>> {
        self.offers_with_max_days(params, max_creation_days)
            .collect_records()
            .await
    }
}

impl std::fmt::Debug for OfferSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfferSearch")
            .field("search_path", &self.search_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
