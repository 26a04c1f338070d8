//! Full traversal of a query
//!
//! Windows are processed depth-first from an explicit stack: each popped
//! window is probed, then either split (its two halves pushed back, left on
//! top) or handed to a [`ChunkWalker`]. Sibling windows are never fetched
//! concurrently, so the request rate stays that of a single query.

use super::count::CountProbe;
use super::params::QueryParams;
use super::types::{Chunk, HarvestStats, SearchConfig};
use super::walker::ChunkWalker;
use super::window::{Window, WindowPartitioner};
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::UnknownCountPolicy;
use chrono::{DateTime, Utc};
use futures::Stream;
use tracing::{debug, error, info, warn};

/// A query waiting to be probed
#[derive(Debug, Clone)]
struct PendingWindow {
    params: QueryParams,
    window: Option<Window>,
    depth: u32,
}

/// What probing a pending window led to
enum Visit<'a> {
    Walk(ChunkWalker<'a>),
    Split,
    Skip,
    Fail { error: Error, fatal: bool },
}

/// Lazy, single-pass sequence of chunks covering a whole query
///
/// Chunks come out in window order (oldest creation dates first) and, within
/// a window, in server page order. Nothing is requested before the first
/// call to [`OfferStream::next_chunk`], and dropping the stream at any point
/// is safe.
pub struct OfferStream<'a> {
    transport: &'a dyn Transport,
    path: &'a str,
    config: &'a SearchConfig,
    partitioner: WindowPartitioner,
    now: DateTime<Utc>,
    max_creation_days: i64,
    pending: Vec<PendingWindow>,
    walker: Option<ChunkWalker<'a>>,
    stats: HarvestStats,
}

impl<'a> OfferStream<'a> {
    /// Create a stream for `params`
    ///
    /// `max_creation_days` only matters for the root query: every split
    /// window carries explicit creation-date bounds.
    pub fn new(
        transport: &'a dyn Transport,
        path: &'a str,
        config: &'a SearchConfig,
        params: QueryParams,
        now: DateTime<Utc>,
        max_creation_days: i64,
    ) -> Self {
        Self {
            transport,
            path,
            config,
            partitioner: WindowPartitioner::new(config.ceiling),
            now,
            max_creation_days,
            pending: vec![PendingWindow {
                params,
                window: None,
                depth: 0,
            }],
            walker: None,
            stats: HarvestStats::default(),
        }
    }

    /// Counters of the traversal so far
    pub fn stats(&self) -> HarvestStats {
        let mut stats = self.stats;
        if let Some(walker) = &self.walker {
            stats.merge(&walker.stats());
        }
        stats
    }

    /// Produce the next chunk
    ///
    /// An `Err` item from the root query (failed count probe, invalid dates)
    /// ends the stream. An [`Error::UnsplittableWindow`] item only drops that
    /// window; later calls continue with the remaining ones.
    pub async fn next_chunk(&mut self) -> Option<Result<Chunk>> {
        loop {
            if let Some(walker) = self.walker.as_mut() {
                if let Some(chunk) = walker.next_chunk().await {
                    return Some(Ok(chunk));
                }
                if let Some(walker) = self.walker.take() {
                    self.stats.merge(&walker.stats());
                }
            }

            let pending = self.pending.pop()?;
            match self.visit(pending).await {
                Visit::Walk(walker) => self.walker = Some(walker),
                Visit::Split | Visit::Skip => {}
                Visit::Fail { error, fatal } => {
                    if fatal {
                        self.pending.clear();
                    }
                    return Some(Err(error));
                }
            }
        }
    }

    /// Turn into a `futures` stream
    pub fn into_stream(self) -> impl Stream<Item = Result<Chunk>> + Send + 'a {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next_chunk().await.map(|item| (item, stream))
        })
    }

    /// Drain the stream into one ordered list of records
    ///
    /// Stops at the first error.
    pub async fn collect_records(mut self) -> Result<Vec<crate::types::Record>> {
        let mut records = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            records.extend(chunk?.records);
        }
        info!(
            records = records.len(),
            windows = self.stats.windows_walked,
            pages_skipped = self.stats.pages_skipped,
            "Collected job offers"
        );
        Ok(records)
    }

    async fn visit(&mut self, pending: PendingWindow) -> Visit<'a> {
        let root = pending.window.is_none();
        let probe = CountProbe::new(self.transport, self.path);

        self.stats.count_probes += 1;
        let count = match probe.count(&pending.params).await {
            Ok(count) => count,
            Err(error) if root => return Visit::Fail { error, fatal: true },
            Err(error) => {
                error!(
                    error = %error,
                    params = %pending.params,
                    "Count probe failed, abandoning window"
                );
                self.stats.windows_aborted += 1;
                return Visit::Skip;
            }
        };

        match count {
            None => match self.config.unknown_count {
                UnknownCountPolicy::Walk => {
                    warn!(params = %pending.params, "Unknown offer count, fetching without splitting");
                    self.walk(pending)
                }
                UnknownCountPolicy::Skip => {
                    error!(params = %pending.params, "Unknown offer count, abandoning window");
                    self.stats.windows_aborted += 1;
                    Visit::Skip
                }
            },
            Some(count) if !self.partitioner.should_split(count) => self.walk(pending),
            Some(count) => self.split(pending, count, root),
        }
    }

    fn walk(&mut self, pending: PendingWindow) -> Visit<'a> {
        self.stats.windows_walked += 1;
        Visit::Walk(ChunkWalker::new(
            self.transport,
            self.path,
            pending.params,
            pending.window,
            self.config.page_failure,
        ))
    }

    fn split(&mut self, pending: PendingWindow, count: u64, root: bool) -> Visit<'a> {
        let resolved =
            match self
                .partitioner
                .resolve(&pending.params, self.now, self.max_creation_days)
            {
                Ok(Some(resolved)) => resolved,
                Ok(None) => return Visit::Skip,
                Err(error) => {
                    if !root {
                        self.stats.windows_aborted += 1;
                    }
                    return Visit::Fail { error, fatal: root };
                }
            };
        let (window, params) = resolved;

        let halves = if pending.depth < self.config.max_split_depth {
            self.partitioner.split(&window, &params)
        } else {
            None
        };

        let Some(((left, left_params), (right, right_params))) = halves else {
            error!(
                %window,
                count,
                depth = pending.depth,
                "Window over the ceiling cannot be split any further"
            );
            self.stats.windows_aborted += 1;
            return Visit::Fail {
                error: Error::UnsplittableWindow {
                    window: window.to_string(),
                    count,
                },
                fatal: false,
            };
        };

        debug!(%window, count, %left, %right, "Splitting window");
        self.stats.windows_split += 1;

        self.pending.push(PendingWindow {
            params: right_params,
            window: Some(right),
            depth: pending.depth + 1,
        });
        self.pending.push(PendingWindow {
            params: left_params,
            window: Some(left),
            depth: pending.depth + 1,
        });
        Visit::Split
    }
}

impl std::fmt::Debug for OfferStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfferStream")
            .field("pending", &self.pending.len())
            .field("walker", &self.walker)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
