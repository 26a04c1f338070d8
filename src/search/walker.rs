//! Paging through one window
//!
//! A window under the ceiling is fetched with the search endpoint's
//! partial-content protocol: a 200 delivers everything at once, a 206
//! delivers the first page along with `Content-Range` (total) and
//! `Accept-Range` (page size), and further requests with the same params
//! deliver the following pages until the total is covered.

use super::count::{parse_accept_range, parse_content_range_total, ACCEPT_RANGE, CONTENT_RANGE};
use super::params::QueryParams;
use super::types::{Chunk, HarvestStats};
use super::window::Window;
use crate::error::{Error, Result};
use crate::transport::{ApiResponse, Transport};
use crate::types::{PageFailurePolicy, Record};
use futures::Stream;
use serde::Deserialize;
use tracing::{debug, error};

/// Progress through the result range of a partially delivered window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Offset of the first record of the current page
    pub range_start: u64,
    /// Offset covered so far (capped at `total`)
    pub range_end: u64,
    /// Total number of records announced by the server
    pub total: u64,
    /// Page size granted by the server
    pub granted: u64,
}

impl PageCursor {
    /// Cursor after the first page of `granted` records out of `total`
    pub fn new(total: u64, granted: u64) -> Self {
        Self {
            range_start: 0,
            range_end: granted.saturating_sub(1),
            total,
            granted,
        }
    }

    /// Build the cursor from the headers of a 206 response
    pub fn from_response(response: &ApiResponse) -> Result<Self> {
        let content_range = response
            .header(CONTENT_RANGE)
            .ok_or_else(|| Error::malformed_range(CONTENT_RANGE, ""))?;
        let accept_range = response
            .header(ACCEPT_RANGE)
            .ok_or_else(|| Error::malformed_range(ACCEPT_RANGE, ""))?;

        Ok(Self::new(
            parse_content_range_total(content_range)?,
            parse_accept_range(accept_range)?,
        ))
    }

    /// Check whether the whole range has been covered
    pub fn is_exhausted(&self) -> bool {
        self.range_end >= self.total
    }

    /// Move to the next page; returns false once the range is covered
    pub fn advance(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.range_start += self.granted;
        self.range_end = (self.range_end + self.granted).min(self.total);
        true
    }
}

/// Body of a search response
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    resultats: Vec<Record>,
}

/// Records of a 200/206 body; a missing `resultats` field is an empty page
fn parse_records(body: &str) -> Result<Vec<Record>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let page: SearchPage = serde_json::from_str(body)?;
    Ok(page.resultats)
}

#[derive(Debug)]
enum WalkState {
    Start,
    Paging(PageCursor),
    Done,
}

/// Lazily fetches the pages of one window, in server order
///
/// Nothing is requested until the first call to [`ChunkWalker::next_chunk`].
pub struct ChunkWalker<'a> {
    transport: &'a dyn Transport,
    path: &'a str,
    params: QueryParams,
    window: Option<Window>,
    policy: PageFailurePolicy,
    state: WalkState,
    stats: HarvestStats,
}

impl<'a> ChunkWalker<'a> {
    /// Create a walker for `params`, fetched from the search endpoint at `path`
    pub fn new(
        transport: &'a dyn Transport,
        path: &'a str,
        params: QueryParams,
        window: Option<Window>,
        policy: PageFailurePolicy,
    ) -> Self {
        Self {
            transport,
            path,
            params,
            window,
            policy,
            state: WalkState::Start,
            stats: HarvestStats::default(),
        }
    }

    /// Counters of this walk so far
    pub fn stats(&self) -> HarvestStats {
        self.stats
    }

    /// Fetch the next page, or `None` once the window is done
    pub async fn next_chunk(&mut self) -> Option<Chunk> {
        loop {
            match std::mem::replace(&mut self.state, WalkState::Done) {
                WalkState::Done => return None,
                WalkState::Start => return self.first_page().await,
                WalkState::Paging(mut cursor) => {
                    if !cursor.advance() {
                        return None;
                    }
                    match self.fetch_page().await {
                        Ok(records) => {
                            debug!(
                                range_start = cursor.range_start,
                                range_end = cursor.range_end,
                                total = cursor.total,
                                records = records.len(),
                                "Fetched page"
                            );
                            self.state = WalkState::Paging(cursor);
                            return Some(self.chunk(records));
                        }
                        Err(e) => {
                            self.stats.pages_skipped += 1;
                            match self.policy {
                                PageFailurePolicy::Skip => {
                                    error!(
                                        error = %e,
                                        range_start = cursor.range_start,
                                        range_end = cursor.range_end,
                                        total = cursor.total,
                                        params = %self.params,
                                        "Unexpected response while retrieving part of the job offers, skipping page"
                                    );
                                    self.state = WalkState::Paging(cursor);
                                }
                                PageFailurePolicy::AbortWindow => {
                                    error!(
                                        error = %e,
                                        range_start = cursor.range_start,
                                        total = cursor.total,
                                        params = %self.params,
                                        "Unexpected response while retrieving part of the job offers, aborting window"
                                    );
                                    self.stats.windows_aborted += 1;
                                    return None;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Turn the walker into a stream of chunks
    pub fn into_stream(self) -> impl Stream<Item = Chunk> + Send + 'a {
        futures::stream::unfold(self, |mut walker| async move {
            walker.next_chunk().await.map(|chunk| (chunk, walker))
        })
    }

    async fn first_page(&mut self) -> Option<Chunk> {
        self.stats.pages_fetched += 1;
        let response = match self.transport.get(self.path, &self.params).await {
            Ok(response) => response,
            Err(e) => {
                self.abort(&e.to_string());
                return None;
            }
        };

        if !response.is_complete() && !response.is_partial() {
            self.abort(&format!("{} - {}", response.status, response.body));
            return None;
        }

        let records = match parse_records(&response.body) {
            Ok(records) => records,
            Err(e) => {
                self.abort(&e.to_string());
                return None;
            }
        };

        if response.is_partial() {
            match PageCursor::from_response(&response) {
                Ok(cursor) => {
                    debug!(
                        total = cursor.total,
                        granted = cursor.granted,
                        params = %self.params,
                        "Partial content, paging through window"
                    );
                    self.state = WalkState::Paging(cursor);
                }
                Err(e) => {
                    error!(
                        error = %e,
                        params = %self.params,
                        "Cannot page past the first partial result, aborting window"
                    );
                    self.stats.windows_aborted += 1;
                }
            }
        }

        Some(self.chunk(records))
    }

    async fn fetch_page(&mut self) -> Result<Vec<Record>> {
        self.stats.pages_fetched += 1;
        let response = self.transport.get(self.path, &self.params).await?;
        if !response.is_complete() && !response.is_partial() {
            return Err(Error::http_status(response.status, response.body));
        }
        parse_records(&response.body)
    }

    fn abort(&mut self, reason: &str) {
        self.stats.windows_aborted += 1;
        error!(
            reason,
            params = %self.params,
            "Unexpected error while retrieving job offers, aborting window"
        );
    }

    fn chunk(&mut self, records: Vec<Record>) -> Chunk {
        self.stats.records += records.len();
        Chunk::new(self.window, records)
    }
}

impl std::fmt::Debug for ChunkWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkWalker")
            .field("params", &self.params)
            .field("window", &self.window)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod cursor_tests {
    use super::*;

    #[test]
    fn test_cursor_issues_three_more_pages_for_320_by_100() {
        let mut cursor = PageCursor::new(320, 100);
        let mut ends = Vec::new();
        while cursor.advance() {
            ends.push(cursor.range_end);
        }
        assert_eq!(ends, vec![199, 299, 320]);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_cursor_single_page() {
        let mut cursor = PageCursor::new(150, 150);
        assert!(cursor.advance());
        assert_eq!(cursor.range_end, 150);
        assert!(!cursor.advance());
    }

    #[test]
    fn test_cursor_total_below_page_size() {
        let mut cursor = PageCursor::new(40, 150);
        assert!(cursor.is_exhausted());
        assert!(!cursor.advance());
    }

    #[test]
    fn test_cursor_from_response() {
        let response = ApiResponse::new(206, "")
            .with_header("Content-Range", "offres 0-149/3000")
            .with_header("Accept-Range", "150");
        let cursor = PageCursor::from_response(&response).unwrap();
        assert_eq!(cursor, PageCursor::new(3000, 150));
    }

    #[test]
    fn test_cursor_from_response_missing_header() {
        let response =
            ApiResponse::new(206, "").with_header("Content-Range", "offres 0-149/3000");
        assert!(PageCursor::from_response(&response).is_err());
    }

    #[test]
    fn test_parse_records_missing_field() {
        assert!(parse_records(r#"{"filtresPossibles": []}"#).unwrap().is_empty());
        assert!(parse_records("").unwrap().is_empty());
        assert_eq!(parse_records(r#"{"resultats": [{"id": "1"}]}"#).unwrap().len(), 1);
        assert!(parse_records("not json").is_err());
    }
}
