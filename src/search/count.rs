//! Total match count of a query

use super::params::QueryParams;
use crate::error::{Error, Result};
use crate::transport::Transport;
use tracing::{debug, warn};

/// Header carrying `<unit> <first>-<last>/<total>`
pub const CONTENT_RANGE: &str = "Content-Range";

/// Header carrying the page size granted by the server
pub const ACCEPT_RANGE: &str = "Accept-Range";

/// Asks the API how many offers match a query, without fetching any
#[derive(Clone, Copy)]
pub struct CountProbe<'a> {
    transport: &'a dyn Transport,
    path: &'a str,
}

impl<'a> CountProbe<'a> {
    /// Create a probe against the search endpoint at `path`
    pub fn new(transport: &'a dyn Transport, path: &'a str) -> Self {
        Self { transport, path }
    }

    /// Total number of matches, or `None` when the response carries no
    /// `Content-Range` header
    pub async fn count(&self, params: &QueryParams) -> Result<Option<u64>> {
        let response = self.transport.head(self.path, params).await?;

        match response.header(CONTENT_RANGE) {
            Some(value) => {
                let total = parse_content_range_total(value)?;
                debug!(total, %params, "Count probe");
                Ok(Some(total))
            }
            None => {
                warn!(status = response.status, %params, "Count probe returned no Content-Range");
                Ok(None)
            }
        }
    }
}

/// Extract the total from a `Content-Range` value such as `offres 0-149/3500`
pub fn parse_content_range_total(value: &str) -> Result<u64> {
    value
        .split_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
        .ok_or_else(|| Error::malformed_range(CONTENT_RANGE, value))
}

/// Extract the page size from an `Accept-Range` value
pub fn parse_accept_range(value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| Error::malformed_range(ACCEPT_RANGE, value))
}
