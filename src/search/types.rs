//! Search types
//!
//! Chunks, configuration and statistics for a harvest.

use super::window::Window;
use crate::types::{PageFailurePolicy, Record, UnknownCountPolicy};
use serde::{Deserialize, Serialize};

/// Ceiling on the number of results one query can page through
pub const DEFAULT_CEILING: u64 = 3000;

/// Default look-back when a query has no `minCreationDate`
pub const DEFAULT_MAX_CREATION_DAYS: i64 = 365;

/// Default path of the search endpoint, relative to the API base URL
pub const DEFAULT_SEARCH_PATH: &str = "v2/offres/search";

/// One page of records, in server order
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Leaf window the page was fetched for (`None` when the query was not split)
    pub window: Option<Window>,
    /// Records of the page
    pub records: Vec<Record>,
}

impl Chunk {
    /// Create a chunk
    pub fn new(window: Option<Window>, records: Vec<Record>) -> Self {
        Self { window, records }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the page was empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Configuration of the search engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Count at or above which a query is split
    pub ceiling: u64,
    /// Look-back of the root window when `minCreationDate` is absent
    pub max_creation_days: i64,
    /// Maximum number of nested splits before a window is reported unsplittable
    pub max_split_depth: u32,
    /// Handling of windows whose count is unknown
    pub unknown_count: UnknownCountPolicy,
    /// Handling of failed pages after the first one
    pub page_failure: PageFailurePolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
            max_creation_days: DEFAULT_MAX_CREATION_DAYS,
            max_split_depth: 40,
            unknown_count: UnknownCountPolicy::Walk,
            page_failure: PageFailurePolicy::Skip,
        }
    }
}

impl SearchConfig {
    /// Create a new search config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result ceiling
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: u64) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Set the default look-back in days
    #[must_use]
    pub fn with_max_creation_days(mut self, days: i64) -> Self {
        self.max_creation_days = days;
        self
    }

    /// Set the split depth limit
    #[must_use]
    pub fn with_max_split_depth(mut self, depth: u32) -> Self {
        self.max_split_depth = depth;
        self
    }

    /// Set the unknown count policy
    #[must_use]
    pub fn with_unknown_count(mut self, policy: UnknownCountPolicy) -> Self {
        self.unknown_count = policy;
        self
    }

    /// Set the failed page policy
    #[must_use]
    pub fn with_page_failure(mut self, policy: PageFailurePolicy) -> Self {
        self.page_failure = policy;
        self
    }
}

/// Counters of one harvest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Count probes issued
    pub count_probes: usize,
    /// Windows split in two
    pub windows_split: usize,
    /// Windows handed to the chunk walker
    pub windows_walked: usize,
    /// Windows abandoned (failed first page, failed probe, unknown count skipped)
    pub windows_aborted: usize,
    /// Page requests issued by walkers
    pub pages_fetched: usize,
    /// Pages lost to a failed request after the first one
    pub pages_skipped: usize,
    /// Records yielded
    pub records: usize,
}

impl HarvestStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another set of counters to this one
    pub fn merge(&mut self, other: &HarvestStats) {
        self.count_probes += other.count_probes;
        self.windows_split += other.windows_split;
        self.windows_walked += other.windows_walked;
        self.windows_aborted += other.windows_aborted;
        self.pages_fetched += other.pages_fetched;
        self.pages_skipped += other.pages_skipped;
        self.records += other.records;
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();
        assert_eq!(config.ceiling, 3000);
        assert_eq!(config.max_creation_days, 365);
        assert_eq!(config.max_split_depth, 40);
        assert_eq!(config.unknown_count, UnknownCountPolicy::Walk);
        assert_eq!(config.page_failure, PageFailurePolicy::Skip);
    }

    #[test]
    fn test_search_config_builder() {
        let config = SearchConfig::new()
            .with_ceiling(100)
            .with_max_creation_days(30)
            .with_max_split_depth(5)
            .with_unknown_count(UnknownCountPolicy::Skip)
            .with_page_failure(PageFailurePolicy::AbortWindow);

        assert_eq!(config.ceiling, 100);
        assert_eq!(config.max_creation_days, 30);
        assert_eq!(config.max_split_depth, 5);
        assert_eq!(config.unknown_count, UnknownCountPolicy::Skip);
        assert_eq!(config.page_failure, PageFailurePolicy::AbortWindow);
    }

    #[test]
    fn test_search_config_partial_yaml() {
        let config: SearchConfig =
            serde_yaml::from_str("ceiling: 1000\npage_failure: abort_window\n").unwrap();
        assert_eq!(config.ceiling, 1000);
        assert_eq!(config.page_failure, PageFailurePolicy::AbortWindow);
        assert_eq!(config.max_creation_days, 365);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = HarvestStats::new();
        let walk = HarvestStats {
            pages_fetched: 4,
            pages_skipped: 1,
            ..Default::default()
        };
        total.merge(&walk);
        total.merge(&walk);
        assert_eq!(total.pages_fetched, 8);
        assert_eq!(total.pages_skipped, 2);
    }
}
