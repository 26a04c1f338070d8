//! Creation-date windows and their bisection
//!
//! A query whose match count reaches the ceiling is cut in two along its
//! creation-date window: `[start, mid]` and `[mid + 1s, end]`. Timestamps have
//! one-second resolution, so the two halves are disjoint and together cover
//! the parent exactly.

use super::params::{
    format_date, QueryParams, MAX_CREATION_DATE, MIN_CREATION_DATE, PUBLISHED_SINCE,
};
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::fmt;
use tracing::debug;

/// Source of "now" for default windows and `publieeDepuis` folding
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Truncate a timestamp to whole seconds
pub fn truncate_to_second(value: DateTime<Utc>) -> DateTime<Utc> {
    value.duration_trunc(Duration::seconds(1)).unwrap_or(value)
}

/// Inclusive creation-date interval `[start, end]`, second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    /// Create a window; sub-second precision is dropped
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let start = truncate_to_second(start);
        let end = truncate_to_second(end);
        if start > end {
            return Err(Error::InvalidWindow {
                start: format_date(&start),
                end: format_date(&end),
            });
        }
        Ok(Self { start, end })
    }

    /// First covered second
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Last covered second
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Distance between start and end
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Check whether a timestamp falls inside the window
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Bisect into `[start, mid]` and `[mid + 1s, end]`
    ///
    /// Returns `None` for a window narrower than one second, which has no
    /// second left for its right half.
    pub fn split(&self) -> Option<(Window, Window)> {
        let span = self.duration().num_seconds();
        if span < 1 {
            return None;
        }
        let mid = self.start + Duration::seconds(span / 2);
        Some((
            Window {
                start: self.start,
                end: mid,
            },
            Window {
                start: mid + Duration::seconds(1),
                end: self.end,
            },
        ))
    }

    /// Copy `params` with this window's bounds written into it
    pub fn apply_to(&self, params: &QueryParams) -> QueryParams {
        let mut params = params.clone();
        params.insert(MIN_CREATION_DATE, format_date(&self.start));
        params.insert(MAX_CREATION_DATE, format_date(&self.end));
        params
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", format_date(&self.start), format_date(&self.end))
    }
}

/// Decides when a query must be split and computes the two halves
#[derive(Debug, Clone, Copy)]
pub struct WindowPartitioner {
    ceiling: u64,
}

impl WindowPartitioner {
    /// Create a partitioner for the given result ceiling
    pub fn new(ceiling: u64) -> Self {
        Self { ceiling }
    }

    /// The result ceiling
    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// A query must be split once its count reaches the ceiling
    pub fn should_split(&self, count: u64) -> bool {
        count >= self.ceiling
    }

    /// Resolve the effective window of a query
    ///
    /// Missing bounds default to `[now - max_creation_days, now]`. A
    /// `publieeDepuis` filter later than the start raises the start and is
    /// removed from the returned params. Returns `Ok(None)` when that raised
    /// start lies past the end, leaving nothing to fetch.
    pub fn resolve(
        &self,
        params: &QueryParams,
        now: DateTime<Utc>,
        max_creation_days: i64,
    ) -> Result<Option<(Window, QueryParams)>> {
        let now = truncate_to_second(now);
        let mut start = match params.creation_date(MIN_CREATION_DATE)? {
            Some(start) => start,
            None => days_before(now, max_creation_days, "max_creation_days")?,
        };
        let end = params.creation_date(MAX_CREATION_DATE)?.unwrap_or(now);

        if start > end {
            return Err(Error::InvalidWindow {
                start: format_date(&start),
                end: format_date(&end),
            });
        }

        let mut params = params.clone();
        if let Some(days) = params.published_since_days()? {
            let published_since = days_before(now, days, PUBLISHED_SINCE)?;
            if published_since > start {
                start = published_since;
                params.remove(PUBLISHED_SINCE);
            }
        }

        if start > end {
            debug!(
                start = %format_date(&start),
                end = %format_date(&end),
                "publieeDepuis leaves an empty window"
            );
            return Ok(None);
        }

        Ok(Some((Window::new(start, end)?, params)))
    }

    /// Split a resolved window into two child queries
    ///
    /// Each child gets a copy of `params` with its own creation-date bounds.
    pub fn split(
        &self,
        window: &Window,
        params: &QueryParams,
    ) -> Option<((Window, QueryParams), (Window, QueryParams))> {
        let (left, right) = window.split()?;
        Some((
            (left, left.apply_to(params)),
            (right, right.apply_to(params)),
        ))
    }
}

/// `now` moved back by a number of days taken from `key`
///
/// Fails with `InvalidParam` when the offset does not fit a chrono timestamp.
pub fn days_before(now: DateTime<Utc>, days: i64, key: &str) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(|| Error::invalid_param(key, format!("{days} days is out of range")))
}

impl Default for WindowPartitioner {
    fn default() -> Self {
        Self::new(super::DEFAULT_CEILING)
    }
}
