//! Search query parameters
//!
//! A query is a mapping of filter names to values. Three keys are read by the
//! engine itself: the creation-date bounds and the "published within N days"
//! filter. Everything else is passed through to the API untouched.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lower bound of the creation-date window
pub const MIN_CREATION_DATE: &str = "minCreationDate";

/// Upper bound of the creation-date window
pub const MAX_CREATION_DATE: &str = "maxCreationDate";

/// "Published within N days" filter
pub const PUBLISHED_SINCE: &str = "publieeDepuis";

/// Timestamp format accepted and produced for the creation-date bounds
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value
    Int(i64),
    /// Text value
    Text(String),
}

impl ParamValue {
    /// Interpret the value as an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Search filters, kept in key order so requests are reproducible
///
/// `QueryParams` is a value type: splitting a query clones it, so sibling
/// windows never share state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, ParamValue>);

impl QueryParams {
    /// Create empty params
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Parse `key=value` pairs, as given on the command line
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::invalid_param(pair, "expected key=value"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::invalid_param(pair, "empty parameter name"));
            }
            params.insert(key, value.trim());
        }
        Ok(params)
    }

    /// Insert or replace a parameter
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove a parameter
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    /// Get a parameter
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Check whether a parameter is present
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether there are no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over parameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Render as query string pairs
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Parse a creation-date bound, if present
    pub fn creation_date(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Text(s)) => parse_date(key, s).map(Some),
            Some(ParamValue::Int(n)) => Err(Error::invalid_param(
                key,
                format!("expected a {DATE_FORMAT} timestamp, got {n}"),
            )),
        }
    }

    /// Parse the "published within N days" filter, if present
    pub fn published_since_days(&self) -> Result<Option<i64>> {
        match self.get(PUBLISHED_SINCE) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                Error::invalid_param(PUBLISHED_SINCE, format!("not a number: {value}"))
            }),
        }
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

/// Parse a `YYYY-MM-DDTHH:MM:SSZ` timestamp
pub fn parse_date(key: &str, value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            Error::invalid_param(key, format!("'{value}' is not a {DATE_FORMAT} timestamp: {e}"))
        })
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_date(value: &DateTime<Utc>) -> String {
    value.format(DATE_FORMAT).to_string()
}
