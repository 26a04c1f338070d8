//! Common types used throughout ft-offers
//!
//! Shared type aliases and small enums used across several modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// A single job offer record, kept opaque
pub type Record = JsonValue;

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Search Policies
// ============================================================================

/// What to do with a window whose count probe returned no `Content-Range`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCountPolicy {
    /// Assume the window is under the ceiling and walk it
    #[default]
    Walk,
    /// Abandon the window
    Skip,
}

/// What to do when a page after the first one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFailurePolicy {
    /// Log the lost page and keep walking; range accounting still advances
    #[default]
    Skip,
    /// Stop walking the window at the first failed page
    AbortWindow,
}
