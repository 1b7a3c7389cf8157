//! Core identifiers used throughout the harness.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suite name - uniquely identifies a scenario suite within a run.
///
/// # Example
/// ```
/// use servcheck_common::SuiteName;
///
/// let suite = SuiteName::from("body_limit_a");
/// assert_eq!(suite.as_str(), "body_limit_a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteName(String);

impl SuiteName {
    /// Creates a new SuiteName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the suite name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SuiteName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SuiteName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SuiteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
