//! Route pattern matching.
//!
//! # Responsibilities
//! - Match exact paths (`/panic`)
//! - Match subtrees (`/debug/` matches `/debug/` and everything below it)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A pattern ending in '/' is a subtree, anything else is exact
//! - No regex; matching is a string compare or prefix check

/// A registered route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches exactly this path.
    Exact(String),
    /// Matches this path and every path below it.
    Subtree(String),
}

impl PathPattern {
    /// Classify a pattern string. Patterns must start with '/'.
    pub fn parse(pattern: &str) -> Option<Self> {
        if !pattern.starts_with('/') {
            return None;
        }
        Some(if pattern.ends_with('/') {
            PathPattern::Subtree(pattern.to_string())
        } else {
            PathPattern::Exact(pattern.to_string())
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            PathPattern::Exact(p) | PathPattern::Subtree(p) => p,
        }
    }

    /// Returns true if the request path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Subtree(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}
