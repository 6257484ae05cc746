//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store registered routes
//! - Look up the handler for a request path
//! - Answer unmatched paths with a redirect or 404
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Exact patterns win over subtrees; the longest subtree wins among subtrees
//! - `/prefix` redirects to `/prefix/` when only the subtree is registered

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
};
use std::collections::HashMap;
use std::sync::Arc;

use super::matcher::PathPattern;
use crate::http::{Handler, ResponseWriter};

/// Error type for route registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("invalid route pattern {0:?}: must start with '/'")]
    InvalidPattern(String),
    #[error("multiple registrations for {0}")]
    Duplicate(String),
}

/// What a lookup resolved to.
enum Resolution {
    Handler(Arc<dyn Handler>),
    Redirect(String),
    NotFound,
}

/// Path-based request router.
#[derive(Default)]
pub struct Router {
    exact: HashMap<String, Arc<dyn Handler>>,
    /// Sorted longest prefix first.
    subtrees: Vec<(PathPattern, Arc<dyn Handler>)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `pattern`.
    pub fn route(mut self, pattern: &str, handler: impl Handler) -> Result<Self, RouteError> {
        self.insert(pattern, Arc::new(handler))?;
        Ok(self)
    }

    fn insert(&mut self, pattern: &str, handler: Arc<dyn Handler>) -> Result<(), RouteError> {
        let parsed = PathPattern::parse(pattern)
            .ok_or_else(|| RouteError::InvalidPattern(pattern.to_string()))?;
        if self.has_pattern(&parsed) {
            return Err(RouteError::Duplicate(pattern.to_string()));
        }
        match parsed {
            PathPattern::Exact(path) => {
                self.exact.insert(path, handler);
            }
            subtree @ PathPattern::Subtree(_) => {
                self.subtrees.push((subtree, handler));
                self.subtrees
                    .sort_by(|(a, _), (b, _)| b.as_str().len().cmp(&a.as_str().len()));
            }
        }
        tracing::debug!(pattern = %pattern, "Route registered");
        Ok(())
    }

    fn has_pattern(&self, pattern: &PathPattern) -> bool {
        match pattern {
            PathPattern::Exact(path) => self.exact.contains_key(path),
            PathPattern::Subtree(_) => self.subtrees.iter().any(|(p, _)| p == pattern),
        }
    }

    /// Registered patterns, exact first.
    pub fn patterns(&self) -> Vec<String> {
        let mut exact: Vec<String> = self.exact.keys().cloned().collect();
        exact.sort();
        exact.extend(self.subtrees.iter().map(|(p, _)| p.as_str().to_string()));
        exact
    }

    fn resolve(&self, path: &str) -> Resolution {
        if let Some(handler) = self.exact.get(path) {
            return Resolution::Handler(handler.clone());
        }
        if !path.ends_with('/') {
            let with_slash = format!("{}/", path);
            if self
                .subtrees
                .iter()
                .any(|(p, _)| p.as_str() == with_slash)
            {
                return Resolution::Redirect(with_slash);
            }
        }
        self.subtrees
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map_or(Resolution::NotFound, |(_, handler)| {
                Resolution::Handler(handler.clone())
            })
    }
}

#[async_trait]
impl Handler for Router {
    async fn serve(&self, request: Request<Body>, writer: &mut dyn ResponseWriter) {
        let path = request.uri().path().to_string();
        match self.resolve(&path) {
            Resolution::Handler(handler) => handler.serve(request, writer).await,
            Resolution::Redirect(target) => {
                let location = match request.uri().query() {
                    Some(query) => format!("{}?{}", target, query),
                    None => target,
                };
                tracing::debug!(from = %path, to = %location, "Redirecting to subtree root");
                if let Ok(value) = HeaderValue::from_str(&location) {
                    writer.headers_mut().insert(header::LOCATION, value);
                }
                writer.set_status(StatusCode::MOVED_PERMANENTLY);
            }
            Resolution::NotFound => {
                tracing::debug!(path = %path, "No route matched");
                writer.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                writer.set_status(StatusCode::NOT_FOUND);
                let _ = writer.write_all(b"404 page not found\n");
            }
        }
    }
}
