//! Request handlers.
//!
//! # Routes
//! ```text
//! /             → demo::Welcome
//! /panic        → demo::Panic
//! /panic-reset  → demo::PanicAfterWrite
//! /debug/       → source::SourceView   (development mode only)
//! ```

pub mod demo;
pub mod source;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::debug::{RustHighlighter, SourceViewer};
use crate::routing::{RouteError, Router};

pub use demo::{Panic, PanicAfterWrite, Welcome};
pub use source::SourceView;

/// Build the application router for `config`.
pub fn router(config: &AppConfig) -> Result<Router, RouteError> {
    let router = Router::new()
        .route("/", Welcome)?
        .route("/panic", Panic)?
        .route("/panic-reset", PanicAfterWrite)?;

    if !config.recovery.mode.is_dev() {
        return Ok(router);
    }

    let highlighter = Arc::new(RustHighlighter::new(config.source_view.tab_width));
    let viewer = SourceViewer::new(highlighter);
    router.route(&config.recovery.debug_path, SourceView::new(viewer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    #[test]
    fn test_source_view_only_in_development() {
        let mut config = AppConfig::default();
        assert!(router(&config).unwrap().patterns().contains(&"/debug/".to_string()));

        config.recovery.mode = Mode::Production;
        assert!(!router(&config).unwrap().patterns().contains(&"/debug/".to_string()));
    }
}
