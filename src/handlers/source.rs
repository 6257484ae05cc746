//! `GET /debug/?source=<path>&line=<n>`: the source viewer over HTTP.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
};
use url::form_urlencoded;

use crate::debug::SourceViewer;
use crate::http::{Handler, ResponseWriter};

/// Serves highlighted source files named by the `source` query parameter.
#[derive(Debug, Clone)]
pub struct SourceView {
    viewer: SourceViewer,
}

/// The query a stack trace link carries.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SourceQuery {
    pub source: String,
    pub line: String,
}

impl SourceQuery {
    /// First value of each parameter wins; missing parameters are empty.
    pub fn parse(query: Option<&str>) -> Self {
        let mut parsed = Self::default();
        let (mut seen_source, mut seen_line) = (false, false);
        for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match key.as_ref() {
                "source" if !seen_source => {
                    parsed.source = value.into_owned();
                    seen_source = true;
                }
                "line" if !seen_line => {
                    parsed.line = value.into_owned();
                    seen_line = true;
                }
                _ => {}
            }
        }
        parsed
    }
}

impl SourceView {
    pub fn new(viewer: SourceViewer) -> Self {
        Self { viewer }
    }
}

#[async_trait]
impl Handler for SourceView {
    async fn serve(&self, request: Request<Body>, writer: &mut dyn ResponseWriter) {
        let query = SourceQuery::parse(request.uri().query());
        let line = SourceViewer::parse_line(&query.line);

        let result = match self.viewer.view(&query.source, line).await {
            Ok(html) => {
                writer.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                );
                writer.write_all(html.as_bytes())
            }
            Err(e) => {
                tracing::warn!(source = %query.source, error = %e, "Source view failed");
                let headers = writer.headers_mut();
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                headers.insert(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                );
                writer.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                writer.write_all(format!("{}\n", e).as_bytes())
            }
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "Source view write failed");
        }
    }
}
