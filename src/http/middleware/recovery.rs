//! Panic recovery middleware.
//!
//! Every request runs against a [`ResponseBuffer`] inside a guarded scope.
//! Per request the middleware moves through
//!
//! ```text
//! Running ──ok──▶ Completed   (buffer flushed to the real sink)
//!    │
//!    └─panic─▶ Recovering ──▶ Responded   (buffer dropped, error page written)
//! ```
//!
//! so exactly one of flush / error page reaches the real sink. Partial output
//! from a panicking handler never leaves the process.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
};
use futures_util::FutureExt;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::config::{Mode, RecoveryConfig};
use crate::debug::{trace, PanicReport, StackLinker};
use crate::http::{Handler, ResponseBuffer, ResponseWriter, X_REQUEST_ID};

/// Body sent for any recovered panic in production mode.
pub const PRODUCTION_MESSAGE: &str = "Something went wrong";

/// How a request left the middleware.
#[derive(Debug)]
pub enum Outcome {
    /// The handler returned and its buffered response was flushed.
    Completed,
    /// The handler panicked and an error page was written instead.
    Recovered(PanicReport),
}

/// Wraps a handler so that panics become error responses.
pub struct Recovery {
    next: Arc<dyn Handler>,
    mode: Mode,
    linker: StackLinker,
}

impl Recovery {
    /// Wrap `next`. Installs the process-wide panic capture hook.
    pub fn new(next: Arc<dyn Handler>, config: &RecoveryConfig) -> Self {
        trace::install_hook();
        Self {
            next,
            mode: config.mode,
            linker: StackLinker::new(config.debug_path.clone()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Run one request through the wrapped handler.
    ///
    /// Returns the I/O error from flushing or from writing the error page;
    /// by then the head may already be on the wire, so callers can only log
    /// it.
    pub async fn handle(
        &self,
        request: Request<Body>,
        sink: &mut dyn ResponseWriter,
    ) -> io::Result<Outcome> {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut buffer = ResponseBuffer::new();
        let result = AssertUnwindSafe(trace::guarded(self.next.serve(request, &mut buffer)))
            .catch_unwind()
            .await;

        let payload = match result {
            Ok(()) => {
                tracing::trace!(request_id = %request_id, bytes = buffer.len(), "Flushing buffered response");
                buffer.flush(sink)?;
                return Ok(Outcome::Completed);
            }
            Err(payload) => payload,
        };

        let report = PanicReport::from_payload(payload.as_ref());
        tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            panic.message = %report.message,
            panic.location = report.location.as_deref().unwrap_or("unknown"),
            discarded_bytes = buffer.len(),
            "Recovered from handler panic"
        );
        tracing::error!(request_id = %request_id, "Panic stack trace:\n{}", report.trace);
        drop(buffer);

        match self.mode {
            Mode::Production => write_production_page(sink)?,
            Mode::Development => self.write_development_page(&report, sink)?,
        }
        Ok(Outcome::Recovered(report))
    }

    fn write_development_page(
        &self,
        report: &PanicReport,
        sink: &mut dyn ResponseWriter,
    ) -> io::Result<()> {
        let page = format!(
            "<h2>Panic: {}</h2>\n<pre>{}</pre>",
            html_escape::encode_text(&report.message),
            self.annotate(&report.trace),
        );
        sink.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        sink.write_all(page.as_bytes())
    }

    /// Escape the trace for HTML and link its source locations.
    pub fn annotate(&self, trace: &str) -> String {
        self.linker.render_html(trace)
    }
}

fn write_production_page(sink: &mut dyn ResponseWriter) -> io::Result<()> {
    let headers = sink.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    sink.write_all(PRODUCTION_MESSAGE.as_bytes())?;
    sink.write_all(b"\n")
}

#[async_trait]
impl Handler for Recovery {
    async fn serve(&self, request: Request<Body>, writer: &mut dyn ResponseWriter) {
        if let Err(e) = self.handle(request, writer).await {
            tracing::warn!(error = %e, "Failed to deliver response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::RecordingSink;

    struct Scripted(fn(&mut dyn ResponseWriter));

    #[async_trait]
    impl Handler for Scripted {
        async fn serve(&self, _request: Request<Body>, writer: &mut dyn ResponseWriter) {
            tokio::task::yield_now().await;
            (self.0)(writer)
        }
    }

    fn recovery(mode: Mode, script: fn(&mut dyn ResponseWriter)) -> Recovery {
        let config = RecoveryConfig {
            mode,
            ..RecoveryConfig::default()
        };
        Recovery::new(Arc::new(Scripted(script)), &config)
    }

    fn request() -> Request<Body> {
        Request::builder()
            .uri("/test")
            .header(X_REQUEST_ID, "req-1")
            .body(Body::empty())
            .unwrap()
    }

    fn partial_then_panic(w: &mut dyn ResponseWriter) {
        w.set_status(StatusCode::ACCEPTED);
        w.write_all(b"<h1>Partial Response Write</h1>").unwrap();
        deep::fail();
    }

    mod deep {
        pub fn fail() {
            inner()
        }

        fn inner() {
            panic!("I'm panicking")
        }
    }

    #[tokio::test]
    async fn test_completed_request_is_flushed() {
        let recovery = recovery(Mode::Production, |w| {
            w.set_status(StatusCode::CREATED);
            w.write_all(b"hello, ").unwrap();
            w.write_all(b"world").unwrap();
        });
        let mut sink = RecordingSink::default();

        let outcome = recovery.handle(request(), &mut sink).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed));
        assert_eq!(sink.status, Some(StatusCode::CREATED));
        assert_eq!(sink.body_text(), "hello, world");
    }

    #[tokio::test]
    async fn test_production_discards_partial_response() {
        let recovery = recovery(Mode::Production, partial_then_panic);
        let mut sink = RecordingSink::default();

        let outcome = recovery.handle(request(), &mut sink).await.unwrap();
        assert!(matches!(outcome, Outcome::Recovered(ref r) if r.message == "I'm panicking"));
        assert_eq!(sink.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(sink.status_calls, 1);
        assert_eq!(sink.body_text(), "Something went wrong\n");
        assert_eq!(sink.headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[tokio::test]
    async fn test_development_page_has_message_not_partial() {
        let recovery = recovery(Mode::Development, partial_then_panic);
        let mut sink = RecordingSink::default();

        recovery.handle(request(), &mut sink).await.unwrap();
        let body = sink.body_text();
        assert_eq!(sink.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(body.starts_with("<h2>Panic: I'm panicking</h2>\n<pre>"));
        assert!(body.ends_with("</pre>"));
        assert!(!body.contains("Partial Response Write"));
        assert_eq!(sink.headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn test_formatted_panic_message() {
        let recovery = recovery(Mode::Development, |_| {
            let id = 7;
            panic!("widget {} is <broken>", id);
        });
        let mut sink = RecordingSink::default();

        let outcome = recovery.handle(request(), &mut sink).await.unwrap();
        let Outcome::Recovered(report) = outcome else {
            panic!("expected recovery");
        };
        assert_eq!(report.message, "widget 7 is <broken>");
        assert!(sink.body_text().contains("<h2>Panic: widget 7 is &lt;broken&gt;</h2>"));
    }

    #[tokio::test]
    async fn test_flush_error_is_returned() {
        let recovery = recovery(Mode::Production, |w| {
            w.write_all(b"a").unwrap();
            w.write_all(b"b").unwrap();
        });
        let mut sink = RecordingSink::failing_after(1);

        let err = recovery.handle(request(), &mut sink).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(sink.body_text(), "a");
    }

    #[tokio::test]
    async fn test_recovery_is_reusable_after_panic() {
        let recovery = recovery(Mode::Production, partial_then_panic);
        for _ in 0..3 {
            let mut sink = RecordingSink::default();
            recovery.handle(request(), &mut sink).await.unwrap();
            assert_eq!(sink.body_text(), "Something went wrong\n");
        }
    }

    #[test]
    fn test_annotate_escapes_and_links() {
        let recovery = recovery(Mode::Development, |_| {});
        let out = recovery.annotate("<T as Foo>::bar\n\tsrc/lib.rs:12:9\n\t<weird>");
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines[0], "&lt;T as Foo&gt;::bar");
        assert_eq!(
            lines[1],
            "\t<a href=\"/debug/?source=src%2Flib.rs&amp;line=12\">src/lib.rs:12</a>:9"
        );
        assert_eq!(lines[2], "\t&lt;weird&gt;");
    }

    #[test]
    fn test_annotate_escapes_markup_after_location() {
        let recovery = recovery(Mode::Development, |_| {});
        let out = recovery.annotate("\t/src/a.rs:3 <script>alert(1)</script>");
        assert_eq!(
            out,
            "\t<a href=\"/debug/?source=%2Fsrc%2Fa.rs&amp;line=3\">/src/a.rs:3</a> &lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }
}
