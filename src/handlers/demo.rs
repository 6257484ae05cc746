//! Demonstration handlers: a welcome page and two deliberate panics.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
};

use crate::http::{Handler, ResponseWriter};

pub const WELCOME_MESSAGE: &str = "Welcome to the home page!";
pub const PANIC_MESSAGE: &str = "I'm panicking";
pub const PARTIAL_BODY: &str = "<h1>Partial Response Write</h1>";

/// `GET /`: static welcome body.
pub struct Welcome;

#[async_trait]
impl Handler for Welcome {
    async fn serve(&self, _request: Request<Body>, writer: &mut dyn ResponseWriter) {
        writer.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if let Err(e) = writer.write_all(WELCOME_MESSAGE.as_bytes()) {
            tracing::debug!(error = %e, "Welcome write failed");
        }
    }
}

/// `GET /panic`: panics without writing anything.
pub struct Panic;

#[async_trait]
impl Handler for Panic {
    async fn serve(&self, _request: Request<Body>, _writer: &mut dyn ResponseWriter) {
        panicking_function();
    }
}

/// `GET /panic-reset`: writes part of a page, then panics.
pub struct PanicAfterWrite;

#[async_trait]
impl Handler for PanicAfterWrite {
    async fn serve(&self, _request: Request<Body>, writer: &mut dyn ResponseWriter) {
        writer.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        let _ = writer.write_all(PARTIAL_BODY.as_bytes());
        panicking_function();
    }
}

fn panicking_function() {
    panic!("{}", PANIC_MESSAGE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::RecordingSink;
    use futures_util::FutureExt;
    use std::panic::AssertUnwindSafe;

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_welcome() {
        let mut sink = RecordingSink::default();
        Welcome.serve(request(), &mut sink).await;
        assert_eq!(sink.body_text(), WELCOME_MESSAGE);
        assert_eq!(sink.status, None);
    }

    #[tokio::test]
    async fn test_panic_after_write_writes_first() {
        crate::debug::trace::install_hook();
        let mut sink = RecordingSink::default();
        let result = AssertUnwindSafe(crate::debug::trace::guarded(
            PanicAfterWrite.serve(request(), &mut sink),
        ))
        .catch_unwind()
        .await;
        assert!(result.is_err());
        assert_eq!(sink.body_text(), PARTIAL_BODY);
    }
}
