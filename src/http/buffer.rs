//! Deferred response capture.
//!
//! `ResponseBuffer` exposes the same [`ResponseWriter`] surface as the real
//! sink but keeps everything in memory until [`ResponseBuffer::flush`]. A
//! request that panics half way through can therefore be answered with a
//! clean error page: the buffer is simply dropped instead of flushed.
//!
//! Buffering is unbounded for the lifetime of one request.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use std::io;

use super::ResponseWriter;

/// Captured status, headers and body chunks for one request.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    writes: Vec<Bytes>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently recorded status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Total number of body bytes captured so far.
    pub fn len(&self) -> usize {
        self.writes.iter().map(Bytes::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.iter().all(Bytes::is_empty)
    }

    /// Replay the captured response onto `sink`.
    ///
    /// The status goes first, then headers, then each chunk in the order it
    /// was written. Stops at the first I/O error.
    pub fn flush(self, sink: &mut dyn ResponseWriter) -> io::Result<()> {
        if let Some(status) = self.status {
            sink.set_status(status);
        }
        if !self.headers.is_empty() {
            sink.headers_mut().extend(self.headers);
        }
        for chunk in &self.writes {
            sink.write_all(chunk)?;
        }
        Ok(())
    }
}

impl ResponseWriter for ResponseBuffer {
    fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Callers may reuse `buf` once we return.
        self.writes.push(Bytes::copy_from_slice(buf));
        Ok(buf.len())
    }
}
