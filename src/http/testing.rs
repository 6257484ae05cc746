//! Test doubles for the response write surface.

use axum::http::{HeaderMap, StatusCode};
use std::io;

use super::ResponseWriter;

/// A sink that records everything it is asked to do.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub status: Option<StatusCode>,
    pub status_calls: usize,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub writes: usize,
    /// Fail every write after this many successful ones.
    pub fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ResponseWriter for RecordingSink {
    fn set_status(&mut self, status: StatusCode) {
        self.status_calls += 1;
        self.status = Some(status);
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_after.is_some_and(|limit| self.writes >= limit) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        self.writes += 1;
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}
