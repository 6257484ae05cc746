//! Response sinks.
//!
//! # Responsibilities
//! - Define the write surface handlers see (`ResponseWriter`)
//! - Bridge that surface onto a streamed axum response (`HttpSink`)
//!
//! # Design Decisions
//! - The response head is committed on the first body write (or on drop),
//!   after which status and header changes are ignored
//! - A dropped client surfaces as `BrokenPipe` on the next write

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use std::convert::Infallible;
use std::io;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// The write surface a handler uses to produce its response.
pub trait ResponseWriter: Send {
    /// Record the response status.
    fn set_status(&mut self, status: StatusCode);

    /// Response headers, applied together with the status.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Write body bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Write the whole buffer.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

type Head = (StatusCode, HeaderMap);

/// The real response sink for one request.
///
/// The worker task writes into it; the axum side awaits the head through a
/// [`PendingResponse`] and streams the body chunks as they arrive.
#[derive(Debug)]
pub struct HttpSink {
    status: StatusCode,
    headers: HeaderMap,
    head: Option<oneshot::Sender<Head>>,
    body: mpsc::UnboundedSender<Bytes>,
}

/// The axum half of an [`HttpSink`].
#[derive(Debug)]
pub struct PendingResponse {
    head: oneshot::Receiver<Head>,
    body: mpsc::UnboundedReceiver<Bytes>,
}

impl HttpSink {
    /// Create a connected sink / response pair.
    pub fn channel() -> (Self, PendingResponse) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::unbounded_channel();
        let sink = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            head: Some(head_tx),
            body: body_tx,
        };
        (sink, PendingResponse { head: head_rx, body: body_rx })
    }

    /// Whether status and headers have been sent.
    pub fn is_committed(&self) -> bool {
        self.head.is_none()
    }

    fn commit(&mut self) -> io::Result<()> {
        let Some(head) = self.head.take() else {
            return Ok(());
        };
        head.send((self.status, std::mem::take(&mut self.headers)))
            .map_err(|_| disconnected())
    }
}

impl ResponseWriter for HttpSink {
    fn set_status(&mut self, status: StatusCode) {
        if self.is_committed() {
            tracing::warn!(status = %status, "Superfluous status write after response head was sent");
            return;
        }
        self.status = status;
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.commit()?;
        if buf.is_empty() {
            return Ok(0);
        }
        self.body
            .send(Bytes::copy_from_slice(buf))
            .map_err(|_| disconnected())?;
        Ok(buf.len())
    }
}

impl Drop for HttpSink {
    fn drop(&mut self) {
        let _ = self.commit();
    }
}

impl PendingResponse {
    /// Wait for the response head and build a streaming response.
    pub async fn into_response(self) -> Response {
        match self.head.await {
            Ok((status, headers)) => {
                let stream = UnboundedReceiverStream::new(self.body).map(Ok::<_, Infallible>);
                let mut response = Response::new(Body::from_stream(stream));
                *response.status_mut() = status;
                *response.headers_mut() = headers;
                response
            }
            Err(_) => {
                tracing::error!("Request worker exited without producing a response");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
            }
        }
    }
}

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}
