//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request id, trace, timeout layers)
//!     → per-request worker task writing into an HttpSink (sink.rs)
//!     → middleware/recovery.rs (guarded scope)
//!     → buffer.rs (ResponseBuffer captures the handler's output)
//!     → routing::Router → handler
//!     → flush or error page → HttpSink → streamed to client
//! ```

pub mod buffer;
pub mod handler;
pub mod middleware;
pub mod server;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;

pub use buffer::ResponseBuffer;
pub use handler::Handler;
pub use server::HttpServer;
pub use sink::{HttpSink, PendingResponse, ResponseWriter};

/// Header carrying the per-request id.
pub const X_REQUEST_ID: &str = "x-request-id";
