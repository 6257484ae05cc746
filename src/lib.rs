//! Panic-recovering HTTP server library.
//!
//! Every request runs behind a recovery middleware that buffers the
//! handler's output and, if the handler panics, throws the partial response
//! away and answers with an error page instead. In development mode that page
//! carries the panic message and a stack trace whose source locations link to
//! a syntax-highlighted source viewer.

// Core subsystems
pub mod config;
pub mod debug;
pub mod handlers;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::{AppConfig, Mode};
pub use http::middleware::Recovery;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
