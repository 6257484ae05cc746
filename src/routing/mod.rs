//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → router.rs (exact lookup, then subtree scan)
//!     → matcher.rs (evaluate pattern)
//!     → Handler | 301 to subtree root | 404
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - Deterministic: same path always reaches the same handler
//! - The router is itself a `Handler`, so it sits behind the recovery
//!   middleware like any other handler

pub mod matcher;
pub mod router;

pub use matcher::PathPattern;
pub use router::{RouteError, Router};
