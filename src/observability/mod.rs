//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → request spans (tower-http TraceLayer, request id attached)
//!
//! Consumer:
//!     → logging.rs (fmt subscriber on stdout, pretty or JSON)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every event of a request
//! - No metrics or failure aggregation; each panic is logged where it happens

pub mod logging;
