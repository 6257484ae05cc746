//! Development diagnostics.
//!
//! # Data Flow
//! ```text
//! panic inside a guarded handler
//!     → trace.rs (hook captures backtrace, normalized layout)
//!     → links.rs (location lines become source viewer links)
//!     → error page
//!
//! operator clicks a link
//!     → source.rs (read file)
//!     → highlight.rs (line-numbered HTML, target line marked)
//! ```

pub mod highlight;
pub mod links;
pub mod source;
pub mod trace;

pub use highlight::{Highlighter, RustHighlighter};
pub use links::{StackLinker, TraceReference};
pub use source::{SourceError, SourceViewer};
pub use trace::PanicReport;
