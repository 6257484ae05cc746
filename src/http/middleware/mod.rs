//! Request middleware.

pub mod recovery;

pub use recovery::{Outcome, Recovery, PRODUCTION_MESSAGE};
