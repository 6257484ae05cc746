//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CLI overrides (main.rs)
//!     → AppConfig (validated, immutable)
//!     → passed by value/reference to constructors at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no global config state
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, ListenerConfig, LogFormat, Mode, ObservabilityConfig, RecoveryConfig,
    SourceViewConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
