//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, tab width sane)
//! - Check addresses and paths are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),
    #[error("recovery.debug_path {0:?} must start and end with '/' and not be '/'")]
    DebugPath(String),
    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,
    #[error("source_view.tab_width {0} must be between 1 and 16")]
    TabWidth(usize),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let debug_path = &config.recovery.debug_path;
    if debug_path.len() < 2 || !debug_path.starts_with('/') || !debug_path.ends_with('/') {
        errors.push(ValidationError::DebugPath(debug_path.clone()));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if !(1..=16).contains(&config.source_view.tab_width) {
        errors.push(ValidationError::TabWidth(config.source_view.tab_width));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "localhost".into();
        config.recovery.debug_path = "/debug".into();
        config.timeouts.request_secs = 0;
        config.source_view.tab_width = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("localhost".into()),
                ValidationError::DebugPath("/debug".into()),
                ValidationError::RequestTimeout,
                ValidationError::TabWidth(0),
            ]
        );
    }

    #[test]
    fn test_root_debug_path_rejected() {
        let mut config = AppConfig::default();
        config.recovery.debug_path = "/".into();
        assert!(validate_config(&config).is_err());
    }
}
