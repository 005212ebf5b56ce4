//! Core error types for the Gleaner engine.
//!
//! This module defines the central error type used across all subsystems.
//! Each subsystem error is represented as a variant for clear error propagation.

use thiserror::Error;

/// Central error type for all Gleaner operations.
///
/// Each variant represents an error from a specific subsystem, allowing
/// for clear error propagation and handling across crate boundaries.
#[derive(Error, Debug)]
pub enum GleanerError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Browser driver errors (navigation, element not found, staleness)
    #[error("driver error: {0}")]
    Driver(String),

    /// Ruleset errors (definitions, loading, validation)
    #[error("ruleset error: {0}")]
    Ruleset(String),

    /// Crawl errors (feed mount, session gating)
    #[error("crawl error: {0}")]
    Crawl(String),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `GleanerError`.
pub type Result<T> = std::result::Result<T, GleanerError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GleanerError::Validation("empty feed url".to_string());
        assert_eq!(err.to_string(), "validation error: empty feed url");

        let err = ConfigError::NotFound {
            path: "/tmp/gleaner.toml".to_string(),
        };
        assert_eq!(err.to_string(), "config file not found at /tmp/gleaner.toml");
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NotFound {
            path: "x".to_string(),
        };
        let err: GleanerError = config_err.into();
        assert!(matches!(err, GleanerError::Config(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: GleanerError = io_err.into();
        assert!(matches!(err, GleanerError::Io(_)));
    }
}
