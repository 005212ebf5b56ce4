//! Ruleset-specific error types.

use thiserror::Error;

/// Result alias for ruleset operations.
pub type Result<T> = std::result::Result<T, RulesetError>;

/// Errors produced while loading or validating site rulesets.
#[derive(Debug, Error)]
pub enum RulesetError {
    /// The rules directory doesn't exist
    #[error("rules directory not found: {path}")]
    DirectoryNotFound {
        /// Path that was checked
        path: String,
    },

    /// A rules file couldn't be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A rules file isn't valid TOML
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: String,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },

    /// A ruleset failed validation
    #[error("validation failed for site {site_id}: {reason}")]
    Validation {
        /// Site the ruleset belongs to
        site_id: String,
        /// Reason for rejection
        reason: String,
    },

    /// No ruleset is known for a site
    #[error("no ruleset found for site {site_id}")]
    UnknownSite {
        /// Requested site
        site_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RulesetError::UnknownSite {
            site_id: "chotot".to_string(),
        };
        assert_eq!(err.to_string(), "no ruleset found for site chotot");
    }
}
