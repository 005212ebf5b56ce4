//! Crawl configuration for Gleaner.
//!
//! Provides TOML-based configuration with partial-file support and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::FieldKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for one crawl invocation.
///
/// Any section or field may be omitted from the TOML file; defaults apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Feed target and output settings
    pub feed: FeedConfig,
    /// Loop bounds and timing knobs
    pub limits: LimitsConfig,
    /// Browser automation settings
    pub browser: BrowserSettings,
}

impl CrawlConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if the file is missing, unreadable or not valid TOML.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading crawl config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a TOML file with environment overrides applied.
    ///
    /// Supports the following environment variables:
    /// - `GLEANER_HEADLESS`: Override browser headless mode (true/false)
    /// - `GLEANER_WORKERS`: Override extraction worker count
    /// - `GLEANER_TARGET_COUNT`: Override the target post count
    pub fn from_path_with_env(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let mut config = Self::from_path(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to this configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GLEANER_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("GLEANER_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.limits.workers = workers;
                tracing::debug!("Override limits.workers from env: {}", workers);
            }
        }

        if let Ok(val) = std::env::var("GLEANER_TARGET_COUNT") {
            if let Ok(count) = val.parse() {
                self.feed.target_count = count;
                tracing::debug!("Override feed.target_count from env: {}", count);
            }
        }
    }

    /// Save configuration to disk, creating parent directories as needed.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::debug!("Saving crawl config to {}", path.display());
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate that the configuration can drive a crawl.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.feed.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "feed.url".to_string(),
                reason: "feed URL cannot be empty".to_string(),
            });
        }

        if self.feed.target_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "feed.target_count".to_string(),
                reason: "target count must be at least 1".to_string(),
            });
        }

        if self.limits.workers == 0 || self.limits.workers > 32 {
            return Err(ConfigError::InvalidValue {
                field: "limits.workers".to_string(),
                reason: format!("workers must be 1-32, got {}", self.limits.workers),
            });
        }

        if self.limits.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_iterations".to_string(),
                reason: "max_iterations must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Feed target and output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// URL of the scrollable feed to harvest
    pub url: String,
    /// Number of records to aim for before stopping
    pub target_count: usize,
    /// Optional field allow-list; when set, extraction skips non-listed fields
    pub fields: Option<Vec<FieldKind>>,
    /// Abort the run when session restoration fails
    pub require_auth: bool,
    /// Path to a captured session snapshot (cookies + localStorage)
    pub session_snapshot: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            target_count: 20,
            fields: None,
            require_auth: false,
            session_snapshot: None,
        }
    }
}

/// Loop bounds and timing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Number of concurrent extraction workers
    pub workers: usize,
    /// Hard cap on scroll iterations per run
    pub max_iterations: u32,
    /// Consecutive no-growth iterations before stopping
    pub max_stalled_iterations: u32,
    /// How long to wait for the feed container to mount (seconds)
    pub feed_mount_timeout_secs: u64,
    /// How long to wait for rendered-element growth after a scroll (seconds)
    pub growth_wait_secs: u64,
    /// Pause after issuing a scroll (milliseconds)
    pub scroll_pause_ms: u64,
    /// Overall budget for the final drain of outstanding extractions (seconds)
    pub drain_budget_secs: u64,
}

impl LimitsConfig {
    /// Feed mount wait as a `Duration`.
    #[must_use]
    pub fn feed_mount_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_mount_timeout_secs)
    }

    /// Growth wait as a `Duration`.
    #[must_use]
    pub fn growth_wait(&self) -> Duration {
        Duration::from_secs(self.growth_wait_secs)
    }

    /// Scroll pause as a `Duration`.
    #[must_use]
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    /// Final drain budget as a `Duration`.
    #[must_use]
    pub fn drain_budget(&self) -> Duration {
        Duration::from_secs(self.drain_budget_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            max_iterations: 50,
            max_stalled_iterations: 3,
            feed_mount_timeout_secs: 30,
            growth_wait_secs: 7,
            scroll_pause_ms: 1500,
            drain_budget_secs: 30,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run the browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// User agent override
    pub user_agent: Option<String>,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
}

impl BrowserSettings {
    /// Navigation timeout as a `Duration`.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                    .to_string(),
            ),
            navigation_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CrawlConfig::default();
        assert_eq!(config.feed.target_count, 20);
        assert_eq!(config.limits.workers, 5);
        assert_eq!(config.limits.max_iterations, 50);
        assert_eq!(config.limits.max_stalled_iterations, 3);
        assert!(config.browser.headless);
        assert!(config.feed.fields.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let config = CrawlConfig::default();
        assert!(config.validate().is_err());

        let mut config = CrawlConfig::default();
        config.feed.url = "https://www.facebook.com/groups/1/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds() {
        let mut config = CrawlConfig::default();
        config.feed.url = "https://www.facebook.com/groups/1/".to_string();
        config.limits.workers = 0;
        assert!(config.validate().is_err());

        config.limits.workers = 33;
        assert!(config.validate().is_err());

        config.limits.workers = 5;
        config.feed.target_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[feed]
url = "https://www.facebook.com/groups/152330905406162/"
target_count = 5
fields = ["body-text", "posted-at"]

[limits]
workers = 3
"#;

        let config: CrawlConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.feed.target_count, 5);
        assert_eq!(config.limits.workers, 3);
        assert_eq!(
            config.feed.fields,
            Some(vec![FieldKind::BodyText, FieldKind::PostedAt])
        );
        // These should be defaults
        assert_eq!(config.limits.max_iterations, 50);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("crawl.toml");

        let mut config = CrawlConfig::default();
        config.feed.url = "https://www.facebook.com/groups/1/".to_string();
        config.feed.target_count = 7;
        config.save_to(&path).expect("save config");

        let loaded = CrawlConfig::from_path(&path).expect("load config");
        assert_eq!(loaded.feed.url, config.feed.url);
        assert_eq!(loaded.feed.target_count, 7);
    }

    #[test]
    fn test_missing_file() {
        let err = CrawlConfig::from_path("/nonexistent/gleaner.toml");
        assert!(matches!(err, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("GLEANER_WORKERS", "9");
        std::env::set_var("GLEANER_TARGET_COUNT", "42");

        let mut config = CrawlConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.limits.workers, 9);
        assert_eq!(config.feed.target_count, 42);

        std::env::remove_var("GLEANER_WORKERS");
        std::env::remove_var("GLEANER_TARGET_COUNT");
    }
}
