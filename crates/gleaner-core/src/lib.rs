//! Gleaner Core - Foundation crate for the Gleaner feed-harvesting engine.
//!
//! This crate provides the shared types, error handling and configuration
//! management that all other Gleaner crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based crawl configuration with env overrides
//! - [`types`] - Shared newtypes and the `Record` data model
//!
//! # Example
//!
//! ```rust
//! use gleaner_core::{CrawlConfig, PostIdentity};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = CrawlConfig::default();
//! config.feed.url = "https://www.facebook.com/groups/152330905406162/".to_string();
//! config.feed.target_count = 20;
//! config.validate()?;
//!
//! let identity = PostIdentity::new("1234567890")?;
//! println!("harvesting {} posts, starting at {}", config.feed.target_count, identity);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{BrowserSettings, CrawlConfig, FeedConfig, LimitsConfig};
pub use error::{ConfigError, ConfigResult, GleanerError, Result};
pub use types::{FieldKind, PostIdentity, Record, SiteId};
