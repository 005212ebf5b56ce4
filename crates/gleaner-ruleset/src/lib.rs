//! Gleaner Ruleset - Per-site declarative extraction rules.
//!
//! A feed site is described by a [`SiteRules`] value: the selectors that
//! locate the feed and its items, plus ordered per-field strategy lists
//! evaluated first-success-wins by the extraction layer. Rulesets are plain
//! data; swapping a site never touches engine logic.
//!
//! # Architecture
//!
//! - **Definition types** ([`definition`]): strongly-typed rules and validation
//! - **Loader** ([`loader`]): TOML file loading from a rules directory
//! - **Errors** ([`error`]): ruleset-specific error types
//!
//! # Example
//!
//! ```rust
//! use gleaner_ruleset::SiteRules;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rules = SiteRules::builtin();
//! rules.validate()?;
//!
//! println!("site: {}", rules.site.name);
//! println!("feed container: {}", rules.feed.container);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod definition;
pub mod error;
pub mod loader;

// Re-export commonly used types
pub use definition::{ChildRules, FeedSelectors, FieldRule, FieldRules, SiteMetadata, SiteRules};
pub use error::{Result, RulesetError};
pub use loader::RulesetLoader;
