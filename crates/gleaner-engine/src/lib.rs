//! Gleaner Engine - Concurrent, incremental feed crawl-and-extract.
//!
//! The engine discovers candidate postings from an infinitely-scrolling
//! feed, extracts structured records from each candidate in parallel while
//! the discovery loop keeps advancing, and enforces at-most-once emission
//! per item identity within a run. It survives a rate-limiting,
//! session-gated source via retry/backoff and session-state restoration.
//!
//! # Architecture
//!
//! - One driving task owns all browser interaction through the
//!   [`gleaner_browser::FeedDriver`] seam, alternating scroll, obstruction
//!   sweep and harvest steps.
//! - Captured markup snapshots go to a bounded pool of extraction workers
//!   ([`ExtractionPool`]); results are emitted in completion order through
//!   [`ResultSink`] onto a lazy [`RecordStream`].
//! - Candidate identity derivation ([`resolve`]) is a pure function; dedup
//!   against the per-run seen set happens before submission.
//!
//! # Example
//!
//! ```rust,ignore
//! use gleaner_browser::FeedBrowser;
//! use gleaner_core::CrawlConfig;
//! use gleaner_engine::FeedCrawler;
//! use gleaner_ruleset::SiteRules;
//! use futures::StreamExt;
//!
//! let mut config = CrawlConfig::default();
//! config.feed.url = "https://www.facebook.com/groups/152330905406162/".into();
//! config.feed.target_count = 20;
//!
//! let driver = FeedBrowser::launch(&config.browser).await?;
//! let mut stream = FeedCrawler::new(driver, SiteRules::builtin(), config).spawn();
//!
//! while let Some(record) = stream.next().await {
//!     println!("{:?}", record?);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod crawler;
pub mod error;
pub mod obstruction;
pub mod pool;
pub mod resolver;
pub mod sink;

// Re-export commonly used types
pub use crawler::{FeedCrawler, RecordStream};
pub use error::{CrawlError, Result};
pub use obstruction::ObstructionHandler;
pub use pool::{Candidate, ExtractionPool};
pub use resolver::{resolve, Resolution};
pub use sink::ResultSink;
