//! Crawl error taxonomy.
//!
//! Only fatal-for-run conditions surface as errors on the record stream;
//! transient failures are retried, per-item failures are logged and
//! skipped, and an under-target run is reported as a count, never raised.

use gleaner_browser::DriverError;
use thiserror::Error;

/// Result alias for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Fatal-for-run crawl errors.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The feed container never mounted; nothing can be harvested
    #[error("feed failed to mount at {url}: {source}")]
    FeedUnavailable {
        /// Feed URL that was attempted
        url: String,
        /// Final driver error after retries
        #[source]
        source: DriverError,
    },

    /// Session restoration failed while authentication is mandatory
    #[error("session restore failed and authentication is required")]
    SessionRequired,

    /// A driver error escalated after retries were exhausted
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}
