//! Driver error taxonomy.
//!
//! Errors are split into transient classes (worth retrying: the page is
//! temporarily slow or mid-rerender) and structural classes (the site
//! changed or the browser is gone: fail fast).

use thiserror::Error;

/// Result alias for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors produced by browser driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Browser failed to launch or attach
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Navigation failed
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A selector matched nothing
    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    /// An element handle went stale (detached or re-rendered)
    #[error("stale element: {0}")]
    StaleElement(String),

    /// A bounded wait elapsed
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// In-page script evaluation failed
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// The browser rejected a cookie
    #[error("cookie rejected: {0}")]
    CookieRejected(String),

    /// Underlying protocol error
    #[error("cdp error: {0}")]
    Cdp(String),
}

impl DriverError {
    /// Whether this error is worth retrying.
    ///
    /// Element-not-found, staleness and timeouts are transient; anything
    /// else indicates the page structure or the browser itself changed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SelectorNotFound(_) | Self::StaleElement(_) | Self::Timeout(_)
        )
    }

    /// Whether this error indicates a stale element handle.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement(_))
    }
}
