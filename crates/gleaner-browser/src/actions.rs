//! The driver seam between the crawl engine and the browser.
//!
//! The engine never touches chromiumoxide directly: everything it needs is
//! expressed on [`FeedDriver`], implemented by [`crate::FeedBrowser`] for a
//! live Chromium and by scripted in-memory drivers in tests.

use crate::error::{DriverError, Result};
use crate::session::SessionCookie;
use std::time::Duration;

/// Opaque handle to a rendered element.
///
/// Handles issued by [`FeedDriver::probe_elements`] stay valid until the
/// next probe; a dead handle surfaces as [`DriverError::StaleElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// Identifying features of one rendered feed element, gathered in a single
/// pass so candidate resolution can stay a pure function.
#[derive(Debug, Clone)]
pub struct ElementProbe {
    /// Handle for follow-up operations (expand, markup capture)
    pub handle: ElementHandle,
    /// First permalink-shaped descendant link, when present
    pub permalink: Option<String>,
    /// Whether a timestamp-like descendant exists
    pub has_timestamp: bool,
}

/// Browser operations required to drive a scrolling feed.
///
/// Implementations must be usable from a single driving task; the engine
/// guarantees it never issues concurrent calls.
#[async_trait::async_trait]
pub trait FeedDriver: Send + Sync {
    /// Navigate to a URL and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Reload the current page.
    async fn reload(&self) -> Result<()>;

    /// Wait (bounded) for a selector to appear.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Issue one incremental scroll of the feed.
    async fn scroll_feed(&self) -> Result<()>;

    /// Count currently rendered elements matching a selector.
    async fn rendered_count(&self, selector: &str) -> Result<usize>;

    /// Enumerate rendered feed items, probing each for a permalink link and
    /// a timestamp-like descendant. Invalidates previously issued handles.
    async fn probe_elements(
        &self,
        item: &str,
        permalink: &str,
        timestamp: &str,
    ) -> Result<Vec<ElementProbe>>;

    /// Click an "expand truncated text" control inside an element, if one
    /// exists. Returns `Ok(false)` when the control is absent.
    async fn expand_element(&self, handle: ElementHandle, selector: &str) -> Result<bool>;

    /// Capture the outer HTML snapshot of an element.
    async fn capture_markup(&self, handle: ElementHandle) -> Result<String>;

    /// Find currently visible overlay containers matching a selector.
    async fn visible_overlays(&self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// Click a dismiss control inside an overlay. Returns `Ok(false)` when
    /// the control is absent.
    async fn click_within(&self, handle: ElementHandle, selector: &str) -> Result<bool>;

    /// Apply one session cookie to the browser context.
    ///
    /// With `host_only` set, the cookie's captured domain is dropped and the
    /// cookie is scoped to the current page's host instead.
    async fn apply_cookie(&self, cookie: &SessionCookie, host_only: bool) -> Result<()>;

    /// Set one localStorage entry on the current origin.
    async fn set_storage_item(&self, name: &str, value: &str) -> Result<()>;
}

/// Extract the `scheme://host` origin from a URL.
pub fn origin_of(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| DriverError::Navigation(format!("invalid URL '{url}': {e}")))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| DriverError::Navigation(format!("no host in URL '{url}'")))?;

    Ok(format!("{}://{}", parsed.scheme(), host))
}

/// Extract the host from a URL.
pub fn host_of(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| DriverError::Navigation(format!("invalid URL '{url}': {e}")))?;

    parsed
        .host_str()
        .map(ToString::to_string)
        .ok_or_else(|| DriverError::Navigation(format!("no host in URL '{url}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://www.facebook.com/groups/123/?sorting_setting=CHRONOLOGICAL")
                .unwrap(),
            "https://www.facebook.com"
        );
        assert_eq!(
            origin_of("http://sub.example.com:8080/path").unwrap(),
            "http://sub.example.com"
        );
    }

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://www.facebook.com/groups/123/").unwrap(),
            "www.facebook.com"
        );
    }

    #[test]
    fn test_origin_of_invalid() {
        assert!(origin_of("not-a-url").is_err());
    }
}
