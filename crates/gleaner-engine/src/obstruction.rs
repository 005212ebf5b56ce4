//! Detection and dismissal of transient modal overlays.
//!
//! Login nags, notification prompts and similar dialogs block feed
//! interaction. Each sweep checks a fixed catalogue of overlay patterns and
//! tries an ordered list of dismiss actions on every visible one until one
//! works or the list is exhausted. An element going stale mid-dismissal
//! means the overlay already closed. Nothing here is ever fatal.

use gleaner_browser::FeedDriver;
use tracing::debug;

/// Overlay container patterns checked on every sweep.
const OVERLAY_SELECTORS: [&str; 5] = [
    "div[data-testid='dialog']",
    "div[role='dialog']",
    "div[aria-label*='Save your login info']",
    "div[aria-label*='Turn on notifications']",
    "div[aria-label='View site information']",
];

/// Dismiss actions tried in order inside a visible overlay.
const DISMISS_SELECTORS: [&str; 8] = [
    "button[aria-label='Close']",
    "a[aria-label='Close']",
    "div[role='button'][aria-label='Close']",
    "i[aria-label='Close dialog']",
    "button[aria-label='Not now']",
    "div[role='button'][aria-label='Not Now']",
    "button[aria-label='Dismiss']",
    "button[aria-label='Later']",
];

/// Sweeps the overlay catalogue and dismisses whatever is currently visible.
#[derive(Debug, Default)]
pub struct ObstructionHandler;

impl ObstructionHandler {
    /// Create a handler over the default catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Scan for visible overlays and try to dismiss each.
    ///
    /// Returns the number of overlays considered dismissed. Errors are
    /// absorbed: a failed dismissal leaves the overlay for the next sweep.
    pub async fn sweep<D: FeedDriver + ?Sized>(&self, driver: &D) -> usize {
        let mut dismissed = 0usize;

        for overlay_selector in OVERLAY_SELECTORS {
            let overlays = match driver.visible_overlays(overlay_selector).await {
                Ok(overlays) => overlays,
                Err(e) => {
                    debug!(selector = overlay_selector, error = %e, "overlay scan failed");
                    continue;
                }
            };

            for overlay in overlays {
                debug!(selector = overlay_selector, "visible overlay detected");

                for action in DISMISS_SELECTORS {
                    match driver.click_within(overlay, action).await {
                        Ok(true) => {
                            debug!(selector = overlay_selector, action, "overlay dismissed");
                            dismissed += 1;
                            break;
                        }
                        Ok(false) => {}
                        Err(e) if e.is_stale() => {
                            // The overlay vanished mid-dismissal.
                            debug!(selector = overlay_selector, "overlay went stale, treating as dismissed");
                            dismissed += 1;
                            break;
                        }
                        Err(e) => {
                            debug!(selector = overlay_selector, action, error = %e, "dismiss action failed");
                        }
                    }
                }
            }
        }

        dismissed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gleaner_browser::{DriverError, ElementHandle, ElementProbe, SessionCookie};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted driver: one overlay behind the first catalogue selector,
    /// with configurable dismissal behavior.
    struct OverlayDriver {
        /// Actions to answer with, consumed in order
        responses: Mutex<Vec<gleaner_browser::Result<bool>>>,
        clicks: Mutex<Vec<String>>,
    }

    impl OverlayDriver {
        fn new(responses: Vec<gleaner_browser::Result<bool>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                clicks: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl FeedDriver for OverlayDriver {
        async fn navigate(&self, _url: &str) -> gleaner_browser::Result<()> {
            Ok(())
        }

        async fn reload(&self) -> gleaner_browser::Result<()> {
            Ok(())
        }

        async fn wait_for(
            &self,
            _selector: &str,
            _timeout: Duration,
        ) -> gleaner_browser::Result<()> {
            Ok(())
        }

        async fn scroll_feed(&self) -> gleaner_browser::Result<()> {
            Ok(())
        }

        async fn rendered_count(&self, _selector: &str) -> gleaner_browser::Result<usize> {
            Ok(0)
        }

        async fn probe_elements(
            &self,
            _item: &str,
            _permalink: &str,
            _timestamp: &str,
        ) -> gleaner_browser::Result<Vec<ElementProbe>> {
            Ok(Vec::new())
        }

        async fn expand_element(
            &self,
            _handle: ElementHandle,
            _selector: &str,
        ) -> gleaner_browser::Result<bool> {
            Ok(false)
        }

        async fn capture_markup(&self, _handle: ElementHandle) -> gleaner_browser::Result<String> {
            Ok(String::new())
        }

        async fn visible_overlays(
            &self,
            selector: &str,
        ) -> gleaner_browser::Result<Vec<ElementHandle>> {
            if selector == OVERLAY_SELECTORS[0] {
                Ok(vec![ElementHandle(1)])
            } else {
                Ok(Vec::new())
            }
        }

        async fn click_within(
            &self,
            _handle: ElementHandle,
            selector: &str,
        ) -> gleaner_browser::Result<bool> {
            self.clicks.lock().unwrap().push(selector.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Ok(false))
        }

        async fn apply_cookie(
            &self,
            _cookie: &SessionCookie,
            _host_only: bool,
        ) -> gleaner_browser::Result<()> {
            Ok(())
        }

        async fn set_storage_item(&self, _name: &str, _value: &str) -> gleaner_browser::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_second_action_dismisses() {
        // First action misses, second clicks.
        let driver = OverlayDriver::new(vec![Ok(true), Ok(false)]);
        let dismissed = ObstructionHandler::new().sweep(&driver).await;

        assert_eq!(dismissed, 1);
        let clicks = driver.clicks.lock().unwrap();
        assert_eq!(clicks.len(), 2);
        assert_eq!(clicks[0], DISMISS_SELECTORS[0]);
        assert_eq!(clicks[1], DISMISS_SELECTORS[1]);
    }

    #[tokio::test]
    async fn test_stale_counts_as_dismissed() {
        let driver = OverlayDriver::new(vec![Err(DriverError::StaleElement("gone".into()))]);
        let dismissed = ObstructionHandler::new().sweep(&driver).await;

        assert_eq!(dismissed, 1);
        assert_eq!(driver.clicks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_actions_leave_overlay() {
        let driver = OverlayDriver::new(vec![]);
        let dismissed = ObstructionHandler::new().sweep(&driver).await;

        assert_eq!(dismissed, 0);
        // Every action was tried once.
        assert_eq!(driver.clicks.lock().unwrap().len(), DISMISS_SELECTORS.len());
    }
}
