//! Live Chromium implementation of the [`FeedDriver`] seam.
//!
//! One `FeedBrowser` owns one page. Element handles issued to the engine are
//! backed by a registry of chromiumoxide elements; the registry is reset on
//! every probe pass, matching the engine's per-tick harvesting rhythm.

use crate::actions::{ElementHandle, ElementProbe, FeedDriver};
use crate::error::{DriverError, Result};
use crate::session::SessionCookie;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Element, Page};
use futures_util::stream::StreamExt;
use gleaner_core::BrowserSettings;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Poll interval for bounded selector waits.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser-backed feed driver.
pub struct FeedBrowser {
    browser: Browser,
    page: Page,
    elements: Mutex<HashMap<u64, Element>>,
    next_handle: AtomicU64,
}

impl FeedBrowser {
    /// Launch a Chromium instance and open a blank page.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(settings.window_width, settings.window_height);
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        // Drive the CDP event loop for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        if let Some(agent) = &settings.user_agent {
            page.set_user_agent(agent.as_str())
                .await
                .map_err(|e| DriverError::Launch(e.to_string()))?;
        }

        Ok(Self {
            browser,
            page,
            elements: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    /// Close the browser.
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| DriverError::Cdp(e.to_string()))?;
        Ok(())
    }

    /// Current page URL, used to scope host-only cookies.
    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(|e| classify("current url", &e))?
            .ok_or_else(|| DriverError::Navigation("page has no URL yet".to_string()))
    }
}

/// Map a protocol error onto the driver taxonomy.
fn classify(context: &str, err: &CdpError) -> DriverError {
    match err {
        CdpError::Timeout => DriverError::Timeout(context.to_string()),
        CdpError::NotFound => DriverError::SelectorNotFound(context.to_string()),
        other => {
            let message = other.to_string();
            if message.contains("Could not find node") || message.contains("node with given id") {
                DriverError::StaleElement(format!("{context}: {message}"))
            } else {
                DriverError::Cdp(format!("{context}: {message}"))
            }
        }
    }
}

/// Quote a string for safe embedding in an evaluated script.
fn js_string(value: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| DriverError::Script(e.to_string()))
}

/// Rough visibility check; layout-detached elements report no client rects.
async fn element_visible(element: &Element) -> bool {
    element
        .call_js_fn("function() { return this.getClientRects().length > 0; }", false)
        .await
        .ok()
        .and_then(|ret| ret.result.value)
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl FeedDriver for FeedBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(format!("{url}: {e}")))?;
        if let Err(e) = self.page.wait_for_navigation().await {
            debug!(url, error = %e, "navigation settle wait failed");
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.page
            .reload()
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Navigation(format!("reload: {e}")))
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout(selector.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn scroll_feed(&self) -> Result<()> {
        self.page
            .evaluate("window.scrollBy(0, window.innerHeight * 0.8);")
            .await
            .map(|_| ())
            .map_err(|e| classify("scroll", &e))
    }

    async fn rendered_count(&self, selector: &str) -> Result<usize> {
        let script = format!("document.querySelectorAll({}).length", js_string(selector)?);
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| classify("rendered count", &e))?;

        let count = result
            .value()
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    async fn probe_elements(
        &self,
        item: &str,
        permalink: &str,
        timestamp: &str,
    ) -> Result<Vec<ElementProbe>> {
        let elements = self
            .page
            .find_elements(item)
            .await
            .map_err(|e| classify(item, &e))?;

        let mut registry = self.elements.lock().await;
        registry.clear();

        let mut probes = Vec::with_capacity(elements.len());
        for element in elements {
            let link = match element.find_element(permalink).await {
                Ok(link) => link.attribute("href").await.ok().flatten(),
                Err(_) => None,
            };
            let has_timestamp = element.find_element(timestamp).await.is_ok();

            let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
            registry.insert(id, element);
            probes.push(ElementProbe {
                handle: ElementHandle(id),
                permalink: link,
                has_timestamp,
            });
        }

        Ok(probes)
    }

    async fn expand_element(&self, handle: ElementHandle, selector: &str) -> Result<bool> {
        let registry = self.elements.lock().await;
        let Some(element) = registry.get(&handle.0) else {
            return Err(DriverError::StaleElement(format!("handle {}", handle.0)));
        };

        match element.find_element(selector).await {
            Ok(button) => {
                button
                    .scroll_into_view()
                    .await
                    .map_err(|e| classify("expand scroll", &e))?;
                button.click().await.map_err(|e| classify("expand click", &e))?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn capture_markup(&self, handle: ElementHandle) -> Result<String> {
        let registry = self.elements.lock().await;
        let Some(element) = registry.get(&handle.0) else {
            return Err(DriverError::StaleElement(format!("handle {}", handle.0)));
        };

        match element.outer_html().await {
            Ok(Some(html)) => Ok(html),
            Ok(None) => Err(DriverError::StaleElement(format!(
                "handle {} has no markup",
                handle.0
            ))),
            Err(e) => Err(classify("markup capture", &e)),
        }
    }

    async fn visible_overlays(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let Ok(found) = self.page.find_elements(selector).await else {
            return Ok(Vec::new());
        };

        let mut registry = self.elements.lock().await;
        let mut handles = Vec::new();
        for element in found {
            if element_visible(&element).await {
                let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
                registry.insert(id, element);
                handles.push(ElementHandle(id));
            }
        }
        Ok(handles)
    }

    async fn click_within(&self, handle: ElementHandle, selector: &str) -> Result<bool> {
        let registry = self.elements.lock().await;
        let Some(overlay) = registry.get(&handle.0) else {
            return Err(DriverError::StaleElement(format!("handle {}", handle.0)));
        };

        match overlay.find_element(selector).await {
            Ok(button) => match button.click().await {
                Ok(_) => Ok(true),
                Err(e) => Err(classify("dismiss click", &e)),
            },
            Err(e) => {
                let mapped = classify(selector, &e);
                if mapped.is_stale() {
                    Err(mapped)
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn apply_cookie(&self, cookie: &SessionCookie, host_only: bool) -> Result<()> {
        let mut builder = CookieParam::builder()
            .name(cookie.name.clone())
            .value(cookie.value.clone())
            .path(cookie.path.clone().unwrap_or_else(|| "/".to_string()))
            .secure(cookie.secure)
            .http_only(cookie.http_only);

        if let (false, Some(domain)) = (host_only, &cookie.domain) {
            builder = builder.domain(domain.trim_start_matches('.').to_string());
        } else {
            // Host-only: let the browser scope the cookie to the current page.
            builder = builder.url(self.current_url().await?);
        }

        if let Some(expires) = cookie.expires {
            if expires > 0.0 {
                builder = builder.expires(TimeSinceEpoch::new(expires));
            }
        }

        let param = builder.build().map_err(DriverError::CookieRejected)?;
        self.page
            .set_cookies(vec![param])
            .await
            .map(|_| ())
            .map_err(|e| DriverError::CookieRejected(e.to_string()))
    }

    async fn set_storage_item(&self, name: &str, value: &str) -> Result<()> {
        let script = format!(
            "window.localStorage.setItem({}, {});",
            js_string(name)?,
            js_string(value)?
        );
        self.page
            .evaluate(script)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Script(format!("localStorage set: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_protocol_errors() {
        let err = classify("feed mount", &CdpError::Timeout);
        assert!(matches!(err, DriverError::Timeout(_)));

        let err = classify("div[role='feed']", &CdpError::NotFound);
        assert!(matches!(err, DriverError::SelectorNotFound(_)));
    }

    #[test]
    fn test_js_string_quotes() {
        assert_eq!(js_string("plain").unwrap(), "\"plain\"");
        assert_eq!(js_string("with \"quote\"").unwrap(), "\"with \\\"quote\\\"\"");
    }
}
