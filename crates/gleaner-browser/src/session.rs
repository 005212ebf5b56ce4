//! Session-state restoration.
//!
//! A session snapshot is a durable capture of authentication cookies and
//! localStorage (Playwright storage-state JSON), produced by a manual login
//! flow outside this engine. The engine only consumes it: restoration is
//! best-effort and never raises; callers decide whether an unauthenticated
//! run is acceptable.

use crate::actions::{host_of, FeedDriver};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default settle wait after the post-restore reload.
const DEFAULT_SETTLE: Duration = Duration::from_secs(3);

/// One captured cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Captured domain, possibly dot-prefixed
    #[serde(default)]
    pub domain: Option<String>,
    /// Cookie path
    #[serde(default)]
    pub path: Option<String>,
    /// Secure flag
    #[serde(default)]
    pub secure: bool,
    /// HttpOnly flag
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
    /// Expiry as seconds since the epoch; `-1` marks a session cookie
    #[serde(default)]
    pub expires: Option<f64>,
}

/// One captured localStorage entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEntry {
    /// Entry key
    pub name: String,
    /// Entry value
    pub value: String,
}

/// Captured localStorage state for one origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginState {
    /// Origin the entries belong to
    pub origin: String,
    /// Captured entries
    #[serde(default, rename = "localStorage")]
    pub local_storage: Vec<StorageEntry>,
}

/// A captured authentication snapshot: cookies plus per-origin localStorage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Captured cookies
    #[serde(default)]
    pub cookies: Vec<SessionCookie>,
    /// Captured per-origin storage
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

impl SessionSnapshot {
    /// Load a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Cookies whose captured domain covers the given host.
    ///
    /// A dot-prefixed captured domain is trimmed before matching; cookies
    /// captured without a domain are host-only and always included.
    #[must_use]
    pub fn cookies_for_host(&self, host: &str) -> Vec<&SessionCookie> {
        self.cookies
            .iter()
            .filter(|cookie| match &cookie.domain {
                Some(domain) => domain_covers(domain, host),
                None => true,
            })
            .collect()
    }

    /// localStorage entries for origins on the given host.
    pub fn storage_for_host<'a>(
        &'a self,
        host: &'a str,
    ) -> impl Iterator<Item = &'a StorageEntry> + 'a {
        self.origins
            .iter()
            .filter(move |origin| {
                host_of(&origin.origin).is_ok_and(|origin_host| domain_covers(host, &origin_host))
            })
            .flat_map(|origin| origin.local_storage.iter())
    }
}

/// Whether a (possibly dot-prefixed) cookie domain covers a host.
fn domain_covers(domain: &str, host: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    let host = host.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}")) || domain.ends_with(&format!(".{host}"))
}

/// Restores a captured session into a fresh browser context.
pub struct SessionManager {
    snapshot_path: PathBuf,
    root_url: String,
    settle: Duration,
}

impl SessionManager {
    /// Create a manager for a snapshot file and the target site's root URL.
    #[must_use]
    pub fn new(snapshot_path: impl Into<PathBuf>, root_url: impl Into<String>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            root_url: root_url.into(),
            settle: DEFAULT_SETTLE,
        }
    }

    /// Override the settle wait after the post-restore reload.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Restore the snapshot into the driver's browser context.
    ///
    /// Navigates to the site root, applies cookies filtered to the target
    /// host (domain-qualified form first, host-only fallback when the
    /// driver rejects it), applies localStorage for matching origins, then
    /// reloads and waits briefly. Returns `false` on a missing file or any
    /// failed step; callers treat `false` as "proceed unauthenticated".
    pub async fn restore<D: FeedDriver + ?Sized>(&self, driver: &D) -> bool {
        let snapshot = match SessionSnapshot::load(&self.snapshot_path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(
                    path = %self.snapshot_path.display(),
                    error = %e,
                    "no usable session snapshot"
                );
                return false;
            }
        };

        let Ok(host) = host_of(&self.root_url) else {
            warn!(url = %self.root_url, "root URL has no host; cannot scope session");
            return false;
        };

        if let Err(e) = driver.navigate(&self.root_url).await {
            warn!(url = %self.root_url, error = %e, "navigation to site root failed");
            return false;
        }

        let cookies = snapshot.cookies_for_host(&host);
        let mut applied = 0usize;
        for cookie in &cookies {
            match driver.apply_cookie(cookie, false).await {
                Ok(()) => applied += 1,
                Err(first) => {
                    // Some drivers reject the domain-qualified form; a
                    // host-only cookie on the current origin still works.
                    match driver.apply_cookie(cookie, true).await {
                        Ok(()) => applied += 1,
                        Err(e) => {
                            debug!(
                                cookie = %cookie.name,
                                domain_error = %first,
                                host_only_error = %e,
                                "cookie rejected in both forms"
                            );
                        }
                    }
                }
            }
        }

        let mut storage_applied = 0usize;
        for entry in snapshot.storage_for_host(&host) {
            match driver.set_storage_item(&entry.name, &entry.value).await {
                Ok(()) => storage_applied += 1,
                Err(e) => debug!(key = %entry.name, error = %e, "localStorage entry rejected"),
            }
        }

        if let Err(e) = driver.reload().await {
            warn!(error = %e, "post-restore reload failed");
            return false;
        }
        tokio::time::sleep(self.settle).await;

        info!(
            host = %host,
            cookies = applied,
            storage_entries = storage_applied,
            "session snapshot restored"
        );
        true
    }

    /// Probe whether the restored session is still authenticated.
    ///
    /// Navigates to the site root and waits for a logged-in marker element,
    /// retrying transient failures via the given policy.
    pub async fn probe<D: FeedDriver + ?Sized>(
        &self,
        driver: &D,
        retry: &RetryPolicy,
        marker: &str,
        timeout: Duration,
    ) -> bool {
        let outcome = retry
            .run("session probe", || async {
                driver.navigate(&self.root_url).await?;
                driver.wait_for(marker, timeout).await
            })
            .await;

        match outcome {
            Ok(()) => {
                debug!("session appears to be active");
                true
            }
            Err(e) => {
                warn!(error = %e, "session appears to be inactive or probe failed");
                false
            }
        }
    }
}
