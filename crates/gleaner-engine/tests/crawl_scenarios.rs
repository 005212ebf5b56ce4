//! End-to-end crawl scenarios against a scripted in-memory driver.
//!
//! The driver reveals a fixed corpus of posts a few at a time per scroll,
//! mirroring an infinitely-scrolling feed that eventually runs dry.

use gleaner_browser::{
    DriverError, ElementHandle, ElementProbe, FeedDriver, Result as DriverResult, SessionCookie,
};
use gleaner_core::{CrawlConfig, FieldKind};
use gleaner_engine::{CrawlError, FeedCrawler, RecordStream};
use gleaner_ruleset::SiteRules;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One scripted feed post.
#[derive(Clone)]
struct FakePost {
    permalink: Option<String>,
    has_timestamp: bool,
    markup: String,
}

impl FakePost {
    fn with_body(id: u64, body: &str) -> Self {
        Self {
            permalink: Some(format!(
                "https://example.com/groups/77/posts/10000000{id}/?ref=feed"
            )),
            has_timestamp: true,
            markup: format!(
                "<div role=\"article\"><div data-ad-preview=\"message\">{body}</div></div>"
            ),
        }
    }

    fn hollow(id: u64) -> Self {
        Self {
            permalink: Some(format!(
                "https://example.com/groups/77/posts/20000000{id}/"
            )),
            has_timestamp: false,
            markup: "<div role=\"article\"><span>sponsored</span></div>".to_string(),
        }
    }
}

/// Scripted feed: reveals `reveal_per_scroll` more posts on every scroll.
struct FakeDriver {
    posts: Vec<FakePost>,
    reveal_per_scroll: usize,
    revealed: AtomicUsize,
    feed_mounts: bool,
}

impl FakeDriver {
    fn new(posts: Vec<FakePost>, reveal_per_scroll: usize) -> Self {
        Self {
            posts,
            reveal_per_scroll,
            revealed: AtomicUsize::new(0),
            feed_mounts: true,
        }
    }

    fn unmountable() -> Self {
        Self {
            posts: Vec::new(),
            reveal_per_scroll: 0,
            revealed: AtomicUsize::new(0),
            feed_mounts: false,
        }
    }
}

#[async_trait::async_trait]
impl FeedDriver for FakeDriver {
    async fn navigate(&self, _url: &str) -> DriverResult<()> {
        Ok(())
    }

    async fn reload(&self) -> DriverResult<()> {
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> DriverResult<()> {
        if self.feed_mounts {
            Ok(())
        } else {
            Err(DriverError::Timeout(selector.to_string()))
        }
    }

    async fn scroll_feed(&self) -> DriverResult<()> {
        let revealed = self.revealed.load(Ordering::SeqCst);
        let next = (revealed + self.reveal_per_scroll).min(self.posts.len());
        self.revealed.store(next, Ordering::SeqCst);
        Ok(())
    }

    async fn rendered_count(&self, _selector: &str) -> DriverResult<usize> {
        Ok(self.revealed.load(Ordering::SeqCst))
    }

    async fn probe_elements(
        &self,
        _item: &str,
        _permalink: &str,
        _timestamp: &str,
    ) -> DriverResult<Vec<ElementProbe>> {
        let revealed = self.revealed.load(Ordering::SeqCst);
        Ok(self.posts[..revealed]
            .iter()
            .enumerate()
            .map(|(index, post)| ElementProbe {
                handle: ElementHandle(index as u64),
                permalink: post.permalink.clone(),
                has_timestamp: post.has_timestamp,
            })
            .collect())
    }

    async fn expand_element(&self, _handle: ElementHandle, _selector: &str) -> DriverResult<bool> {
        Ok(false)
    }

    async fn capture_markup(&self, handle: ElementHandle) -> DriverResult<String> {
        self.posts
            .get(handle.0 as usize)
            .map(|post| post.markup.clone())
            .ok_or_else(|| DriverError::StaleElement(format!("handle {}", handle.0)))
    }

    async fn visible_overlays(&self, _selector: &str) -> DriverResult<Vec<ElementHandle>> {
        Ok(Vec::new())
    }

    async fn click_within(&self, _handle: ElementHandle, _selector: &str) -> DriverResult<bool> {
        Ok(false)
    }

    async fn apply_cookie(&self, _cookie: &SessionCookie, _host_only: bool) -> DriverResult<()> {
        Ok(())
    }

    async fn set_storage_item(&self, _name: &str, _value: &str) -> DriverResult<()> {
        Ok(())
    }
}

/// Config with timing knobs tightened for tests.
fn fast_config(target: usize) -> CrawlConfig {
    let mut config = CrawlConfig::default();
    config.feed.url = "https://example.com/groups/77/".to_string();
    config.feed.target_count = target;
    config.limits.feed_mount_timeout_secs = 1;
    config.limits.growth_wait_secs = 0;
    config.limits.scroll_pause_ms = 1;
    config.limits.drain_budget_secs = 5;
    config
}

async fn collect(mut stream: RecordStream) -> (Vec<gleaner_core::Record>, Option<CrawlError>) {
    let mut records = Vec::new();
    let mut error = None;
    while let Some(result) = stream.next_record().await {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }
    (records, error)
}

#[tokio::test]
async fn feed_never_mounts_is_fatal_with_zero_records() {
    let crawler = FeedCrawler::new(
        FakeDriver::unmountable(),
        SiteRules::builtin(),
        fast_config(10),
    );

    let (records, error) = collect(crawler.spawn()).await;

    assert!(records.is_empty());
    assert!(matches!(error, Some(CrawlError::FeedUnavailable { .. })));
}

#[tokio::test]
async fn all_candidates_extracted_without_duplicates() {
    let posts: Vec<_> = (0..10)
        .map(|i| FakePost::with_body(i, &format!("post number {i}")))
        .collect();
    let crawler = FeedCrawler::new(
        FakeDriver::new(posts, 4),
        SiteRules::builtin(),
        fast_config(50),
    );

    let (records, error) = collect(crawler.spawn()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 10);

    let identities: HashSet<_> = records
        .iter()
        .map(|record| record.identity.as_str().to_string())
        .collect();
    assert_eq!(identities.len(), 10, "no duplicate identities");

    let expected: HashSet<_> = (0..10).map(|i| format!("10000000{i}")).collect();
    assert_eq!(identities, expected);
}

#[tokio::test]
async fn emission_stops_at_target_count() {
    let posts: Vec<_> = (0..8)
        .map(|i| FakePost::with_body(i, &format!("post number {i}")))
        .collect();
    let crawler = FeedCrawler::new(
        FakeDriver::new(posts, 8),
        SiteRules::builtin(),
        fast_config(5),
    );

    let (records, error) = collect(crawler.spawn()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 5);
}

#[tokio::test]
async fn rerendered_candidates_are_submitted_once() {
    // The same permalink appears twice in the corpus; every tick re-probes
    // all revealed posts. Both paths must collapse to one emission.
    let mut posts: Vec<_> = (0..4)
        .map(|i| FakePost::with_body(i, &format!("post number {i}")))
        .collect();
    posts.push(FakePost::with_body(0, "post number 0, re-rendered"));

    let crawler = FeedCrawler::new(
        FakeDriver::new(posts, 2),
        SiteRules::builtin(),
        fast_config(50),
    );

    let (records, error) = collect(crawler.spawn()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 4);

    let identities: HashSet<_> = records
        .iter()
        .map(|record| record.identity.as_str().to_string())
        .collect();
    assert_eq!(identities.len(), 4);
}

#[tokio::test]
async fn insubstantial_candidates_are_dropped_silently() {
    let posts: Vec<_> = (0..3).map(FakePost::hollow).collect();
    let crawler = FeedCrawler::new(
        FakeDriver::new(posts, 3),
        SiteRules::builtin(),
        fast_config(10),
    );

    let (records, error) = collect(crawler.spawn()).await;

    assert!(records.is_empty());
    assert!(error.is_none(), "hollow candidates are not errors");
}

#[tokio::test]
async fn field_allow_list_narrows_records() {
    let posts = vec![FakePost::with_body(1, "only the body survives")];
    let mut config = fast_config(5);
    config.feed.fields = Some(vec![FieldKind::BodyText]);

    let crawler = FeedCrawler::new(FakeDriver::new(posts, 1), SiteRules::builtin(), config);
    let (records, error) = collect(crawler.spawn()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].body_text.as_deref(),
        Some("only the body survives")
    );
    assert!(records[0].posted_at.is_none());
}

#[tokio::test]
async fn missing_snapshot_with_mandatory_auth_is_fatal() {
    let posts = vec![FakePost::with_body(1, "never reached")];
    let mut config = fast_config(5);
    config.feed.require_auth = true;
    config.feed.session_snapshot = Some("/nonexistent/state.json".into());

    let crawler = FeedCrawler::new(FakeDriver::new(posts, 1), SiteRules::builtin(), config);
    let (records, error) = collect(crawler.spawn()).await;

    assert!(records.is_empty());
    assert!(matches!(error, Some(CrawlError::SessionRequired)));
}

#[tokio::test]
async fn missing_snapshot_without_mandatory_auth_degrades() {
    let posts = vec![FakePost::with_body(1, "still harvested")];
    let mut config = fast_config(5);
    config.feed.session_snapshot = Some("/nonexistent/state.json".into());

    let crawler = FeedCrawler::new(FakeDriver::new(posts, 1), SiteRules::builtin(), config);
    let (records, error) = collect(crawler.spawn()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn under_target_run_terminates_without_error() {
    let posts: Vec<_> = (0..3)
        .map(|i| FakePost::with_body(i, &format!("post number {i}")))
        .collect();
    let crawler = FeedCrawler::new(
        FakeDriver::new(posts, 2),
        SiteRules::builtin(),
        fast_config(20),
    );

    let (records, error) = collect(crawler.spawn()).await;

    // Degraded outcome: fewer records than requested, still no error.
    assert!(error.is_none());
    assert_eq!(records.len(), 3);
}
