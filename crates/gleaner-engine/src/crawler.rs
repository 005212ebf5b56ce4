//! The feed crawl loop.
//!
//! One driving task owns the browser and walks an explicit phase machine:
//! mount the feed, then alternate scroll and harvest ticks until a stop
//! condition fires, then drain outstanding extraction work and close the
//! output stream. Extraction never runs on the driving task.

use crate::error::CrawlError;
use crate::obstruction::ObstructionHandler;
use crate::pool::{Candidate, ExtractionPool};
use crate::resolver::resolve;
use crate::sink::ResultSink;
use gleaner_browser::{FeedDriver, RetryPolicy, SessionManager};
use gleaner_core::{CrawlConfig, Record};
use gleaner_ruleset::SiteRules;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Poll interval while waiting for rendered-element growth.
const GROWTH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Capacity of the output channel between the driver task and the consumer.
const STREAM_BUFFER: usize = 32;

/// Crawl phases. Scrolling and harvesting alternate until a stop condition
/// sends the run into its final drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Scrolling,
    Harvesting,
    Draining,
    Done,
}

/// Lazy, per-invocation stream of crawl results.
///
/// Yields `Ok(Record)` per extracted candidate in completion order. An
/// `Err` is terminal and only occurs for fatal-for-run conditions. The
/// stream is not restartable mid-run.
pub struct RecordStream {
    rx: mpsc::Receiver<Result<Record, CrawlError>>,
}

impl RecordStream {
    /// Receive the next crawl result.
    pub async fn next_record(&mut self) -> Option<Result<Record, CrawlError>> {
        self.rx.recv().await
    }
}

impl futures::Stream for RecordStream {
    type Item = Result<Record, CrawlError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// The crawl engine: drives scrolling discovery and parallel extraction.
pub struct FeedCrawler<D: FeedDriver> {
    driver: D,
    rules: Arc<SiteRules>,
    config: CrawlConfig,
    retry: RetryPolicy,
    obstructions: ObstructionHandler,
    seen_identities: HashSet<String>,
    seen_urls: HashSet<String>,
}

impl<D: FeedDriver + 'static> FeedCrawler<D> {
    /// Create a crawler over a driver, a site ruleset and a crawl config.
    #[must_use]
    pub fn new(driver: D, rules: SiteRules, config: CrawlConfig) -> Self {
        Self {
            driver,
            rules: Arc::new(rules),
            config,
            retry: RetryPolicy::default(),
            obstructions: ObstructionHandler::new(),
            seen_identities: HashSet::new(),
            seen_urls: HashSet::new(),
        }
    }

    /// Override the retry policy for remote-interaction calls.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start the crawl on its own task and return the output stream.
    #[must_use]
    pub fn spawn(self) -> RecordStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            self.run(tx).await;
        });
        RecordStream { rx }
    }

    /// The driving loop. Owns the browser exclusively for the whole run.
    async fn run(mut self, tx: mpsc::Sender<Result<Record, CrawlError>>) {
        if !self.restore_session().await {
            if self.config.feed.require_auth {
                let _ = tx.send(Err(CrawlError::SessionRequired)).await;
                return;
            }
            debug!("continuing unauthenticated");
        }

        let pool = ExtractionPool::new(
            self.config.limits.workers,
            Arc::clone(&self.rules),
            self.config.feed.fields.clone(),
        );
        let mut sink = ResultSink::new(tx.clone(), self.config.feed.target_count);

        let mut phase = Phase::Init;
        let mut iterations: u32 = 0;
        let mut stalled: u32 = 0;
        let mut last_rendered: usize = 0;

        info!(
            feed = %self.config.feed.url,
            target = self.config.feed.target_count,
            workers = self.config.limits.workers,
            "starting crawl"
        );

        loop {
            phase = match phase {
                Phase::Init => match self.mount_feed().await {
                    Ok(()) => Phase::Scrolling,
                    Err(e) => {
                        warn!(error = %e, "feed mount failed, aborting run");
                        let _ = tx.send(Err(e)).await;
                        Phase::Done
                    }
                },

                Phase::Scrolling => {
                    iterations += 1;
                    self.scroll_tick(last_rendered).await;
                    let dismissed = self.obstructions.sweep(&self.driver).await;
                    if dismissed > 0 {
                        debug!(dismissed, "overlays dismissed this iteration");
                    }
                    Phase::Harvesting
                }

                Phase::Harvesting => {
                    let rendered = self.harvest_tick(&pool, &mut sink, last_rendered).await;
                    if rendered > last_rendered {
                        stalled = 0;
                    } else {
                        stalled += 1;
                    }
                    last_rendered = rendered;

                    info!(
                        iteration = iterations,
                        rendered,
                        emitted = sink.emitted(),
                        outstanding = sink.outstanding(),
                        "harvest tick complete"
                    );

                    if sink.output_closed() {
                        debug!("consumer dropped the stream, stopping early");
                        Phase::Done
                    } else if sink.target_reached() {
                        info!(target = self.config.feed.target_count, "target count reached");
                        Phase::Draining
                    } else if stalled >= self.config.limits.max_stalled_iterations {
                        info!(stalled, "no rendered-element growth, feed exhausted");
                        Phase::Draining
                    } else if iterations >= self.config.limits.max_iterations {
                        info!(iterations, "iteration cap reached");
                        Phase::Draining
                    } else {
                        Phase::Scrolling
                    }
                }

                Phase::Draining => {
                    sink.drain_all(self.config.limits.drain_budget()).await;
                    Phase::Done
                }

                Phase::Done => break,
            };
        }

        info!(
            emitted = sink.emitted(),
            target = self.config.feed.target_count,
            iterations,
            "crawl finished"
        );
    }

    /// Restore a captured session, when one is configured.
    ///
    /// Returns `true` when no snapshot is configured (nothing to restore)
    /// or restoration succeeded. Under mandatory authentication the restored
    /// session is additionally probed for a logged-in marker.
    async fn restore_session(&self) -> bool {
        let Some(snapshot_path) = &self.config.feed.session_snapshot else {
            return true;
        };

        let manager =
            SessionManager::new(snapshot_path.clone(), self.rules.site.root_url.clone());
        if !manager.restore(&self.driver).await {
            warn!(
                snapshot = %snapshot_path.display(),
                "session restore failed"
            );
            return false;
        }

        if self.config.feed.require_auth {
            let authenticated = manager
                .probe(
                    &self.driver,
                    &self.retry,
                    &self.rules.feed.logged_in_marker,
                    self.config.limits.feed_mount_timeout(),
                )
                .await;
            if !authenticated {
                warn!("restored session did not pass the logged-in probe");
                return false;
            }
        }

        true
    }

    /// Navigate to the feed and wait for its container to mount.
    ///
    /// The one step whose failure is fatal for the run: without a mounted
    /// feed there is nothing to harvest.
    async fn mount_feed(&self) -> Result<(), CrawlError> {
        let url = self.config.feed.url.clone();

        self.retry
            .run("navigate to feed", || self.driver.navigate(&url))
            .await
            .map_err(|source| CrawlError::FeedUnavailable {
                url: url.clone(),
                source,
            })?;

        self.driver
            .wait_for(
                &self.rules.feed.container,
                self.config.limits.feed_mount_timeout(),
            )
            .await
            .map_err(|source| CrawlError::FeedUnavailable { url, source })?;

        debug!("feed container mounted");
        Ok(())
    }

    /// Issue one incremental scroll, then wait briefly for the rendered
    /// element count to grow. Growth and timeout are both acceptable
    /// outcomes.
    async fn scroll_tick(&self, last_rendered: usize) {
        if let Err(e) = self.driver.scroll_feed().await {
            debug!(error = %e, "scroll failed this iteration");
        }
        tokio::time::sleep(self.config.limits.scroll_pause()).await;

        let deadline = tokio::time::Instant::now() + self.config.limits.growth_wait();
        loop {
            match self.driver.rendered_count(&self.rules.feed.item).await {
                Ok(count) if count > last_rendered => break,
                Ok(_) => {}
                Err(e) => debug!(error = %e, "rendered count probe failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("no new elements appeared after scroll");
                break;
            }
            tokio::time::sleep(GROWTH_POLL_INTERVAL).await;
        }
    }

    /// Enumerate rendered candidates, submit the new qualifying ones and
    /// opportunistically drain completed extractions.
    ///
    /// Returns the rendered-element count for stall tracking.
    async fn harvest_tick(
        &mut self,
        pool: &ExtractionPool,
        sink: &mut ResultSink,
        last_rendered: usize,
    ) -> usize {
        let feed = &self.rules.feed;
        let probes = match self
            .driver
            .probe_elements(&feed.item, &feed.permalink, &feed.timestamp_probe)
            .await
        {
            Ok(probes) => probes,
            Err(e) => {
                warn!(error = %e, "candidate enumeration failed this tick");
                sink.drain_ready().await;
                return last_rendered;
            }
        };
        let rendered = probes.len();

        for probe in probes {
            if sink.target_reached() {
                break;
            }

            let resolution = resolve(probe.permalink.as_deref(), probe.has_timestamp);
            if !resolution.is_candidate {
                continue;
            }
            let Some(identity) = resolution.identity else {
                debug!("candidate without derivable identity, skipping");
                continue;
            };

            if self.seen_identities.contains(identity.as_str()) {
                continue;
            }
            if resolution
                .url
                .as_ref()
                .is_some_and(|u| self.seen_urls.contains(u))
            {
                continue;
            }

            // Best-effort: truncated posts hide their tail behind a click.
            match self
                .driver
                .expand_element(probe.handle, &feed.expand_button)
                .await
            {
                Ok(true) => debug!(identity = %identity, "expanded truncated text"),
                Ok(false) => {}
                Err(e) => debug!(identity = %identity, error = %e, "expand probe failed"),
            }

            let markup = match self.driver.capture_markup(probe.handle).await {
                Ok(markup) if !markup.is_empty() => markup,
                Ok(_) => {
                    debug!(identity = %identity, "empty markup snapshot, skipping");
                    continue;
                }
                Err(e) => {
                    debug!(identity = %identity, error = %e, "markup capture failed, skipping");
                    continue;
                }
            };

            // Mark seen before submission: a candidate re-rendered on the
            // next tick must not be submitted twice. The cost is losing one
            // record if this extraction later fails; accepted.
            self.seen_identities.insert(identity.as_str().to_string());
            if let Some(url) = &resolution.url {
                self.seen_urls.insert(url.clone());
            }

            sink.push(pool.submit(Candidate {
                identity,
                url: resolution.url,
                markup,
            }));
        }

        sink.drain_ready().await;
        rendered
    }
}
