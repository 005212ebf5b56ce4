//! Completion-order aggregation of extraction results.
//!
//! The sink owns the set of outstanding extraction futures and the output
//! channel. Records are emitted as their extractions complete, not in
//! discovery order, and emission stops once the target count is reached.
//! Per-tick draining is opportunistic (non-blocking); the final drain runs
//! under one overall budget, after which unresolved tasks are abandoned in
//! place.

use crate::error::CrawlError;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use gleaner_core::Record;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// Aggregates completed extraction futures onto the output channel.
pub struct ResultSink {
    pending: FuturesUnordered<JoinHandle<Option<Record>>>,
    tx: mpsc::Sender<Result<Record, CrawlError>>,
    target: usize,
    emitted: usize,
    output_closed: bool,
}

impl ResultSink {
    /// Create a sink emitting onto `tx` until `target` records are out.
    #[must_use]
    pub fn new(tx: mpsc::Sender<Result<Record, CrawlError>>, target: usize) -> Self {
        Self {
            pending: FuturesUnordered::new(),
            tx,
            target,
            emitted: 0,
            output_closed: false,
        }
    }

    /// Track one submitted extraction.
    pub fn push(&mut self, handle: JoinHandle<Option<Record>>) {
        self.pending.push(handle);
    }

    /// Number of records emitted so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Number of extractions still outstanding.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Whether the target count has been reached.
    #[must_use]
    pub fn target_reached(&self) -> bool {
        self.emitted >= self.target
    }

    /// Whether the consumer dropped the stream.
    #[must_use]
    pub fn output_closed(&self) -> bool {
        self.output_closed
    }

    /// Forward every already-completed extraction without blocking.
    ///
    /// This is the per-tick drain: it bounds outstanding-future growth
    /// without ever stalling the scroll loop on a slow worker.
    pub async fn drain_ready(&mut self) {
        loop {
            match self.pending.next().now_or_never() {
                Some(Some(result)) => self.forward(result).await,
                // Pending stream is either empty or has nothing ready.
                Some(None) | None => break,
            }
        }
    }

    /// Await outstanding extractions under one overall budget.
    ///
    /// Resolved results are still emitted; tasks unresolved when the budget
    /// elapses are abandoned in place (never force-cancelled) and reported
    /// as an under-target count.
    pub async fn drain_all(&mut self, budget: Duration) {
        let deadline = tokio::time::Instant::now() + budget;

        while !self.pending.is_empty() && !self.target_reached() && !self.output_closed {
            match tokio::time::timeout_at(deadline, self.pending.next()).await {
                Ok(Some(result)) => self.forward(result).await,
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        abandoned = self.pending.len(),
                        emitted = self.emitted,
                        target = self.target,
                        "drain budget elapsed, abandoning unresolved extractions"
                    );
                    return;
                }
            }
        }

        if self.emitted < self.target {
            info!(
                emitted = self.emitted,
                target = self.target,
                "drain complete under target"
            );
        }
    }

    /// Forward one completed extraction to the output channel.
    async fn forward(&mut self, result: Result<Option<Record>, JoinError>) {
        match result {
            Ok(Some(record)) => {
                if self.target_reached() || self.output_closed {
                    return;
                }
                debug!(identity = %record.identity, "record extracted");
                if self.tx.send(Ok(record)).await.is_err() {
                    self.output_closed = true;
                    return;
                }
                self.emitted += 1;
            }
            Ok(None) => debug!("extraction yielded no substantive record"),
            Err(e) => warn!(error = %e, "extraction task failed"),
        }
    }
}
