//! Bounded pool of extraction workers.
//!
//! Extraction parses a captured markup snapshot and never touches the
//! browser, which is what makes true parallelism safe here. The pool bounds
//! concurrency with a semaphore; submission itself never blocks, so the
//! driving loop keeps scrolling while workers churn.

use chrono::Utc;
use gleaner_core::{FieldKind, PostIdentity, Record};
use gleaner_extract::extract_record;
use gleaner_ruleset::SiteRules;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

/// One discovered candidate, ready for extraction.
///
/// Ephemeral: created during a harvest tick and consumed by a worker.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Per-run identity, guaranteed present before submission
    pub identity: PostIdentity,
    /// Canonical permalink, when one was found
    pub url: Option<String>,
    /// Captured outer-HTML snapshot of the rendered element
    pub markup: String,
}

/// Fixed-size pool of stateless extraction workers.
pub struct ExtractionPool {
    permits: Arc<Semaphore>,
    rules: Arc<SiteRules>,
    fields: Option<Arc<Vec<FieldKind>>>,
}

impl ExtractionPool {
    /// Create a pool with the given worker count.
    #[must_use]
    pub fn new(workers: usize, rules: Arc<SiteRules>, fields: Option<Vec<FieldKind>>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            rules,
            fields: fields.map(Arc::new),
        }
    }

    /// Submit a candidate for extraction.
    ///
    /// Returns immediately with the task handle; the task waits for a
    /// worker slot, parses the snapshot and resolves to the extracted
    /// record, or `None` when the candidate lacked substantive content.
    #[must_use]
    pub fn submit(&self, candidate: Candidate) -> JoinHandle<Option<Record>> {
        let permits = Arc::clone(&self.permits);
        let rules = Arc::clone(&self.rules);
        let fields = self.fields.clone();

        tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.ok()?;

            debug!(identity = %candidate.identity, bytes = candidate.markup.len(), "extracting candidate");
            extract_record(
                &candidate.markup,
                candidate.url,
                candidate.identity,
                &rules,
                fields.as_ref().map(|list| list.as_slice()),
                Utc::now(),
            )
        })
    }
}
