//! Index coordinator (C6): fans a page write/delete out to the frontmatter
//! and full-text index queues.
//!
//! Grounded on `crates/serve/src/indexer.rs`'s two-stage
//! front-matter-then-body dispatch (`upsert_front_matter_db`,
//! `upsert_body_db`), generalized into job handlers registered against
//! `wiki-jobs` queues instead of being called inline. The two queues drain
//! independently and are not synchronized (SPEC_FULL.md §D.1): a caller
//! that needs both done waits on each in turn.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::error;
use wiki_core::Identifier;
use wiki_index_fm::FmIndex;
use wiki_index_text::TextIndex;
use wiki_jobs::{JobSystem, WaitOutcome};
use wiki_store::PageStore;

use std::sync::Arc;

use crate::error::Error;

pub const FM_QUEUE: &str = "index-fm";
pub const TEXT_QUEUE: &str = "index-text";

pub struct Coordinator {
    store: Arc<dyn PageStore>,
    fm_index: Arc<FmIndex>,
    text_index: Arc<TextIndex>,
    jobs: Arc<JobSystem>,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn PageStore>,
        fm_index: Arc<FmIndex>,
        text_index: Arc<TextIndex>,
        jobs: Arc<JobSystem>,
        queue_channel_capacity: usize,
    ) -> Result<Self, Error> {
        jobs.register_queue(FM_QUEUE, queue_channel_capacity)?;
        jobs.register_queue(TEXT_QUEUE, queue_channel_capacity)?;
        Ok(Self { store, fm_index, text_index, jobs })
    }

    /// Enqueue re-indexing work for `id` on both queues. Each job re-reads
    /// the page from the store when it actually runs (not at enqueue time),
    /// so a burst of writes to the same identifier converges on whatever
    /// the store holds when the job executes rather than a stale snapshot.
    pub fn enqueue_index_job(&self, id: Identifier) -> Result<(), Error> {
        self.enqueue_fm_job(id.clone())?;
        self.enqueue_text_job(id)?;
        Ok(())
    }

    pub fn bulk_enqueue(&self, ids: impl IntoIterator<Item = Identifier>) -> Result<(), Error> {
        for id in ids {
            self.enqueue_index_job(id)?;
        }
        Ok(())
    }

    fn enqueue_fm_job(&self, id: Identifier) -> Result<(), Error> {
        let store = self.store.clone();
        let fm_index = self.fm_index.clone();
        let job_id = id.clone();
        self.jobs.enqueue(
            FM_QUEUE,
            Box::new(move || match store.read(&job_id) {
                Ok(page) => {
                    if let Err(e) = fm_index.upsert(job_id.clone(), page.frontmatter) {
                        error!(identifier = %job_id, error = %e, "frontmatter index upsert failed");
                    }
                }
                Err(wiki_store::Error::NotFound(_)) => fm_index.remove(&job_id),
                Err(e) => error!(identifier = %job_id, error = %e, "store read failed during frontmatter indexing"),
            }),
        )?;
        let _ = id;
        Ok(())
    }

    fn enqueue_text_job(&self, id: Identifier) -> Result<(), Error> {
        let store = self.store.clone();
        let text_index = self.text_index.clone();
        let job_id = id.clone();
        self.jobs.enqueue(
            TEXT_QUEUE,
            Box::new(move || match store.read(&job_id) {
                Ok(page) => {
                    let title = page
                        .frontmatter
                        .as_map()
                        .and_then(|m| m.get("title"))
                        .and_then(|v| v.as_str())
                        .unwrap_or_else(|| job_id.as_str())
                        .to_string();
                    if let Err(e) = text_index.upsert(&job_id, &title, &page.body) {
                        error!(identifier = %job_id, error = %e, "full-text index upsert failed");
                    }
                }
                Err(wiki_store::Error::NotFound(_)) => {
                    if let Err(e) = text_index.remove(&job_id) {
                        error!(identifier = %job_id, error = %e, "full-text index remove failed");
                    }
                }
                Err(e) => error!(identifier = %job_id, error = %e, "store read failed during full-text indexing"),
            }),
        )?;
        let _ = id;
        Ok(())
    }

    /// Wait for both queues to drain, up to `timeout` each. Returns the
    /// frontmatter queue's outcome and the full-text queue's outcome
    /// separately, since completion is never synchronized between them.
    pub fn wait_for_completion_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<(WaitOutcome, WaitOutcome), Error> {
        let cancel = CancellationToken::new();
        let fm = self.jobs.wait_for_completion(FM_QUEUE, timeout, &cancel)?;
        let text = self.jobs.wait_for_completion(TEXT_QUEUE, timeout, &cancel)?;
        Ok((fm, text))
    }
}
