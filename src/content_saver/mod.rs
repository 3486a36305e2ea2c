//! Background persistence of crawled pages.
//!
//! Saving is decoupled from fetching: the engine submits successful records
//! to a single worker task over a channel, and the worker writes them to disk
//! one at a time. A write failure is logged and the crawl carries on.

mod html_saver;

pub use html_saver::{rewrite_links_absolute, safe_file_name};

use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::crawl_engine::CrawlRecord;

const SAVE_QUEUE_CAPACITY: usize = 64;

/// Handle to the background save task.
pub struct SaveWorker {
    tx: mpsc::Sender<CrawlRecord>,
    handle: JoinHandle<()>,
}

impl SaveWorker {
    /// Spawn the worker writing into `output_dir`.
    #[must_use]
    pub fn spawn(output_dir: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::channel::<CrawlRecord>(SAVE_QUEUE_CAPACITY);
        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = save_page(&record, &output_dir).await {
                    warn!("failed to save {}: {e:#}", record.url());
                }
            }
        });
        Self { tx, handle }
    }

    /// Queue a record for saving. Dropped silently if the worker has exited.
    pub async fn submit(&self, record: CrawlRecord) {
        if self.tx.send(record).await.is_err() {
            warn!("save worker is gone, page dropped");
        }
    }

    /// Close the queue and wait for every pending write to finish.
    pub async fn finish(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            warn!("save worker task failed: {e}");
        }
    }
}

/// Write one crawled page to `output_dir` under its derived file name.
///
/// Relative links are rewritten to absolute first; if rewriting fails the
/// original body is written unchanged rather than losing the page.
pub async fn save_page(record: &CrawlRecord, output_dir: &Path) -> anyhow::Result<()> {
    let Some(body) = record.envelope.body.as_deref() else {
        debug!("{} has no body, nothing to save", record.url());
        return Ok(());
    };
    if body.is_empty() {
        debug!("{} has an empty body, nothing to save", record.url());
        return Ok(());
    }

    let content = match rewrite_links_absolute(body, record.url()) {
        Ok(rewritten) => rewritten,
        Err(e) => {
            warn!("link rewrite failed for {}: {e:#}", record.url());
            body.to_string()
        }
    };

    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(safe_file_name(record.url()));
    tokio::fs::write(&path, content).await?;
    debug!("saved {} -> {}", record.url(), path.display());
    Ok(())
}
