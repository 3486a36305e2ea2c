//! Breadth-first crawl engine.
//!
//! Drives the frontier with a bounded number of concurrent fetches through
//! the resilience pipeline. The seed is depth 1 and every discovered link is
//! enqueued at its parent's depth plus one; links that would exceed the
//! configured maximum depth are not enqueued at all.
//!
//! A failed fetch still produces a record - the page's status code and error
//! list carry the detail - so the crawl always completes and returns whatever
//! was collected.

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::frontier::Frontier;
use super::progress::{NoOpProgress, ProgressReporter};
use super::types::{CrawlError, CrawlRecord, PendingPage};
use crate::config::CrawlConfig;
use crate::content_saver::SaveWorker;
use crate::links;
use crate::pipeline::{build_pipeline, RequestEnvelope, SharedSend};

pub struct Crawler {
    config: CrawlConfig,
    sender: SharedSend<String>,
    progress: Arc<dyn ProgressReporter>,
}

impl Crawler {
    /// Build a crawler with its own pipeline instance.
    ///
    /// The pipeline - and with it the circuit breaker - is shared by every
    /// concurrent fetch of this crawler.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Config`] when the HTTP client cannot be built.
    pub fn new(config: CrawlConfig) -> Result<Self, CrawlError> {
        let client = config
            .build_http_client()
            .map_err(|e| CrawlError::Config(e.to_string()))?;
        let sender = build_pipeline::<String>(client, &config.pipeline_options());
        Ok(Self {
            config,
            sender,
            progress: Arc::new(NoOpProgress),
        })
    }

    /// Replace the progress sink. Defaults to [`NoOpProgress`].
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the crawl to completion and return the insertion-ordered records.
    ///
    /// Cancellation stops new dispatches; in-flight fetches finish naturally
    /// and the records collected so far are returned.
    pub async fn crawl(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<CrawlRecord>, CrawlError> {
        let seed = normalize_seed(self.config.start_url());
        let max_pages = self.config.max_pages();
        let max_depth = self.config.max_depth();
        let max_concurrent = self.config.max_concurrent();

        // Frontier state is created per invocation and owned here.
        let frontier = Arc::new(Mutex::new(Frontier::new(seed.clone())));
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let saver = self
            .config
            .storage_dir()
            .map(|dir| SaveWorker::spawn(dir.clone()));

        let mut active = FuturesUnordered::new();
        let mut in_flight = 0usize;

        self.progress.report_started(&seed);
        info!("starting crawl of {seed} (max {max_pages} pages, depth {max_depth})");

        loop {
            // Fill up to the concurrency limit.
            while active.len() < max_concurrent && !cancel.is_cancelled() {
                let page = {
                    let mut frontier = frontier.lock().await;
                    // Claimed pages (recorded + in flight) count against the
                    // budget so results can never exceed it.
                    if frontier.results_len() + in_flight >= max_pages {
                        None
                    } else {
                        frontier.next_page()
                    }
                };
                let Some(page) = page else { break };

                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        error!("crawl semaphore closed unexpectedly");
                        break;
                    }
                };
                in_flight += 1;

                let sender = Arc::clone(&self.sender);
                let cancel = cancel.clone();
                let cache_minutes = self.config.default_cache_minutes();
                active.push(tokio::spawn(async move {
                    let _permit = permit;
                    fetch_page(sender, page, cache_minutes, &cancel).await
                }));
            }

            let Some(joined) = active.next().await else {
                break;
            };
            in_flight -= 1;

            match joined {
                Ok(record) => {
                    let child_depth = record.depth + 1;
                    let (crawled, queued) = {
                        let mut frontier = frontier.lock().await;
                        let recorded = frontier.record(record.clone());
                        if recorded && child_depth <= max_depth && !cancel.is_cancelled() {
                            let added =
                                frontier.enqueue_links(record.url(), &record.links, child_depth);
                            debug!(
                                "{}: {} links found, {} newly queued",
                                record.url(),
                                record.link_count(),
                                added
                            );
                        }
                        (frontier.results_len(), frontier.pending_len())
                    };

                    if let Some(saver) = &saver {
                        if record.is_success() {
                            saver.submit(record.clone()).await;
                        }
                    }
                    self.progress
                        .report_page(record.url(), crawled, queued, record.depth);
                }
                Err(e) => {
                    error!("crawl task panicked: {e}");
                    self.progress.report_error(&format!("crawl task failed: {e}"));
                }
            }
        }

        // Wait for outstanding page writes before reporting completion.
        if let Some(saver) = saver {
            saver.finish().await;
        }

        let frontier = Arc::try_unwrap(frontier)
            .map_err(|_| CrawlError::Other("frontier still shared at crawl end".to_string()))?
            .into_inner();
        let results = frontier.into_results();

        self.progress.report_completed(results.len());
        info!("crawl of {seed} complete: {} pages", results.len());
        Ok(results)
    }
}

/// Fetch one page through the pipeline and build its record.
///
/// Outbound links are extracted exactly once, here, and stored on the
/// record. Failed fetches come back with an empty link list.
async fn fetch_page(
    sender: SharedSend<String>,
    page: PendingPage,
    cache_minutes: u64,
    cancel: &CancellationToken,
) -> CrawlRecord {
    info!("crawling [depth {}]: {}", page.depth, page.url);

    let envelope = RequestEnvelope::<String>::get(&page.url).with_cache_minutes(cache_minutes);
    let envelope = sender.send(envelope, cancel).await;

    let links = if envelope.is_success() {
        envelope
            .body
            .as_deref()
            .map(|body| links::extract(body, &page.url))
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    CrawlRecord {
        envelope,
        depth: page.depth,
        parent: page.parent,
        links,
    }
}

/// Canonicalize the seed the same way discovered links are canonicalized,
/// so the start page cannot be re-discovered under a different spelling.
fn normalize_seed(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|base| links::normalize(url, &base))
        .unwrap_or_else(|| url.trim_end_matches('/').to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_normalization_matches_link_canonical_form() {
        assert_eq!(
            normalize_seed("https://Example.com/"),
            "https://example.com"
        );
        assert_eq!(
            normalize_seed("https://example.com/Docs/?x=1#top"),
            "https://example.com/docs"
        );
    }
}
