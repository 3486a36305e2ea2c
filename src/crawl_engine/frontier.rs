//! Frontier state for one crawl invocation.
//!
//! Holds the visited set, the pending FIFO queue and the insertion-ordered
//! results together so the engine can mutate them as a unit inside a single
//! critical section. One `Frontier` value exists per crawl invocation and is
//! owned by the engine - never shared between crawls, never static.

use std::collections::{HashSet, VecDeque};

use super::types::{CrawlRecord, PendingPage};

pub struct Frontier {
    /// URLs claimed for fetching: dispatched or currently queued.
    visited: HashSet<String>,
    /// URLs awaiting dispatch, FIFO.
    pending: VecDeque<PendingPage>,
    /// Mirror of the URLs in `pending` for O(1) duplicate checks.
    queued: HashSet<String>,
    /// Authoritative output, insertion-ordered.
    results: Vec<CrawlRecord>,
    result_keys: HashSet<String>,
}

impl Frontier {
    /// Fresh frontier seeded with the start URL at depth 1.
    #[must_use]
    pub fn new(start_url: String) -> Self {
        let mut frontier = Self {
            visited: HashSet::new(),
            pending: VecDeque::new(),
            queued: HashSet::new(),
            results: Vec::new(),
            result_keys: HashSet::new(),
        };
        frontier.queued.insert(start_url.clone());
        frontier.pending.push_back(PendingPage {
            url: start_url,
            parent: None,
            depth: 1,
        });
        frontier
    }

    /// Pop the next page to fetch, claiming its URL in the visited set.
    pub fn next_page(&mut self) -> Option<PendingPage> {
        while let Some(page) = self.pending.pop_front() {
            self.queued.remove(&page.url);
            // Claim the URL; a second queue entry for it is skipped here.
            if self.visited.insert(page.url.clone()) {
                return Some(page);
            }
        }
        None
    }

    /// Record a completed page. Returns false if the URL was already
    /// recorded, which leaves the results untouched.
    pub fn record(&mut self, record: CrawlRecord) -> bool {
        if !self.result_keys.insert(record.url().to_string()) {
            return false;
        }
        self.results.push(record);
        true
    }

    /// Enqueue the not-yet-seen links of a recorded page at `depth`.
    ///
    /// A candidate already present in the visited set, the results or the
    /// current queue is skipped, so a URL is enqueued at most once per
    /// crawl. Returns how many links were actually added.
    pub fn enqueue_links(&mut self, parent_url: &str, links: &[String], depth: u32) -> usize {
        let mut added = 0;
        for link in links {
            if self.visited.contains(link)
                || self.result_keys.contains(link)
                || self.queued.contains(link)
            {
                continue;
            }
            self.queued.insert(link.clone());
            self.pending.push_back(PendingPage {
                url: link.clone(),
                parent: Some(parent_url.to_string()),
                depth,
            });
            added += 1;
        }
        added
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn results_len(&self) -> usize {
        self.results.len()
    }

    /// Consume the frontier, yielding the insertion-ordered results.
    #[must_use]
    pub fn into_results(self) -> Vec<CrawlRecord> {
        self.results
    }
}
