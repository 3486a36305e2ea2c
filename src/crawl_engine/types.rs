//! Core types for crawl operations.

use thiserror::Error;

use crate::pipeline::RequestEnvelope;

/// Error type for crawl operations.
///
/// Per-page failures never surface here - they are recorded on the page's
/// [`CrawlRecord`]. This covers problems that prevent the crawl from running
/// at all.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("crawl error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} preserves the full context chain
        Self::Other(format!("{err:#}"))
    }
}

/// One URL waiting in the frontier queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPage {
    pub url: String,
    /// URL of the page this link was discovered on. `None` for the seed.
    pub parent: Option<String>,
    /// Crawl depth; the seed is depth 1, its children depth 2.
    pub depth: u32,
}

/// One page visited during a crawl.
///
/// Wraps the terminal request envelope and adds traversal context. Outbound
/// links are extracted once, right after the fetch, and stored here - they
/// are never re-derived from the body.
#[derive(Debug, Clone)]
pub struct CrawlRecord {
    pub envelope: RequestEnvelope<String>,
    pub depth: u32,
    pub parent: Option<String>,
    /// Canonical same-domain links discovered on this page.
    pub links: Vec<String>,
}

impl CrawlRecord {
    #[must_use]
    pub fn url(&self) -> &str {
        &self.envelope.url
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.envelope.is_success()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
