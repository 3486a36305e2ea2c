//! Core configuration types for crawl and pipeline behavior.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a crawl and the pipeline underneath it.
///
/// Built through [`crate::config::CrawlConfigBuilder`]; fields are crate
/// private to keep validation in one place, read access goes through the
/// getters module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Seed URL. Validated as absolute http(s) in the builder.
    pub(crate) start_url: String,

    /// Directory for saved pages. `None` disables persistence entirely.
    pub(crate) storage_dir: Option<PathBuf>,

    /// Upper bound on entries in the crawl results, failed fetches included.
    pub(crate) max_pages: usize,

    /// Maximum crawl depth; the seed is depth 1.
    pub(crate) max_depth: u32,

    /// Maximum simultaneous in-flight fetches during traversal.
    pub(crate) max_concurrent: usize,

    /// Extra attempts after a connection failure, per request.
    pub(crate) max_retry_attempts: u32,

    /// Fixed delay between retry attempts.
    pub(crate) retry_delay: Duration,

    /// Consecutive failures before the circuit opens.
    pub(crate) circuit_breaker_threshold: u32,

    /// How long the circuit stays open before a probe is allowed.
    pub(crate) circuit_breaker_duration: Duration,

    /// Cache duration applied to envelopes the crawler creates. Zero
    /// disables response caching - the frontier already guarantees every
    /// page is fetched at most once per crawl.
    pub(crate) default_cache_minutes: u64,

    /// Per-call HTTP client timeout.
    pub(crate) request_timeout: Duration,

    pub(crate) user_agent: String,
}
