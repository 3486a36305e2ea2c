//! Type-safe builder for `CrawlConfig` using the typestate pattern.
//!
//! The start URL is the only required field; the type parameter tracks
//! whether it has been supplied, so `build()` only exists on a builder that
//! can actually produce a valid configuration.

use anyhow::{anyhow, Result};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use super::types::CrawlConfig;

pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_MAX_DEPTH: u32 = 3;
pub const DEFAULT_MAX_CONCURRENT: usize = 4;
pub const DEFAULT_USER_AGENT: &str = concat!("sitecrawl/", env!("CARGO_PKG_VERSION"));

// Type states for the builder
pub struct WithStartUrl;

pub struct CrawlConfigBuilder<State = ()> {
    pub(crate) start_url: Option<String>,
    pub(crate) storage_dir: Option<PathBuf>,
    pub(crate) max_pages: usize,
    pub(crate) max_depth: u32,
    pub(crate) max_concurrent: usize,
    pub(crate) max_retry_attempts: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) circuit_breaker_threshold: u32,
    pub(crate) circuit_breaker_duration: Duration,
    pub(crate) default_cache_minutes: u64,
    pub(crate) request_timeout: Duration,
    pub(crate) user_agent: String,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for CrawlConfigBuilder<()> {
    fn default() -> Self {
        Self {
            start_url: None,
            storage_dir: None,
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
            circuit_breaker_threshold: 3,
            circuit_breaker_duration: Duration::from_secs(30),
            default_cache_minutes: 0,
            request_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfigBuilder<()> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the seed URL, unlocking `build()`.
    #[must_use]
    pub fn start_url(self, url: impl Into<String>) -> CrawlConfigBuilder<WithStartUrl> {
        CrawlConfigBuilder {
            start_url: Some(url.into()),
            storage_dir: self.storage_dir,
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            max_concurrent: self.max_concurrent,
            max_retry_attempts: self.max_retry_attempts,
            retry_delay: self.retry_delay,
            circuit_breaker_threshold: self.circuit_breaker_threshold,
            circuit_breaker_duration: self.circuit_breaker_duration,
            default_cache_minutes: self.default_cache_minutes,
            request_timeout: self.request_timeout,
            user_agent: self.user_agent,
            _phantom: PhantomData,
        }
    }
}

impl<State> CrawlConfigBuilder<State> {
    #[must_use]
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    #[must_use]
    pub fn max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn circuit_breaker_threshold(mut self, threshold: u32) -> Self {
        self.circuit_breaker_threshold = threshold.max(1);
        self
    }

    #[must_use]
    pub fn circuit_breaker_duration(mut self, duration: Duration) -> Self {
        self.circuit_breaker_duration = duration;
        self
    }

    #[must_use]
    pub fn default_cache_minutes(mut self, minutes: u64) -> Self {
        self.default_cache_minutes = minutes;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl CrawlConfigBuilder<WithStartUrl> {
    /// Validate and produce the final configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the start URL is not an absolute http(s) URL
    /// with a host, or `max_pages` is zero.
    pub fn build(self) -> Result<CrawlConfig> {
        let start_url = self
            .start_url
            .ok_or_else(|| anyhow!("start URL missing"))?;

        let parsed = Url::parse(&start_url)
            .map_err(|e| anyhow!("invalid start URL '{start_url}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "start URL '{start_url}' must use http or https, got '{}'",
                parsed.scheme()
            ));
        }
        if parsed.host_str().is_none() {
            return Err(anyhow!("start URL '{start_url}' has no host"));
        }
        if self.max_pages == 0 {
            return Err(anyhow!("max_pages must be at least 1"));
        }

        Ok(CrawlConfig {
            start_url,
            storage_dir: self.storage_dir,
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            max_concurrent: self.max_concurrent,
            max_retry_attempts: self.max_retry_attempts,
            retry_delay: self.retry_delay,
            circuit_breaker_threshold: self.circuit_breaker_threshold,
            circuit_breaker_duration: self.circuit_breaker_duration,
            default_cache_minutes: self.default_cache_minutes,
            request_timeout: self.request_timeout,
            user_agent: self.user_agent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let config = CrawlConfigBuilder::new()
            .start_url("https://example.com")
            .build()
            .expect("valid config builds");
        assert_eq!(config.start_url, "https://example.com");
        assert_eq!(config.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn rejects_non_http_start_url() {
        assert!(CrawlConfigBuilder::new()
            .start_url("ftp://example.com")
            .build()
            .is_err());
        assert!(CrawlConfigBuilder::new()
            .start_url("not a url")
            .build()
            .is_err());
    }

    #[test]
    fn rejects_zero_page_budget() {
        assert!(CrawlConfigBuilder::new()
            .start_url("https://example.com")
            .max_pages(0)
            .build()
            .is_err());
    }

    #[test]
    fn concurrency_floor_is_one() {
        let config = CrawlConfigBuilder::new()
            .start_url("https://example.com")
            .max_concurrent(0)
            .build()
            .expect("valid config builds");
        assert_eq!(config.max_concurrent, 1);
    }
}
