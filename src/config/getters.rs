//! Read access to `CrawlConfig` fields plus derived values.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use super::types::CrawlConfig;
use crate::pipeline::PipelineOptions;

impl CrawlConfig {
    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    #[must_use]
    pub fn storage_dir(&self) -> Option<&PathBuf> {
        self.storage_dir.as_ref()
    }

    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    #[must_use]
    pub fn default_cache_minutes(&self) -> u64 {
        self.default_cache_minutes
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The subset of settings the resilience pipeline consumes.
    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_retry_attempts: self.max_retry_attempts,
            retry_delay: self.retry_delay,
            circuit_breaker_threshold: self.circuit_breaker_threshold,
            circuit_breaker_duration: self.circuit_breaker_duration,
        }
    }

    /// Build the HTTP client the base sender will use.
    ///
    /// # Errors
    ///
    /// Returns an error when the TLS backend cannot be initialized.
    pub fn build_http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.request_timeout)
            .build()
            .context("failed to build HTTP client")
    }
}
