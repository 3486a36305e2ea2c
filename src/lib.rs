//! # sitecrawl
//!
//! A same-domain site crawler built around a layered HTTP resilience
//! pipeline. Every request flows through response caching, telemetry,
//! retry with a circuit breaker, and finally the HTTP client itself;
//! each layer wraps the next and none of them can fail the call, so a
//! request always comes back as a result envelope describing what
//! happened.
//!
//! On top of the pipeline sit a bounded concurrent batch runner and a
//! breadth-first crawl engine with optional page persistence and CSV
//! export.
//!
//! ## Quick start
//!
//! ```no_run
//! use sitecrawl::config::CrawlConfigBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CrawlConfigBuilder::new()
//!         .start_url("https://example.com")
//!         .max_pages(50)
//!         .build()?;
//!     let results = sitecrawl::crawl(config).await?;
//!     println!("crawled {} pages", results.len());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod content_saver;
pub mod crawl_engine;
pub mod export;
pub mod links;
pub mod pipeline;

pub use config::{CrawlConfig, CrawlConfigBuilder};
pub use crawl_engine::{CrawlError, CrawlRecord, Crawler};

use tokio_util::sync::CancellationToken;

/// Crawl a site to completion with default (no-op) progress reporting.
///
/// Convenience wrapper over [`Crawler`]; use the struct directly for
/// cancellation or progress callbacks.
pub async fn crawl(config: CrawlConfig) -> Result<Vec<CrawlRecord>, CrawlError> {
    let crawler = Crawler::new(config)?;
    crawler.crawl(&CancellationToken::new()).await
}
