//! Configuration for crawls and the pipeline beneath them.
//!
//! Provides `CrawlConfig` and its type-safe builder with validation and
//! sensible defaults.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::{CrawlConfigBuilder, WithStartUrl};
pub use types::CrawlConfig;
