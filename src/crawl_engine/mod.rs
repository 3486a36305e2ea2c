//! Breadth-first site crawler built on the resilience pipeline.

mod engine;
mod frontier;
mod progress;
mod types;

pub use engine::Crawler;
pub use frontier::Frontier;
pub use progress::{LogProgress, NoOpProgress, ProgressReporter};
pub use types::{CrawlError, CrawlRecord, PendingPage};
