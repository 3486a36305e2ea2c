//! Progress reporting abstraction for crawl operations.
//!
//! The engine emits plain-text-friendly progress at key lifecycle points;
//! implementations can forward updates to channels, log them or update a UI.

use log::info;

/// Trait for reporting crawl progress at key lifecycle events.
pub trait ProgressReporter: Send + Sync {
    /// The crawl is starting from `start_url`.
    fn report_started(&self, start_url: &str);

    /// A page finished (successfully or not) and was recorded.
    fn report_page(&self, url: &str, crawled: usize, queued: usize, depth: u32);

    /// The crawl finished with `crawled` recorded pages.
    fn report_completed(&self, crawled: usize);

    /// A non-page-level problem occurred (persistence, task failure).
    fn report_error(&self, error: &str);
}

/// Progress reporter that does nothing.
///
/// All methods are no-ops and will be inlined away by the compiler.
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_started(&self, _start_url: &str) {}

    #[inline(always)]
    fn report_page(&self, _url: &str, _crawled: usize, _queued: usize, _depth: u32) {}

    #[inline(always)]
    fn report_completed(&self, _crawled: usize) {}

    #[inline(always)]
    fn report_error(&self, _error: &str) {}
}

/// Progress reporter that writes through the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report_started(&self, start_url: &str) {
        info!("crawl started: {start_url}");
    }

    fn report_page(&self, url: &str, crawled: usize, queued: usize, depth: u32) {
        info!("crawled:{crawled:05} queue:{queued:05} depth:{depth} {url}");
    }

    fn report_completed(&self, crawled: usize) {
        info!("crawl complete: {crawled} pages");
    }

    fn report_error(&self, error: &str) {
        log::warn!("crawl progress error: {error}");
    }
}
