//! Response cache layer, keyed by request URL.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use log::debug;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::envelope::{RequestEnvelope, ResponseBody};
use super::HttpSend;

struct CacheEntry<T: ResponseBody> {
    stored_at: Instant,
    ttl: Duration,
    envelope: RequestEnvelope<T>,
}

impl<T: ResponseBody> CacheEntry<T> {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() <= self.ttl
    }
}

/// Outermost pipeline layer: returns stored envelopes for repeated URLs.
///
/// A hit returns the cached envelope unmodified, original id and error list
/// included. A miss invokes the wrapped chain, stamps the completion time and
/// stores the result for the envelope's cache duration; a duration of zero
/// disables storage, so such requests always miss.
pub struct CacheLayer<T: ResponseBody, S> {
    inner: S,
    entries: DashMap<String, CacheEntry<T>>,
}

impl<T: ResponseBody, S> CacheLayer<T, S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
        }
    }

    /// Number of live entries, for tests and diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl<T, S> HttpSend<T> for CacheLayer<T, S>
where
    T: ResponseBody,
    S: HttpSend<T>,
{
    async fn send(
        &self,
        envelope: RequestEnvelope<T>,
        cancel: &CancellationToken,
    ) -> RequestEnvelope<T> {
        let key = envelope.url.clone();

        let hit = self
            .entries
            .get(&key)
            .and_then(|entry| entry.is_fresh().then(|| entry.envelope.clone()));
        if let Some(cached) = hit {
            debug!("cache hit for {key}");
            return cached;
        }
        self.entries.remove_if(&key, |_, entry| !entry.is_fresh());

        let mut envelope = self.inner.send(envelope, cancel).await;
        if envelope.completed_at.is_none() {
            envelope.completed_at = Some(Utc::now());
        }

        if envelope.cache_minutes > 0 {
            self.entries.insert(
                key.clone(),
                CacheEntry {
                    stored_at: Instant::now(),
                    ttl: Duration::from_secs(envelope.cache_minutes * 60),
                    envelope: envelope.clone(),
                },
            );
        }
        debug!("cache miss for {key}");
        envelope
    }
}
