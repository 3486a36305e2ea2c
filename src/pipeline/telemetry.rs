//! Telemetry layer: wall-clock timing and completion stamping.

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::envelope::{RequestEnvelope, ResponseBody};
use super::HttpSend;

/// Measures the wrapped chain and stamps the envelope's terminal fields.
///
/// Elapsed time covers the whole inner pass including retries and breaker
/// delays, which is what the caller experiences.
pub struct TelemetryLayer<S> {
    inner: S,
}

impl<S> TelemetryLayer<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T, S> HttpSend<T> for TelemetryLayer<S>
where
    T: ResponseBody,
    S: HttpSend<T>,
{
    async fn send(
        &self,
        envelope: RequestEnvelope<T>,
        cancel: &CancellationToken,
    ) -> RequestEnvelope<T> {
        let started = Instant::now();
        let mut envelope = self.inner.send(envelope, cancel).await;
        envelope.elapsed = Some(started.elapsed());
        if envelope.completed_at.is_none() {
            envelope.completed_at = Some(Utc::now());
        }
        debug!(
            "request {} to {} finished in {:?} (status {:?}, retries {})",
            envelope.id, envelope.url, envelope.elapsed, envelope.status, envelope.retries
        );
        envelope
    }
}
