//! Retry and circuit-breaking layer.
//!
//! Wraps an inner sender and repeats connection-level failures up to a
//! configured number of attempts with a fixed delay, while feeding every
//! attempt's outcome into a shared [`CircuitBreaker`]. Once the breaker
//! trips, calls fail fast without touching the network until the cooldown
//! elapses. All retry and breaker events become entries in the envelope's
//! error list rather than errors returned to the caller.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::circuit_breaker::CircuitBreaker;
use super::envelope::{FailureClass, RequestEnvelope, ResponseBody};
use super::{HttpSend, PipelineOptions};

/// Error text recorded when the breaker rejects a call without an attempt.
pub const CIRCUIT_OPEN_ERROR: &str = "circuit breaker open: request rejected without attempt";

pub struct RetryLayer<S> {
    inner: S,
    breaker: CircuitBreaker,
    max_retry_attempts: u32,
    retry_delay: Duration,
}

impl<S> RetryLayer<S> {
    #[must_use]
    pub fn new(inner: S, options: &PipelineOptions) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(
                options.circuit_breaker_threshold,
                options.circuit_breaker_duration,
            ),
            max_retry_attempts: options.max_retry_attempts,
            retry_delay: options.retry_delay,
        }
    }

    /// The breaker shared by every caller of this layer.
    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl<T, S> HttpSend<T> for RetryLayer<S>
where
    T: ResponseBody,
    S: HttpSend<T>,
{
    async fn send(
        &self,
        mut envelope: RequestEnvelope<T>,
        cancel: &CancellationToken,
    ) -> RequestEnvelope<T> {
        loop {
            if cancel.is_cancelled() {
                envelope.record_error("cancelled before dispatch");
                envelope.mark_failure(FailureClass::Cancelled);
                return envelope;
            }

            if !self.breaker.should_attempt() {
                debug!("failing fast, circuit open for {}", envelope.url);
                envelope.record_error(CIRCUIT_OPEN_ERROR);
                envelope.status = Some(StatusCode::SERVICE_UNAVAILABLE);
                envelope.mark_failure(FailureClass::CircuitOpen);
                return envelope;
            }

            envelope = self.inner.send(envelope, cancel).await;

            match envelope.failure_class() {
                Some(FailureClass::Connection) => {
                    let last_error = envelope
                        .errors
                        .last()
                        .cloned()
                        .unwrap_or_else(|| "connection failure".to_string());
                    self.breaker.record_failure(&last_error);

                    if envelope.retries >= self.max_retry_attempts {
                        warn!(
                            "retry attempts exhausted for {} after {} retries",
                            envelope.url, envelope.retries
                        );
                        envelope.record_error(format!(
                            "retry attempts exhausted after {} retries",
                            envelope.retries
                        ));
                        return envelope;
                    }

                    envelope.retries += 1;
                    envelope.record_error(format!(
                        "retry {} of {} after connection failure",
                        envelope.retries, self.max_retry_attempts
                    ));
                    debug!(
                        "retry {} of {} for {}",
                        envelope.retries, self.max_retry_attempts, envelope.url
                    );

                    tokio::select! {
                        () = cancel.cancelled() => {
                            envelope.record_error("cancelled during retry delay");
                            envelope.mark_failure(FailureClass::Cancelled);
                            return envelope;
                        }
                        () = tokio::time::sleep(self.retry_delay) => {}
                    }

                    // Transient per-attempt state; the error list is kept.
                    envelope.status = None;
                    envelope.clear_failure();
                }
                Some(FailureClass::Cancelled) => {
                    // The attempt may have held the half-open probe slot.
                    self.breaker.release_probe();
                    return envelope;
                }
                _ => {
                    // HTTP error statuses and decode failures count as a
                    // completed call: the connection worked.
                    self.breaker.record_success();
                    return envelope;
                }
            }
        }
    }
}
