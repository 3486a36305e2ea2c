//! Resilience pipeline for outbound HTTP.
//!
//! Composable request layers, each satisfying the same [`HttpSend`] contract
//! so they stack transparently (outermost first):
//! cache -> telemetry -> retry/circuit-breaker -> base sender.
//!
//! The contract is deliberately infallible: expected failures - connection
//! errors, HTTP error statuses, decode failures, breaker rejections - are
//! recorded into the envelope and the envelope is always returned. Callers
//! above the pipeline never see an `Err` for these.

pub mod base;
pub mod cache;
pub mod circuit_breaker;
pub mod envelope;
pub mod retry;
pub mod telemetry;

pub use base::BaseSender;
pub use cache::CacheLayer;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use envelope::{FailureClass, Json, RequestEnvelope, ResponseBody};
pub use retry::{RetryLayer, CIRCUIT_OPEN_ERROR};
pub use telemetry::TelemetryLayer;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The single contract every pipeline layer implements.
#[async_trait]
pub trait HttpSend<T: ResponseBody>: Send + Sync {
    /// Drive one envelope to its terminal state. Never fails; all failure
    /// detail lives on the returned envelope.
    async fn send(
        &self,
        envelope: RequestEnvelope<T>,
        cancel: &CancellationToken,
    ) -> RequestEnvelope<T>;
}

/// Shareable handle to a fully wired pipeline (or a test double).
pub type SharedSend<T> = Arc<dyn HttpSend<T>>;

/// Knobs consumed by the retry/breaker layer.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_retry_attempts: u32,
    pub retry_delay: Duration,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_duration: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
            circuit_breaker_threshold: 3,
            circuit_breaker_duration: Duration::from_secs(30),
        }
    }
}

/// Wire the standard layer stack around a reqwest client.
///
/// Composition is static - concrete layer types nested at construction time,
/// erased once behind the returned trait object.
#[must_use]
pub fn build_pipeline<T: ResponseBody>(
    client: reqwest::Client,
    options: &PipelineOptions,
) -> SharedSend<T> {
    let base = BaseSender::new(client);
    let retry = RetryLayer::new(base, options);
    let telemetry = TelemetryLayer::new(retry);
    let cache = CacheLayer::new(telemetry);
    Arc::new(cache)
}
