//! Bounded concurrent batch execution.
//!
//! Fans N independent requests out through the resilience pipeline with at
//! most C in flight at once. The core correctness property is that the
//! semaphore permit is acquired before a task is spawned and held by the task
//! for its entire body, so it is released on every exit path - completion,
//! panic or cancellation.

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{error, info};
use reqwest::Method;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::pipeline::{FailureClass, RequestEnvelope, ResponseBody, SharedSend};

/// One request to dispatch as part of a batch.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub url: String,
    pub method: Method,
    pub body: Option<String>,
    pub cache_minutes: u64,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            body: None,
            cache_minutes: 0,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            body: Some(body.into()),
            cache_minutes: 0,
        }
    }

    #[must_use]
    pub fn with_cache_minutes(mut self, minutes: u64) -> Self {
        self.cache_minutes = minutes;
        self
    }

    fn into_envelope<T: ResponseBody>(self, iteration: usize) -> RequestEnvelope<T> {
        RequestEnvelope::new(self.method, self.url, self.body)
            .with_cache_minutes(self.cache_minutes)
            .with_iteration(iteration)
    }
}

/// Semaphore-gated fan-out executor over one pipeline.
pub struct BatchRunner<T: ResponseBody> {
    sender: SharedSend<T>,
    concurrency: usize,
}

impl<T: ResponseBody> BatchRunner<T> {
    /// A runner that keeps at most `concurrency` requests in flight.
    #[must_use]
    pub fn new(sender: SharedSend<T>, concurrency: usize) -> Self {
        Self {
            sender,
            concurrency: concurrency.max(1),
        }
    }

    /// Dispatch every spec and wait for all of them to finish.
    ///
    /// Results carry the original index in `iteration`; completion order is
    /// not the input order. An individual request's failure is captured in
    /// its own envelope and never aborts its siblings. After a cancellation
    /// request, not-yet-dispatched specs come back as cancelled envelopes
    /// without a network attempt.
    pub async fn run(
        &self,
        specs: Vec<RequestSpec>,
        cancel: &CancellationToken,
    ) -> Vec<RequestEnvelope<T>> {
        let total = specs.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let results = Arc::new(Mutex::new(Vec::with_capacity(total)));
        let mut tasks = FuturesUnordered::new();

        for (iteration, spec) in specs.into_iter().enumerate() {
            let mut envelope = spec.into_envelope::<T>(iteration);

            if cancel.is_cancelled() {
                envelope.record_error("cancelled before dispatch");
                envelope.mark_failure(FailureClass::Cancelled);
                results.lock().await.push(envelope);
                continue;
            }

            // Gate task creation: waits here once C permits are out.
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // Semaphore is never closed while the runner is alive.
                    error!("batch semaphore closed unexpectedly");
                    envelope.record_error("batch semaphore closed");
                    results.lock().await.push(envelope);
                    continue;
                }
            };

            let sender = Arc::clone(&self.sender);
            let results = Arc::clone(&results);
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                // Held for the whole task body; dropped on every path.
                let _permit = permit;
                let outcome = sender.send(envelope, &cancel).await;
                results.lock().await.push(outcome);
            }));
        }

        while let Some(joined) = tasks.next().await {
            if let Err(e) = joined {
                error!("batch task panicked: {e}");
            }
        }

        info!("batch of {total} requests complete");

        match Arc::try_unwrap(results) {
            Ok(mutex) => mutex.into_inner(),
            // Unreachable: every task holding a clone has joined.
            Err(shared) => shared.lock().await.clone(),
        }
    }
}
