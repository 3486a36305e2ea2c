//! The request/response container passed through the resilience pipeline.
//!
//! A `RequestEnvelope` describes one logical HTTP operation from creation to
//! terminal state. Pipeline layers mutate it in place as it travels down and
//! back up the chain; failures are appended to its error list instead of being
//! raised, so an envelope always comes back to the caller.

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Process-wide sequence for envelope ids.
static NEXT_ENVELOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Classification of a failed attempt, consumed by the retry layer.
///
/// This is the pipeline's substitute for a thrown exception: the base sender
/// classifies what went wrong and the retry layer decides whether the attempt
/// is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connection-level failure (DNS, TLS, refused, timeout). Retryable.
    Connection,
    /// Response body could not be decoded into the requested type.
    /// The raw body is preserved on the envelope. Not retryable.
    Deserialize,
    /// The circuit breaker rejected the call without a network attempt.
    CircuitOpen,
    /// Cancellation was requested before or between attempts.
    Cancelled,
}

/// Decode strategy for a response body, resolved at compile time.
///
/// `String` passes the raw body through untouched; [`Json<T>`] decodes it
/// with serde. Decode failures are reported as strings so the pipeline can
/// record them without a typed error crossing the `send` boundary.
pub trait ResponseBody: Clone + Send + Sync + 'static {
    fn from_raw(raw: &str) -> Result<Self, String>;
}

impl ResponseBody for String {
    fn from_raw(raw: &str) -> Result<Self, String> {
        Ok(raw.to_owned())
    }
}

/// Marker wrapper for JSON-decoded response bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> ResponseBody for Json<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn from_raw(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map(Json).map_err(|e| e.to_string())
    }
}

/// One in-flight or completed HTTP operation.
#[derive(Debug, Clone)]
pub struct RequestEnvelope<T: ResponseBody> {
    /// Monotonically assigned sequence id.
    pub id: u64,
    /// Caller-supplied correlation index, used by the batch runner.
    pub iteration: usize,
    pub url: String,
    pub method: Method,
    pub request_body: Option<String>,
    pub status: Option<StatusCode>,
    /// Typed response body, present after a successful decode.
    pub body: Option<T>,
    /// Raw response text, kept even when decoding fails.
    pub raw_body: Option<String>,
    /// Append-only list of human-readable failure descriptions.
    pub errors: Vec<String>,
    /// Wall-clock duration of the terminal pipeline pass.
    pub elapsed: Option<Duration>,
    /// Stamped once, when the envelope reaches its terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of retry attempts performed beyond the first call.
    pub retries: u32,
    /// Cache duration hint in minutes. Zero disables caching.
    pub cache_minutes: u64,
    failure: Option<FailureClass>,
}

impl<T: ResponseBody> RequestEnvelope<T> {
    pub fn new(method: Method, url: impl Into<String>, request_body: Option<String>) -> Self {
        Self {
            id: NEXT_ENVELOPE_ID.fetch_add(1, Ordering::Relaxed),
            iteration: 0,
            url: url.into(),
            method,
            request_body,
            status: None,
            body: None,
            raw_body: None,
            errors: Vec::new(),
            elapsed: None,
            completed_at: None,
            retries: 0,
            cache_minutes: 0,
            failure: None,
        }
    }

    /// Envelope for a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, None)
    }

    /// Envelope for a POST request with a JSON string body.
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(Method::POST, url, Some(body.into()))
    }

    #[must_use]
    pub fn with_iteration(mut self, iteration: usize) -> Self {
        self.iteration = iteration;
        self
    }

    #[must_use]
    pub fn with_cache_minutes(mut self, minutes: u64) -> Self {
        self.cache_minutes = minutes;
        self
    }

    /// Append a failure description. The error list is append-only; entries
    /// are never removed for the lifetime of the envelope.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Classify the most recent attempt as failed. Cleared by the retry
    /// layer before each new attempt.
    pub fn mark_failure(&mut self, class: FailureClass) {
        self.failure = Some(class);
    }

    pub(crate) fn clear_failure(&mut self) {
        self.failure = None;
    }

    #[must_use]
    pub fn failure_class(&self) -> Option<FailureClass> {
        self.failure
    }

    /// True when the terminal status is a 2xx code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|s| s.is_success())
    }
}
