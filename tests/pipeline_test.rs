//! Pipeline behavior: retries, circuit breaking and response caching.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use sitecrawl::pipeline::{
    build_pipeline, FailureClass, HttpSend, PipelineOptions, RequestEnvelope, RetryLayer,
    CIRCUIT_OPEN_ERROR,
};

/// Scripted stand-in for the base sender: plays back a fixed sequence of
/// per-attempt outcomes and counts how many attempts actually reached it.
/// Clones share the script and the counter, so a test can keep a handle
/// after handing the sender to a layer.
#[derive(Clone)]
struct ScriptedSender {
    outcomes: Arc<Mutex<Vec<Outcome>>>,
    attempts: Arc<AtomicUsize>,
}

#[derive(Clone)]
enum Outcome {
    ConnectionFailure,
    Cancelled,
    Success(&'static str),
}

impl ScriptedSender {
    fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes)),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpSend<String> for ScriptedSender {
    async fn send(
        &self,
        mut envelope: RequestEnvelope<String>,
        _cancel: &CancellationToken,
    ) -> RequestEnvelope<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = {
            let mut outcomes = self.outcomes.lock().expect("script lock");
            if outcomes.is_empty() {
                Outcome::ConnectionFailure
            } else {
                outcomes.remove(0)
            }
        };
        match outcome {
            Outcome::ConnectionFailure => {
                envelope.status = Some(StatusCode::SERVICE_UNAVAILABLE);
                envelope.record_error("connection refused");
                envelope.mark_failure(FailureClass::Connection);
            }
            Outcome::Cancelled => {
                envelope.record_error("cancelled before dispatch");
                envelope.mark_failure(FailureClass::Cancelled);
            }
            Outcome::Success(body) => {
                envelope.status = Some(StatusCode::OK);
                envelope.body = Some(body.to_string());
                envelope.raw_body = Some(body.to_string());
            }
        }
        envelope
    }
}

fn fast_options(max_retry_attempts: u32, circuit_breaker_threshold: u32) -> PipelineOptions {
    PipelineOptions {
        max_retry_attempts,
        retry_delay: Duration::from_millis(1),
        circuit_breaker_threshold,
        circuit_breaker_duration: Duration::from_millis(50),
    }
}

#[tokio::test]
async fn connection_failures_are_retried_until_success() {
    let script = ScriptedSender::new(vec![
        Outcome::ConnectionFailure,
        Outcome::ConnectionFailure,
        Outcome::Success("<html>ok</html>"),
    ]);
    let layer = RetryLayer::new(script, &fast_options(3, 10));
    let cancel = CancellationToken::new();

    let envelope = RequestEnvelope::<String>::get("https://example.com/page");
    let result = layer.send(envelope, &cancel).await;

    assert!(result.is_success());
    assert_eq!(result.retries, 2);
    assert_eq!(result.body.as_deref(), Some("<html>ok</html>"));
    // The failed attempts stay on the record even though the call succeeded.
    assert!(result.errors.iter().any(|e| e.contains("connection refused")));
}

#[tokio::test]
async fn retries_exhaust_and_the_envelope_reports_failure() {
    let layer = RetryLayer::new(
        ScriptedSender::new(vec![Outcome::ConnectionFailure; 4]),
        &fast_options(2, 10),
    );
    let cancel = CancellationToken::new();

    let result = layer
        .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
        .await;

    assert!(!result.is_success());
    assert_eq!(result.retries, 2);
    assert_eq!(result.status, Some(StatusCode::SERVICE_UNAVAILABLE));
}

#[tokio::test]
async fn breaker_opens_after_threshold_and_fails_fast() {
    let script = ScriptedSender::new(vec![Outcome::ConnectionFailure; 10]);
    let layer = RetryLayer::new(script.clone(), &fast_options(0, 3));
    let cancel = CancellationToken::new();

    // Three real attempts trip the breaker.
    for _ in 0..3 {
        let result = layer
            .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
            .await;
        assert!(!result.errors.iter().any(|e| e == CIRCUIT_OPEN_ERROR));
    }

    // Calls four and five are rejected without reaching the sender.
    for _ in 0..2 {
        let result = layer
            .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
            .await;
        assert!(result.errors.iter().any(|e| e == CIRCUIT_OPEN_ERROR));
        assert_eq!(result.status, Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    assert_eq!(script.attempts(), 3);
}

#[tokio::test]
async fn breaker_closes_again_after_a_successful_probe() {
    let script = ScriptedSender::new(vec![
        Outcome::ConnectionFailure,
        Outcome::Success("recovered"),
        Outcome::Success("still good"),
    ]);
    let layer = RetryLayer::new(script, &fast_options(0, 1));
    let cancel = CancellationToken::new();

    let failed = layer
        .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
        .await;
    assert!(!failed.is_success());

    // Rejected while the cooldown is running.
    let rejected = layer
        .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
        .await;
    assert!(rejected.errors.iter().any(|e| e == CIRCUIT_OPEN_ERROR));

    tokio::time::sleep(Duration::from_millis(80)).await;

    // The cooldown elapsed; the probe goes through and closes the circuit.
    let probe = layer
        .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
        .await;
    assert!(probe.is_success());

    let after = layer
        .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
        .await;
    assert!(after.is_success());
}

#[tokio::test]
async fn cancelled_probe_does_not_wedge_the_breaker() {
    let script = ScriptedSender::new(vec![
        Outcome::ConnectionFailure,
        Outcome::Cancelled,
        Outcome::Success("back up"),
    ]);
    let layer = RetryLayer::new(script, &fast_options(0, 1));
    let cancel = CancellationToken::new();

    let failed = layer
        .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
        .await;
    assert!(!failed.is_success());

    tokio::time::sleep(Duration::from_millis(80)).await;

    // The probe is abandoned mid-attempt; it must give the slot back.
    let abandoned = layer
        .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
        .await;
    assert!(!abandoned.is_success());
    assert!(abandoned.errors.iter().any(|e| e.contains("cancelled")));

    // A later call can still probe and close the circuit.
    tokio::time::sleep(Duration::from_millis(80)).await;
    let recovered = layer
        .send(RequestEnvelope::<String>::get("https://example.com"), &cancel)
        .await;
    assert!(
        !recovered.errors.iter().any(|e| e == CIRCUIT_OPEN_ERROR),
        "breaker never recovered: {:?}",
        recovered.errors
    );
    assert!(recovered.is_success());
}

#[tokio::test]
async fn cached_responses_are_served_without_refetching() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/cached")
        .with_status(200)
        .with_body("<html>cache me</html>")
        .expect(1)
        .create_async()
        .await;

    let sender = build_pipeline::<String>(reqwest::Client::new(), &PipelineOptions::default());
    let cancel = CancellationToken::new();
    let url = format!("{}/cached", server.url());

    let first = sender
        .send(
            RequestEnvelope::<String>::get(&url).with_cache_minutes(5),
            &cancel,
        )
        .await;
    assert!(first.is_success());

    let second = sender
        .send(
            RequestEnvelope::<String>::get(&url).with_cache_minutes(5),
            &cancel,
        )
        .await;
    assert!(second.is_success());
    assert_eq!(second.body, first.body);
    // The cache hands back the stored envelope unmodified, id included.
    assert_eq!(second.id, first.id);

    mock.assert_async().await;
}

#[tokio::test]
async fn zero_cache_minutes_disables_caching() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/fresh")
        .with_status(200)
        .with_body("always fetched")
        .expect(2)
        .create_async()
        .await;

    let sender = build_pipeline::<String>(reqwest::Client::new(), &PipelineOptions::default());
    let cancel = CancellationToken::new();
    let url = format!("{}/fresh", server.url());

    for _ in 0..2 {
        let result = sender.send(RequestEnvelope::<String>::get(&url), &cancel).await;
        assert!(result.is_success());
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn cancelled_token_short_circuits_the_pipeline() {
    let sender = build_pipeline::<String>(reqwest::Client::new(), &PipelineOptions::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = sender
        .send(
            RequestEnvelope::<String>::get("https://example.com"),
            &cancel,
        )
        .await;

    assert!(!result.is_success());
    assert!(result.errors.iter().any(|e| e.contains("cancelled")));
}
