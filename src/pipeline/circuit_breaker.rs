//! Circuit breaker for the resilience pipeline.
//!
//! Tracks consecutive failures across all callers of one pipeline instance
//! and short-circuits outbound calls once a threshold is reached:
//! - Closed: normal operation, calls proceed
//! - Open: too many consecutive failures, calls are rejected without a
//!   network attempt until the open duration elapses
//! - `HalfOpen`: one probe call is allowed; success closes the circuit,
//!   failure re-opens it with a fresh cooldown

use log::{debug, info, warn};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - calls proceed
    Closed,
    /// Testing after cooldown - a single probe call is allowed
    HalfOpen,
    /// Failing - calls are rejected without a network attempt
    Open,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    total_attempts: u32,
    total_successes: u32,
    last_opened: Option<Instant>,
    probe_in_flight: bool,
}

/// Shared failure tracker for one pipeline instance.
///
/// All concurrent callers of the pipeline feed the same breaker, so tripping
/// it affects every in-flight request on that pipeline.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    open_duration: Duration,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures and stays open for `open_duration` before probing.
    #[must_use]
    pub fn new(failure_threshold: u32, open_duration: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                total_attempts: 0,
                total_successes: 0,
                last_opened: None,
                probe_in_flight: false,
            }),
            failure_threshold,
            open_duration,
        }
    }

    /// Whether a call should be attempted right now.
    ///
    /// Transitions Open to `HalfOpen` once the open duration has elapsed and
    /// claims the single probe slot for the caller that observes it.
    pub fn should_attempt(&self) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner.last_opened.map(|opened| opened.elapsed());
                if let Some(elapsed) = elapsed {
                    if elapsed >= self.open_duration {
                        inner.state = CircuitState::HalfOpen;
                        inner.probe_in_flight = true;
                        info!(
                            "circuit breaker transitioning to HALF-OPEN after {elapsed:?} cooldown"
                        );
                        return true;
                    }
                }
                false
            }
            CircuitState::HalfOpen => {
                // One probe at a time; concurrent callers wait for its verdict.
                if inner.probe_in_flight {
                    debug!("circuit breaker HALF-OPEN with probe in flight, rejecting call");
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Record a successful attempt. Resets the consecutive failure counter
    /// and closes the circuit if it was half-open.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.consecutive_failures = 0;
        inner.total_attempts += 1;
        inner.total_successes += 1;
        inner.probe_in_flight = false;
        if inner.state != CircuitState::Closed {
            inner.state = CircuitState::Closed;
            info!("circuit breaker CLOSED after successful probe");
        }
    }

    /// Release a claimed probe slot without recording a verdict.
    ///
    /// A probe that is abandoned (cancellation lands mid-attempt) must free
    /// the slot, otherwise the circuit stays half-open with no escape and
    /// rejects every future call.
    pub fn release_probe(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state == CircuitState::HalfOpen && inner.probe_in_flight {
            inner.probe_in_flight = false;
            debug!("circuit breaker probe abandoned, slot released");
        }
    }

    /// Record a failed attempt. Opens the circuit once the threshold of
    /// consecutive failures is reached, or re-opens it after a failed probe.
    pub fn record_failure(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.consecutive_failures += 1;
        inner.total_attempts += 1;
        inner.probe_in_flight = false;

        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            inner.last_opened = Some(Instant::now());
            warn!("circuit breaker RE-OPENED after failed probe: {error}");
        } else if inner.consecutive_failures >= self.failure_threshold
            && inner.state != CircuitState::Open
        {
            inner.state = CircuitState::Open;
            inner.last_opened = Some(Instant::now());
            warn!(
                "circuit breaker OPEN after {} consecutive failures. Last error: {error}",
                inner.consecutive_failures
            );
        } else if inner.state != CircuitState::Open {
            debug!(
                "circuit breaker failure {}/{}: {error}",
                inner.consecutive_failures, self.failure_threshold
            );
        }
    }

    /// Current state, for logging and tests.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    /// (attempts, successes) counters since construction.
    #[must_use]
    pub fn counters(&self) -> (u32, u32) {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        (inner.total_attempts, inner.total_successes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_closed_on_success() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));

        assert!(breaker.should_attempt());
        breaker.record_success();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.counters(), (1, 1));
    }

    #[test]
    fn opens_after_exactly_threshold_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));

        breaker.record_failure("boom");
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure("boom");
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure("boom");

        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.should_attempt());
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));

        breaker.record_failure("boom");
        breaker.record_success();
        breaker.record_failure("boom");

        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn allows_single_probe_after_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(50));

        breaker.record_failure("boom");
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.should_attempt());

        std::thread::sleep(Duration::from_millis(80));

        // First caller claims the probe slot, the second is rejected.
        assert!(breaker.should_attempt());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(!breaker.should_attempt());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.should_attempt());
    }

    #[test]
    fn abandoned_probe_frees_the_slot() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));

        breaker.record_failure("boom");
        std::thread::sleep(Duration::from_millis(40));
        assert!(breaker.should_attempt());

        // The probe never reports a verdict; the slot must come back.
        breaker.release_probe();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.should_attempt());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn failed_probe_reopens_circuit() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));

        breaker.record_failure("boom");
        std::thread::sleep(Duration::from_millis(40));
        assert!(breaker.should_attempt());

        breaker.record_failure("still down");
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.should_attempt());
    }
}
