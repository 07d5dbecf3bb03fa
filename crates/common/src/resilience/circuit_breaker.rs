//! Circuit breaker for isolating failing endpoints
//!
//! A breaker moves between three states:
//!
//! - `CLOSED`: every call is admitted. Consecutive failures are counted; once
//!   `failure_threshold` failures land within `failure_window` of the first
//!   one, the breaker opens.
//! - `OPEN`: every call is rejected without touching the network until
//!   `cooldown_period` has elapsed since the breaker opened.
//! - `HALF_OPEN`: up to `half_open_budget` probe calls are admitted. The first
//!   probe success closes the breaker, a probe failure resets the counter to
//!   zero and reopens it. Callers beyond the budget are rejected until a probe
//!   settles.
//!
//! Admission hands out a [`CircuitPermit`]. The caller reports the outcome by
//! consuming the permit; a permit dropped without an outcome (e.g. the caller
//! was cancelled) gives its probe slot back so `HALF_OPEN` cannot wedge.
//!
//! All state lives behind one mutex per breaker, so transitions are
//! linearizable: every caller observes them in the same order. Outcomes that
//! belong to an earlier state epoch (a call admitted while `CLOSED` that
//! finishes after the breaker already opened) are ignored.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use crate::error::{CommonError, CommonResult};
use crate::utils::serde::duration_millis;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, admitting a bounded number of probes
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Span within which the failures must accumulate
    #[serde(rename = "failure_window_ms", with = "duration_millis")]
    pub failure_window: Duration,
    /// Time spent `OPEN` before probes are admitted
    #[serde(rename = "cooldown_period_ms", with = "duration_millis")]
    pub cooldown_period: Duration,
    /// Concurrent probes admitted while `HALF_OPEN`
    pub half_open_budget: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            cooldown_period: Duration::from_secs(30),
            half_open_budget: 1,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> CommonResult<()> {
        if self.failure_threshold == 0 {
            return Err(CommonError::config_field(
                "circuit_breaker.failure_threshold",
                "must be greater than 0",
            ));
        }
        if self.failure_window.is_zero() {
            return Err(CommonError::config_field(
                "circuit_breaker.failure_window_ms",
                "must be greater than 0",
            ));
        }
        if self.half_open_budget == 0 {
            return Err(CommonError::config_field(
                "circuit_breaker.half_open_budget",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn failure_window(mut self, window: Duration) -> Self {
        self.config.failure_window = window;
        self
    }

    pub fn cooldown_period(mut self, cooldown: Duration) -> Self {
        self.config.cooldown_period = cooldown;
        self
    }

    pub fn half_open_budget(mut self, budget: u32) -> Self {
        self.config.half_open_budget = budget;
        self
    }

    pub fn build(self) -> CommonResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// A state change, handed to the transition listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: CircuitState,
    pub to: CircuitState,
    pub at: Instant,
    /// Failure count at the moment of the transition (before any reset)
    pub consecutive_failures: u32,
}

/// Callback invoked on every transition, under the breaker's lock
///
/// The listener must not call back into the same breaker.
pub type TransitionListener = Arc<dyn Fn(&StateTransition) + Send + Sync>;

/// Rejection returned by [`CircuitBreaker::allow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit {state} rejected the call")]
pub struct CircuitRejected {
    pub state: CircuitState,
    /// Remaining cooldown when `OPEN`; `None` while probes are in flight
    pub retry_after: Option<Duration>,
}

/// Circuit breaker metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
    pub last_transition: Instant,
    pub probes_in_flight: u32,
    pub total_calls: u64,
    pub rejected_calls: u64,
    pub total_successes: u64,
    pub total_failures: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// Bumped on every transition; outcomes from older epochs are stale
    epoch: u64,
    consecutive_failures: u32,
    streak_started: Option<Instant>,
    opened_at: Option<Instant>,
    last_transition: Instant,
    probes_in_flight: u32,
    total_calls: u64,
    rejected_calls: u64,
    total_successes: u64,
    total_failures: u64,
}

/// Per-endpoint circuit breaker
pub struct CircuitBreaker<C: Clock = SystemClock> {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    listener: Option<TransitionListener>,
    clock: C,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("consecutive_failures", &inner.consecutive_failures)
            .finish()
    }
}

impl CircuitBreaker<SystemClock> {
    pub fn new(config: CircuitBreakerConfig) -> CommonResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> CommonResult<Self> {
        config.validate()?;
        let now = clock.now();

        Ok(Self {
            name: "default".to_string(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                epoch: 0,
                consecutive_failures: 0,
                streak_started: None,
                opened_at: None,
                last_transition: now,
                probes_in_flight: 0,
                total_calls: 0,
                rejected_calls: 0,
                total_successes: 0,
                total_failures: 0,
            }),
            listener: None,
            clock,
        })
    }

    /// Name used in log fields
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_listener(mut self, listener: TransitionListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Ask for admission
    ///
    /// Moves `OPEN` to `HALF_OPEN` once the cooldown has elapsed.
    pub fn allow(&self) -> Result<CircuitPermit<'_, C>, CircuitRejected> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            let opened_at = inner.opened_at.unwrap_or(inner.last_transition);
            let elapsed = now.saturating_duration_since(opened_at);
            if elapsed < self.config.cooldown_period {
                inner.rejected_calls += 1;
                debug!(breaker = %self.name, state = %inner.state, "circuit_rejected");
                return Err(CircuitRejected {
                    state: CircuitState::Open,
                    retry_after: Some(self.config.cooldown_period - elapsed),
                });
            }
            self.transition(&mut inner, CircuitState::HalfOpen, now);
        }

        let probe = match inner.state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen if inner.probes_in_flight < self.config.half_open_budget => {
                inner.probes_in_flight += 1;
                true
            }
            state => {
                inner.rejected_calls += 1;
                debug!(breaker = %self.name, state = %state, "circuit_rejected");
                return Err(CircuitRejected { state, retry_after: None });
            }
        };

        inner.total_calls += 1;
        Ok(CircuitPermit { breaker: self, epoch: inner.epoch, probe, settled: false })
    }

    /// Get the current state of the circuit breaker
    ///
    /// Does not perform the lazy `OPEN` to `HALF_OPEN` transition.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        CircuitBreakerMetrics {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            opened_at: inner.opened_at,
            last_transition: inner.last_transition,
            probes_in_flight: inner.probes_in_flight,
            total_calls: inner.total_calls,
            rejected_calls: inner.rejected_calls,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
        }
    }

    /// Force the breaker back to `CLOSED` with a clean counter
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed, now);
        } else {
            inner.epoch += 1;
        }
        inner.consecutive_failures = 0;
        inner.streak_started = None;
        info!(breaker = %self.name, "circuit_manual_reset");
    }

    fn on_success(&self, epoch: u64, probe: bool) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.total_successes += 1;
        if inner.epoch != epoch {
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.streak_started = None;
            }
            CircuitState::HalfOpen if probe => {
                self.transition(&mut inner, CircuitState::Closed, now);
                inner.consecutive_failures = 0;
                inner.streak_started = None;
            }
            _ => {}
        }
    }

    fn on_failure(&self, epoch: u64, probe: bool) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.total_failures += 1;
        if inner.epoch != epoch {
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                let window_expired = inner
                    .streak_started
                    .is_some_and(|start| now.saturating_duration_since(start) > self.config.failure_window);
                if inner.streak_started.is_none() || window_expired {
                    inner.streak_started = Some(now);
                    inner.consecutive_failures = 0;
                }
                inner.consecutive_failures += 1;

                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen if probe => {
                inner.consecutive_failures = 0;
                inner.streak_started = None;
                self.transition(&mut inner, CircuitState::Open, now);
            }
            _ => {}
        }
    }

    fn release_probe(&self, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch == epoch && inner.state == CircuitState::HalfOpen {
            inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
            debug!(breaker = %self.name, "circuit_probe_released");
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState, now: Instant) {
        let from = inner.state;
        let event = StateTransition {
            from,
            to,
            at: now,
            consecutive_failures: inner.consecutive_failures,
        };

        inner.state = to;
        inner.epoch += 1;
        inner.last_transition = now;
        inner.probes_in_flight = 0;
        match to {
            CircuitState::Open => inner.opened_at = Some(now),
            CircuitState::Closed => inner.opened_at = None,
            CircuitState::HalfOpen => {}
        }

        match to {
            CircuitState::Open => warn!(
                breaker = %self.name,
                from = %from,
                to = %to,
                failures = event.consecutive_failures,
                "circuit_state_transition"
            ),
            _ => info!(breaker = %self.name, from = %from, to = %to, "circuit_state_transition"),
        }

        if let Some(listener) = &self.listener {
            listener(&event);
        }
    }
}

/// Admission granted by [`CircuitBreaker::allow`]
///
/// Report the outcome with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure). Dropping the permit without an
/// outcome releases a half-open probe slot and records nothing.
#[must_use = "report the call outcome through the permit"]
pub struct CircuitPermit<'a, C: Clock = SystemClock> {
    breaker: &'a CircuitBreaker<C>,
    epoch: u64,
    probe: bool,
    settled: bool,
}

impl<C: Clock> CircuitPermit<'_, C> {
    /// Whether this permit occupies a half-open probe slot
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.epoch, self.probe);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.epoch, self.probe);
    }
}

impl<C: Clock> fmt::Debug for CircuitPermit<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitPermit")
            .field("breaker", &self.breaker.name)
            .field("epoch", &self.epoch)
            .field("probe", &self.probe)
            .finish()
    }
}

impl<C: Clock> Drop for CircuitPermit<'_, C> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe(self.epoch);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the circuit breaker
    //!
    //! Tests cover configuration validation, state transitions under a mock
    //! clock, the failure window, probe budgeting, permit release on drop,
    //! listeners, and concurrent admission.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::resilience::clock::MockClock;

    fn breaker(threshold: u32, cooldown_secs: u64) -> (CircuitBreaker<MockClock>, MockClock) {
        let clock = MockClock::new();
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(threshold)
            .cooldown_period(Duration::from_secs(cooldown_secs))
            .build()
            .expect("valid config");
        let cb = CircuitBreaker::with_clock(config, clock.clone()).expect("valid breaker");
        (cb, clock)
    }

    fn fail(cb: &CircuitBreaker<MockClock>) {
        cb.allow().expect("admitted").record_failure();
    }

    /// Validates `CircuitState::Closed` behavior for the circuit state display
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `CircuitState::Closed.to_string()` equals `"CLOSED"`.
    /// - Confirms `CircuitState::Open.to_string()` equals `"OPEN"`.
    /// - Confirms `CircuitState::HalfOpen.to_string()` equals `"HALF_OPEN"`.
    #[test]
    fn test_circuit_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
    }

    /// Validates `CircuitBreakerConfig::default` behavior for the circuit
    /// breaker config validation scenario.
    ///
    /// Assertions:
    /// - Ensures the default config validates.
    /// - Ensures zero threshold, window and budget are rejected.
    #[test]
    fn test_circuit_breaker_config_validation() {
        let mut config = CircuitBreakerConfig::default();
        assert!(config.validate().is_ok());

        config.failure_threshold = 0;
        assert!(config.validate().is_err());

        config.failure_threshold = 5;
        config.failure_window = Duration::ZERO;
        assert!(config.validate().is_err());

        config.failure_window = Duration::from_secs(1);
        config.half_open_budget = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_deserializes_millisecond_keys() {
        let config: CircuitBreakerConfig =
            serde_json::from_str(r#"{"failure_threshold":3,"cooldown_period_ms":1500}"#)
                .expect("valid json");
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.cooldown_period, Duration::from_millis(1500));
        assert_eq!(config.failure_window, Duration::from_secs(60));
        assert_eq!(config.half_open_budget, 1);
    }

    /// Tests that circuit opens when failure threshold is reached
    #[test]
    fn test_opens_after_threshold_failures() {
        let (cb, _clock) = breaker(3, 30);

        fail(&cb);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Closed, "Should remain closed below threshold");

        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Open, "Should open at threshold");

        let rejected = cb.allow().expect_err("open circuit rejects");
        assert_eq!(rejected.state, CircuitState::Open);
        assert_eq!(rejected.retry_after, Some(Duration::from_secs(30)));
        assert_eq!(cb.metrics().rejected_calls, 1);
    }

    #[test]
    fn test_success_in_closed_resets_counter() {
        let (cb, _clock) = breaker(3, 30);

        fail(&cb);
        fail(&cb);
        cb.allow().expect("admitted").record_success();
        assert_eq!(cb.metrics().consecutive_failures, 0);

        fail(&cb);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    /// Validates that failures spread wider than the window start a new
    /// streak instead of opening the circuit.
    ///
    /// Assertions:
    /// - Confirms the breaker stays `CLOSED` after the window restarts.
    /// - Confirms the counter restarted at 1.
    #[test]
    fn test_failures_outside_window_restart_streak() {
        let clock = MockClock::new();
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(3)
            .failure_window(Duration::from_secs(10))
            .build()
            .unwrap();
        let cb = CircuitBreaker::with_clock(config, clock.clone()).unwrap();

        fail(&cb);
        fail(&cb);
        clock.advance(Duration::from_secs(11));
        fail(&cb);

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.metrics().consecutive_failures, 1);
    }

    /// Validates the cooldown and single-probe behavior.
    ///
    /// Assertions:
    /// - Confirms rejection before cooldown with the remaining wait.
    /// - Confirms exactly one probe is admitted after cooldown.
    /// - Confirms probe success closes the circuit.
    #[test]
    fn test_half_open_admits_one_probe_and_closes_on_success() {
        let (cb, clock) = breaker(1, 30);
        fail(&cb);

        clock.advance(Duration::from_secs(1));
        let rejected = cb.allow().unwrap_err();
        assert_eq!(rejected.retry_after, Some(Duration::from_secs(29)));

        clock.advance(Duration::from_secs(29));
        let probe = cb.allow().expect("probe admitted");
        assert!(probe.is_probe());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let second = cb.allow().unwrap_err();
        assert_eq!(second.state, CircuitState::HalfOpen);
        assert_eq!(second.retry_after, None);

        probe.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.metrics().consecutive_failures, 0);
        assert!(cb.allow().is_ok());
    }

    #[test]
    fn test_probe_failure_reopens_and_resets_opened_at() {
        let (cb, clock) = breaker(2, 30);
        fail(&cb);
        fail(&cb);
        let first_open = cb.metrics().opened_at.expect("opened");

        clock.advance(Duration::from_secs(30));
        cb.allow().expect("probe").record_failure();

        let metrics = cb.metrics();
        assert_eq!(metrics.state, CircuitState::Open);
        assert_eq!(metrics.consecutive_failures, 0);
        assert_eq!(metrics.opened_at, Some(first_open + Duration::from_secs(30)));

        clock.advance(Duration::from_secs(10));
        assert_eq!(cb.allow().unwrap_err().retry_after, Some(Duration::from_secs(20)));
    }

    /// Validates that a probe permit dropped without an outcome frees its
    /// slot.
    ///
    /// Assertions:
    /// - Confirms a second probe is admitted after the first is dropped.
    /// - Confirms the state stays `HALF_OPEN`.
    #[test]
    fn test_dropped_probe_releases_slot() {
        let (cb, clock) = breaker(1, 5);
        fail(&cb);
        clock.advance(Duration::from_secs(5));

        let probe = cb.allow().expect("probe");
        drop(probe);

        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.metrics().probes_in_flight, 0);
        assert!(cb.allow().is_ok());
    }

    #[test]
    fn test_stale_outcome_from_closed_epoch_is_ignored() {
        let (cb, clock) = breaker(1, 5);
        let slow = cb.allow().expect("admitted while closed");
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(5));
        let probe = cb.allow().expect("probe");

        // The call admitted before the circuit opened must not close it.
        slow.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        probe.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_budget_above_one() {
        let clock = MockClock::new();
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .cooldown_period(Duration::from_secs(1))
            .half_open_budget(2)
            .build()
            .unwrap();
        let cb = CircuitBreaker::with_clock(config, clock.clone()).unwrap();
        fail(&cb);
        clock.advance(Duration::from_secs(1));

        let p1 = cb.allow().expect("first probe");
        let p2 = cb.allow().expect("second probe");
        assert!(cb.allow().is_err());

        p1.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        // The second probe belongs to the previous half-open epoch.
        p2.record_success();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    /// Validates that the listener observes every transition in order.
    ///
    /// Assertions:
    /// - Confirms the sequence CLOSED→OPEN→HALF_OPEN→CLOSED.
    #[test]
    fn test_listener_sees_transitions_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let clock = MockClock::new();
        let config = CircuitBreakerConfig::builder().failure_threshold(1).build().unwrap();
        let cb = CircuitBreaker::with_clock(config, clock.clone())
            .unwrap()
            .named("pubchem")
            .with_listener(Arc::new(move |t: &StateTransition| sink.lock().push((t.from, t.to))));

        fail(&cb);
        clock.advance(Duration::from_secs(30));
        cb.allow().unwrap().record_success();

        assert_eq!(
            *seen.lock(),
            vec![
                (CircuitState::Closed, CircuitState::Open),
                (CircuitState::Open, CircuitState::HalfOpen),
                (CircuitState::HalfOpen, CircuitState::Closed),
            ]
        );
        assert_eq!(cb.name(), "pubchem");
    }

    #[test]
    fn test_reset_closes_circuit() {
        let (cb, _clock) = breaker(1, 30);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow().is_ok());
    }

    /// Validates that concurrent callers racing for a single probe slot get
    /// exactly one admission.
    ///
    /// Assertions:
    /// - Confirms `admitted` equals `1`.
    #[test]
    fn test_concurrent_probe_admission() {
        let (cb, clock) = breaker(1, 1);
        fail(&cb);
        clock.advance(Duration::from_secs(1));

        let admitted = AtomicUsize::new(0);
        let permits = Mutex::new(Vec::new());
        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    if let Ok(permit) = cb.allow() {
                        admitted.fetch_add(1, Ordering::SeqCst);
                        permits.lock().push(permit);
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert_eq!(cb.metrics().rejected_calls, 15);
    }
}
