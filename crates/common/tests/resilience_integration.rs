//! Integration tests for the resilience primitives
//!
//! Drives the circuit breaker, token bucket and retry policy together the way
//! a caller's retry loop would, under tokio's paused clock.

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::time::Duration;

use scifetch_common::resilience::{
    classify_http_status, CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock, GiveUpReason,
    RateLimitConfig, RetryClass, RetryConfig, RetryDecision, RetryPolicy, RetrySignal,
    StateTransition, SystemClock, TokenBucket,
};

/// HTTP-ish failure used as a retry signal
#[derive(Debug, Clone, Copy)]
struct StatusFailure {
    status: u16,
    retry_after: Option<Duration>,
}

impl RetrySignal for StatusFailure {
    fn retry_class(&self) -> RetryClass {
        classify_http_status(self.status)
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

/// Runs one logical call against a scripted sequence of statuses.
///
/// Returns the final status and number of attempts made.
async fn run_call(
    breaker: &CircuitBreaker,
    bucket: &TokenBucket,
    policy: &RetryPolicy,
    script: &mut Vec<StatusFailure>,
) -> Result<(u16, u32), &'static str> {
    let deadline = SystemClock.now() + Duration::from_secs(120);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let permit = breaker.allow().map_err(|_| "circuit open")?;
        bucket.acquire(1, deadline).await.map_err(|_| "rate limited")?;

        let outcome = script.remove(0);
        if outcome.status < 400 {
            permit.record_success();
            return Ok((outcome.status, attempt));
        }
        permit.record_failure();

        match policy.decide(attempt, &outcome) {
            RetryDecision::RetryAfter(delay) => tokio::time::sleep(delay).await,
            RetryDecision::GiveUp(GiveUpReason::Permanent) => return Err("permanent"),
            RetryDecision::GiveUp(GiveUpReason::AttemptsExhausted) => return Err("exhausted"),
        }
    }
}

fn components(max_attempts: u32) -> (CircuitBreaker, TokenBucket, RetryPolicy) {
    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .failure_threshold(5)
            .cooldown_period(Duration::from_secs(30))
            .build()
            .expect("valid breaker config"),
    )
    .expect("breaker");
    let bucket =
        TokenBucket::new(RateLimitConfig::new(10, Duration::from_secs(1))).expect("bucket");
    let policy = RetryPolicy::new(
        RetryConfig::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(200))
            .jitter_fraction(0.0)
            .build()
            .expect("valid retry config"),
    )
    .expect("policy");
    (breaker, bucket, policy)
}

/// Validates that a Retry-After hint drives the wait between attempts.
///
/// # Test Steps
/// 1. Script a 429 carrying `retry_after = 7s`, then a 200
/// 2. Run the loop under paused time
/// 3. Verify two attempts and ~7s elapsed
#[tokio::test(start_paused = true)]
async fn test_retry_after_hint_governs_wait() {
    let (breaker, bucket, policy) = components(3);
    let mut script = vec![
        StatusFailure { status: 429, retry_after: Some(Duration::from_secs(7)) },
        StatusFailure { status: 200, retry_after: None },
    ];
    let start = SystemClock.now();

    let (status, attempts) = run_call(&breaker, &bucket, &policy, &mut script).await.unwrap();

    assert_eq!((status, attempts), (200, 2));
    let elapsed = SystemClock.now().duration_since(start);
    assert!(elapsed >= Duration::from_secs(7) && elapsed < Duration::from_millis(7100));
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Validates that consecutive 503s open the breaker and later calls short
/// circuit.
///
/// # Test Steps
/// 1. Issue five single-attempt calls that each get a 503
/// 2. Verify the breaker is open
/// 3. One second later, verify the next call is rejected without consuming
///    the script
#[tokio::test(start_paused = true)]
async fn test_consecutive_failures_open_breaker() {
    let (breaker, bucket, policy) = components(1);
    let mut script: Vec<_> =
        (0..6).map(|_| StatusFailure { status: 503, retry_after: None }).collect();

    for _ in 0..5 {
        assert_eq!(run_call(&breaker, &bucket, &policy, &mut script).await, Err("exhausted"));
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(run_call(&breaker, &bucket, &policy, &mut script).await, Err("circuit open"));
    assert_eq!(script.len(), 1, "no attempt was made while open");
}

#[tokio::test(start_paused = true)]
async fn test_permanent_status_gives_up_after_one_attempt() {
    let (breaker, bucket, policy) = components(5);
    let mut script = vec![
        StatusFailure { status: 400, retry_after: None },
        StatusFailure { status: 200, retry_after: None },
    ];

    assert_eq!(run_call(&breaker, &bucket, &policy, &mut script).await, Err("permanent"));
    assert_eq!(script.len(), 1);
}

/// Validates that breakers shared across tasks converge on one state.
///
/// # Test Steps
/// 1. Share one breaker across 20 tasks that each record a failure
/// 2. Verify it opened exactly once and stays open
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_breaker_across_tasks() {
    let transitions = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&transitions);
    let breaker = Arc::new(
        CircuitBreaker::new(CircuitBreakerConfig::builder().failure_threshold(5).build().unwrap())
            .unwrap()
            .with_listener(Arc::new(move |_: &StateTransition| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })),
    );

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let breaker = Arc::clone(&breaker);
            tokio::spawn(async move {
                if let Ok(permit) = breaker.allow() {
                    permit.record_failure();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(transitions.load(std::sync::atomic::Ordering::SeqCst), 1);
}
