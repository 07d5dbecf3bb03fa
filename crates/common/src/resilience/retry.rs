//! Retry policy: outcome classification, backoff and giveup decisions
//!
//! The policy is a plain value consulted by the caller's own loop; it does not
//! run operations itself. After attempt `n` fails the caller asks
//! [`RetryPolicy::decide`], which either gives up or returns the delay to
//! apply before attempt `n + 1`:
//!
//! - a permanent failure gives up immediately;
//! - reaching `max_attempts` gives up regardless of classification;
//! - a `retry_after` hint on the failure is used verbatim;
//! - otherwise the delay is `min(max_delay, base_delay * multiplier^(n-1))`
//!   plus a uniform jitter in `[0, jitter_fraction * delay]`.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};
use crate::utils::serde::duration_millis;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Hard bound on attempts, including the first one
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "duration_millis")]
    pub base_delay: Duration,
    pub multiplier: f64,
    #[serde(rename = "max_delay_ms", with = "duration_millis")]
    pub max_delay: Duration,
    /// Jitter upper bound as a fraction of the computed delay
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter_fraction: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    pub fn validate(&self) -> CommonResult<()> {
        if self.max_attempts == 0 {
            return Err(CommonError::config_field("retry.max_attempts", "must be greater than 0"));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CommonError::config_field(
                "retry.multiplier",
                "must be a finite number >= 1.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_fraction) {
            return Err(CommonError::config_field(
                "retry.jitter_fraction",
                "must be within [0.0, 1.0]",
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(CommonError::config_field(
                "retry.max_delay_ms",
                "must not be smaller than base_delay_ms",
            ));
        }
        Ok(())
    }
}

/// Builder for RetryConfig
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.multiplier = multiplier;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn jitter_fraction(mut self, fraction: f64) -> Self {
        self.config.jitter_fraction = fraction;
        self
    }

    pub fn build(self) -> CommonResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Permanent,
}

/// Anything the policy can classify
pub trait RetrySignal {
    fn retry_class(&self) -> RetryClass;

    /// Server-provided delay hint, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Why the policy stopped retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    Permanent,
    AttemptsExhausted,
}

/// Outcome of [`RetryPolicy::decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then attempt again
    RetryAfter(Duration),
    GiveUp(GiveUpReason),
}

/// Classify an HTTP status code
///
/// 429 and 5xx are retryable; every other status is permanent.
pub fn classify_http_status(status: u16) -> RetryClass {
    match status {
        429 | 500..=599 => RetryClass::Retryable,
        _ => RetryClass::Permanent,
    }
}

/// Retry policy built from a validated [`RetryConfig`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> CommonResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    pub fn classify<S: RetrySignal + ?Sized>(&self, signal: &S) -> RetryClass {
        signal.retry_class()
    }

    /// Computed backoff before the attempt following `attempt`, no jitter
    ///
    /// Non-decreasing in `attempt` and capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.config.base_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        let capped = secs.min(self.config.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.config.max_delay)
    }

    /// Delay before the attempt following `attempt`
    pub fn next_delay<S: RetrySignal + ?Sized>(&self, attempt: u32, signal: &S) -> Duration {
        if let Some(hint) = signal.retry_after() {
            return hint;
        }
        let delay = self.backoff_delay(attempt);
        delay + self.jitter(delay)
    }

    /// Decide what happens after `attempt` (1-based) failed with `signal`
    pub fn decide<S: RetrySignal + ?Sized>(&self, attempt: u32, signal: &S) -> RetryDecision {
        if self.classify(signal) == RetryClass::Permanent {
            return RetryDecision::GiveUp(GiveUpReason::Permanent);
        }
        if attempt >= self.config.max_attempts {
            return RetryDecision::GiveUp(GiveUpReason::AttemptsExhausted);
        }
        RetryDecision::RetryAfter(self.next_delay(attempt, signal))
    }

    fn jitter(&self, delay: Duration) -> Duration {
        let bound = delay.as_secs_f64() * self.config.jitter_fraction;
        if bound <= 0.0 {
            return Duration::ZERO;
        }
        let secs = rand::thread_rng().gen_range(0.0..=bound);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { config: RetryConfig::default() }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the retry policy
    //!
    //! Tests cover configuration validation, HTTP classification, backoff
    //! growth and capping, jitter bounds, Retry-After precedence, and the
    //! giveup rules.

    use super::*;

    #[derive(Debug)]
    struct Failure {
        class: RetryClass,
        hint: Option<Duration>,
    }

    impl RetrySignal for Failure {
        fn retry_class(&self) -> RetryClass {
            self.class
        }

        fn retry_after(&self) -> Option<Duration> {
            self.hint
        }
    }

    const TRANSIENT: Failure = Failure { class: RetryClass::Retryable, hint: None };
    const PERMANENT: Failure = Failure { class: RetryClass::Permanent, hint: None };

    fn policy(jitter_fraction: f64) -> RetryPolicy {
        let config = RetryConfig::builder()
            .max_attempts(5)
            .base_delay(Duration::from_millis(100))
            .multiplier(2.0)
            .max_delay(Duration::from_millis(1000))
            .jitter_fraction(jitter_fraction)
            .build()
            .expect("valid config");
        RetryPolicy::new(config).expect("valid policy")
    }

    /// Validates `RetryConfig::validate` across invalid fields.
    ///
    /// Assertions:
    /// - Ensures zero attempts, sub-unit or NaN multipliers, out-of-range
    ///   jitter and inverted delays are rejected.
    #[test]
    fn test_config_validation() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::builder().max_attempts(0).build().is_err());
        assert!(RetryConfig::builder().multiplier(0.5).build().is_err());
        assert!(RetryConfig::builder().multiplier(f64::NAN).build().is_err());
        assert!(RetryConfig::builder().jitter_fraction(1.5).build().is_err());
        assert!(RetryConfig::builder().jitter_fraction(f64::NAN).build().is_err());
        assert!(RetryConfig::builder()
            .base_delay(Duration::from_secs(10))
            .max_delay(Duration::from_secs(1))
            .build()
            .is_err());
    }

    #[test]
    fn test_classify_http_status() {
        assert_eq!(classify_http_status(429), RetryClass::Retryable);
        assert_eq!(classify_http_status(500), RetryClass::Retryable);
        assert_eq!(classify_http_status(503), RetryClass::Retryable);
        assert_eq!(classify_http_status(400), RetryClass::Permanent);
        assert_eq!(classify_http_status(404), RetryClass::Permanent);
    }

    /// Validates exponential growth and the `max_delay` cap.
    ///
    /// Assertions:
    /// - Confirms delays 100, 200, 400, 800, 1000, 1000 ms.
    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = policy(0.0);
        let delays: Vec<u128> = (1..=6).map(|n| policy.backoff_delay(n).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_backoff_monotonic_without_hint() {
        let policy = policy(0.0);
        for attempt in 1..40 {
            assert!(
                policy.next_delay(attempt + 1, &TRANSIENT) >= policy.next_delay(attempt, &TRANSIENT)
            );
        }
    }

    /// Validates that jitter stays within `[0, jitter_fraction * delay]`.
    ///
    /// Assertions:
    /// - Ensures every sampled delay lies in `[200ms, 250ms]`.
    #[test]
    fn test_jitter_bounded() {
        let policy = policy(0.25);
        for _ in 0..200 {
            let delay = policy.next_delay(2, &TRANSIENT);
            assert!(delay >= Duration::from_millis(200), "{delay:?}");
            assert!(delay <= Duration::from_millis(250), "{delay:?}");
        }
    }

    #[test]
    fn test_retry_after_used_verbatim() {
        let policy = policy(0.5);
        let hinted = Failure { class: RetryClass::Retryable, hint: Some(Duration::from_secs(7)) };
        assert_eq!(policy.next_delay(1, &hinted), Duration::from_secs(7));
        assert_eq!(policy.decide(1, &hinted), RetryDecision::RetryAfter(Duration::from_secs(7)));
    }

    /// Validates the giveup rules.
    ///
    /// Assertions:
    /// - Confirms permanent failures give up on the first attempt.
    /// - Confirms retryable failures give up once `max_attempts` is reached.
    #[test]
    fn test_decide_giveup_rules() {
        let policy = policy(0.0);

        assert_eq!(policy.decide(1, &PERMANENT), RetryDecision::GiveUp(GiveUpReason::Permanent));
        assert_eq!(
            policy.decide(4, &TRANSIENT),
            RetryDecision::RetryAfter(Duration::from_millis(800))
        );
        assert_eq!(
            policy.decide(5, &TRANSIENT),
            RetryDecision::GiveUp(GiveUpReason::AttemptsExhausted)
        );
    }
}
