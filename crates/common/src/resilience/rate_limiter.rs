//! Token bucket rate limiter with jittered waits
//!
//! The bucket holds up to `max_calls` tokens and refills continuously at
//! `max_calls / period` tokens per second. A caller that finds too few tokens
//! sleeps for the computed shortfall plus a uniform jitter in
//! `[0, jitter_max]`, then competes again. Waiters are not queued, so there is
//! no FIFO ordering, only eventual admission.
//!
//! The token count is kept as `f64` behind a mutex and is never pushed above
//! capacity or below zero.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::error::{CommonError, CommonResult};
use crate::utils::serde::duration_millis;

/// Per-endpoint rate limit: `max_calls` per `period`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Bucket capacity and calls admitted per period
    pub max_calls: u32,
    #[serde(rename = "period_ms", with = "duration_millis")]
    pub period: Duration,
    /// Upper bound of the random delay added to every wait
    #[serde(rename = "jitter_max_ms", with = "duration_millis")]
    pub jitter_max: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: 10,
            period: Duration::from_secs(1),
            jitter_max: Duration::from_millis(100),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self { max_calls, period, jitter_max: Duration::ZERO }
    }

    pub fn with_jitter(mut self, jitter_max: Duration) -> Self {
        self.jitter_max = jitter_max;
        self
    }

    /// Refill rate in tokens per second
    pub fn refill_rate(&self) -> f64 {
        f64::from(self.max_calls) / self.period.as_secs_f64()
    }

    pub fn validate(&self) -> CommonResult<()> {
        if self.max_calls == 0 {
            return Err(CommonError::config_field("rate_limit.max_calls", "must be greater than 0"));
        }
        if self.period.is_zero() {
            return Err(CommonError::config_field("rate_limit.period_ms", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Why an acquisition did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcquireError {
    /// Waiting for the tokens would cross the caller's deadline
    #[error("acquiring {cost} token(s) needs {required_wait:?}, past the deadline")]
    Timeout { cost: u32, required_wait: Duration },

    /// Non-blocking acquisition found too few tokens
    #[error("{cost} token(s) available in {required_wait:?}")]
    WouldBlock { cost: u32, required_wait: Duration },

    /// The request can never be admitted by this bucket
    #[error("cost {cost} exceeds bucket capacity {capacity}")]
    CostExceedsCapacity { cost: u32, capacity: u32 },
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterMetrics {
    pub granted: u64,
    pub waited: u64,
    pub timed_out: u64,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter
///
/// `acquire` sleeps on tokio's timer. Pair it with [`SystemClock`] (which
/// follows tokio's paused clock in tests); a `MockClock` is only suitable for
/// the non-blocking methods.
pub struct TokenBucket<C: Clock = SystemClock> {
    config: RateLimitConfig,
    capacity: f64,
    rate: f64,
    state: Mutex<BucketState>,
    granted: AtomicU64,
    waited: AtomicU64,
    timed_out: AtomicU64,
    clock: C,
}

impl<C: Clock> fmt::Debug for TokenBucket<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBucket")
            .field("config", &self.config)
            .field("tokens", &self.state.lock().tokens)
            .finish()
    }
}

impl TokenBucket<SystemClock> {
    pub fn new(config: RateLimitConfig) -> CommonResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Create a full bucket with a custom clock
    pub fn with_clock(config: RateLimitConfig, clock: C) -> CommonResult<Self> {
        config.validate()?;
        let capacity = f64::from(config.max_calls);
        let rate = config.refill_rate();

        Ok(Self {
            state: Mutex::new(BucketState { tokens: capacity, last_refill: clock.now() }),
            capacity,
            rate,
            config,
            granted: AtomicU64::new(0),
            waited: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            clock,
        })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Take `cost` tokens without waiting
    ///
    /// On shortfall returns [`AcquireError::WouldBlock`] carrying the wait
    /// (without jitter) after which the tokens would be available.
    pub fn try_acquire(&self, cost: u32) -> Result<(), AcquireError> {
        self.check_cost(cost)?;
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);

        let needed = f64::from(cost);
        if state.tokens >= needed {
            state.tokens -= needed;
            self.granted.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let required_wait = self.time_to_refill(needed - state.tokens);
        Err(AcquireError::WouldBlock { cost, required_wait })
    }

    /// Wait until `cost` tokens are taken or fail if that would pass
    /// `deadline`
    ///
    /// Returns the instant the tokens were granted.
    pub async fn acquire(&self, cost: u32, deadline: Instant) -> Result<Instant, AcquireError> {
        let mut slept = false;
        loop {
            let required_wait = match self.try_acquire(cost) {
                Ok(()) => {
                    if slept {
                        self.waited.fetch_add(1, Ordering::Relaxed);
                    }
                    return Ok(self.clock.now());
                }
                Err(AcquireError::WouldBlock { required_wait, .. }) => required_wait,
                Err(other) => return Err(other),
            };

            let wait = required_wait + self.jitter();
            let now = self.clock.now();
            if now.checked_add(wait).map_or(true, |ready| ready > deadline) {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
                debug!(cost, wait_ms = wait.as_millis() as u64, "rate_limit_deadline_exceeded");
                return Err(AcquireError::Timeout { cost, required_wait: wait });
            }

            debug!(cost, wait_ms = wait.as_millis() as u64, "rate_limit_wait");
            tokio::time::sleep(wait).await;
            slept = true;
        }
    }

    /// Tokens currently in the bucket after refilling
    pub fn available_tokens(&self) -> f64 {
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);
        state.tokens
    }

    pub fn metrics(&self) -> RateLimiterMetrics {
        RateLimiterMetrics {
            granted: self.granted.load(Ordering::Relaxed),
            waited: self.waited.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }

    /// Refill the bucket to capacity
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.tokens = self.capacity;
        state.last_refill = now;
    }

    fn check_cost(&self, cost: u32) -> Result<(), AcquireError> {
        if cost > self.config.max_calls {
            return Err(AcquireError::CostExceedsCapacity {
                cost,
                capacity: self.config.max_calls,
            });
        }
        Ok(())
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill);
        if elapsed.is_zero() {
            return;
        }
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.rate).min(self.capacity);
        state.last_refill = now;
    }

    fn time_to_refill(&self, shortfall: f64) -> Duration {
        let nanos = (shortfall / self.rate * 1e9).ceil();
        // `as` saturates for out-of-range floats
        Duration::from_nanos(nanos as u64)
    }

    fn jitter(&self) -> Duration {
        let max = u64::try_from(self.config.jitter_max.as_nanos()).unwrap_or(u64::MAX);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::thread_rng().gen_range(0..=max))
    }
}
