//! Resilience primitives for outbound calls
//!
//! - **Clock**: time source abstraction (`SystemClock` follows tokio's clock,
//!   `MockClock` is advanced by hand)
//! - **Circuit Breaker**: isolates failing endpoints behind a
//!   `CLOSED`/`OPEN`/`HALF_OPEN` state machine
//! - **Rate Limiter**: token bucket with jittered waits and deadline checks
//! - **Retry Policy**: classification, exponential backoff with jitter,
//!   Retry-After precedence, and giveup decisions
//!
//! Each primitive is generic and knows nothing about HTTP or endpoints. The
//! access layer in `scifetch-core` holds one breaker and one bucket per
//! endpoint and drives the retry policy from its own loop.

pub mod circuit_breaker;
pub mod clock;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerMetrics,
    CircuitPermit, CircuitRejected, CircuitState, StateTransition, TransitionListener,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::{AcquireError, RateLimitConfig, RateLimiterMetrics, TokenBucket};
pub use retry::{
    classify_http_status, GiveUpReason, RetryClass, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryPolicy, RetrySignal,
};
