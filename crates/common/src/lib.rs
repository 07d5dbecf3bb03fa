//! Modular common utilities shared across scifetch crates.
//!
//! Everything here is domain-free: the resilience primitives know nothing
//! about HTTP, endpoints, or records. The `core` crate composes them into the
//! outbound-access layer.
//!
//! # Feature Tiers
//!
//! - `foundation`: errors and serde helpers
//! - `runtime`: resilience primitives (clock, circuit breaker, token bucket,
//!   retry policy) and the TTL cache

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{
    AcquireError, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitPermit,
    CircuitRejected, CircuitState, Clock, MockClock, RateLimitConfig, RetryClass, RetryConfig,
    RetryDecision, RetryPolicy, RetrySignal, StateTransition, SystemClock, TokenBucket,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
