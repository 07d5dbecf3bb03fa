//! Error types used throughout the access layer

use std::time::Duration;

use scifetch_common::{CommonError, ErrorClassification, ErrorSeverity};
use thiserror::Error;

use crate::types::EndpointKey;

/// Terminal failure of one `execute` call
///
/// Every variant names the endpoint and the number of network attempts made,
/// so failures can be attributed without the surrounding logs. Transient
/// outcomes never surface here directly; they are retried or folded into one
/// of these variants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    /// The endpoint's breaker rejected the call before any network attempt
    #[error("circuit open for {endpoint} after {attempts} attempt(s)")]
    CircuitOpen { endpoint: EndpointKey, attempts: u32, retry_after: Option<Duration> },

    /// Waiting for a rate-limit token would cross the deadline
    #[error("rate limit wait of {required_wait:?} for {endpoint} exceeds the deadline after {attempts} attempt(s)")]
    RateLimitTimeout { endpoint: EndpointKey, attempts: u32, required_wait: Duration },

    /// Retryable failures persisted until the attempt budget ran out
    #[error("retries exhausted for {endpoint} after {attempts} attempt(s)")]
    RetryExhausted { endpoint: EndpointKey, attempts: u32, last_status: Option<u16> },

    /// A non-retryable status (4xx other than 429)
    #[error("permanent failure from {endpoint}: HTTP {status} after {attempts} attempt(s)")]
    PermanentRequest { endpoint: EndpointKey, attempts: u32, status: u16 },

    /// The caller's deadline passed at a suspension point
    #[error("deadline exceeded for {endpoint} after {attempts} attempt(s)")]
    DeadlineExceeded { endpoint: EndpointKey, attempts: u32 },

    /// The request could not be issued at all
    #[error("invalid request for {endpoint}: {message}")]
    InvalidRequest { endpoint: EndpointKey, attempts: u32, message: String },
}

impl AccessError {
    pub fn endpoint(&self) -> &EndpointKey {
        match self {
            Self::CircuitOpen { endpoint, .. }
            | Self::RateLimitTimeout { endpoint, .. }
            | Self::RetryExhausted { endpoint, .. }
            | Self::PermanentRequest { endpoint, .. }
            | Self::DeadlineExceeded { endpoint, .. }
            | Self::InvalidRequest { endpoint, .. } => endpoint,
        }
    }

    /// Network attempts made before the failure
    pub fn attempts(&self) -> u32 {
        match self {
            Self::CircuitOpen { attempts, .. }
            | Self::RateLimitTimeout { attempts, .. }
            | Self::RetryExhausted { attempts, .. }
            | Self::PermanentRequest { attempts, .. }
            | Self::DeadlineExceeded { attempts, .. }
            | Self::InvalidRequest { attempts, .. } => *attempts,
        }
    }

    /// Stable name for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CircuitOpen { .. } => "circuit_open",
            Self::RateLimitTimeout { .. } => "rate_limit_timeout",
            Self::RetryExhausted { .. } => "retry_exhausted",
            Self::PermanentRequest { .. } => "permanent_request",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::InvalidRequest { .. } => "invalid_request",
        }
    }
}

impl ErrorClassification for AccessError {
    /// Whether the caller could reasonably try again later
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::PermanentRequest { .. } | Self::InvalidRequest { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CircuitOpen { .. }
            | Self::RateLimitTimeout { .. }
            | Self::DeadlineExceeded { .. } => ErrorSeverity::Warning,
            Self::RetryExhausted { .. }
            | Self::PermanentRequest { .. }
            | Self::InvalidRequest { .. } => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CircuitOpen { retry_after, .. } => *retry_after,
            Self::RateLimitTimeout { required_wait, .. } => Some(*required_wait),
            _ => None,
        }
    }
}

/// General error type for loaders, adapters and transports
#[derive(Error, Debug)]
pub enum ScifetchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl From<serde_json::Error> for ScifetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<url::ParseError> for ScifetchError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidInput(format!("invalid URL: {err}"))
    }
}

/// Result type alias for scifetch operations
pub type Result<T> = std::result::Result<T, ScifetchError>;
