//! Network responses and per-attempt outcomes

use std::time::Duration;

use chrono::{DateTime, Utc};
use scifetch_common::resilience::{classify_http_status, RetryClass, RetrySignal};
use serde::de::DeserializeOwned;

use crate::constants::RETRY_AFTER_HEADER;
use crate::errors::{Result, ScifetchError};

/// A response as the access layer sees it: status, headers, raw body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value matching `name`, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ScifetchError::Parse(e.to_string()))
    }

    /// Parsed `Retry-After` header, relative to `now`
    pub fn retry_after(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.header(RETRY_AFTER_HEADER).and_then(|value| parse_retry_after(value, now))
    }
}

/// Tagged result of one network attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(Response),
    /// 429, 5xx, or a connection failure (`status: None`)
    TransientFailure { status: Option<u16>, retry_after: Option<Duration> },
    /// 4xx other than 429
    PermanentFailure { status: u16 },
    /// The attempt did not complete within its timeout
    TimeoutFailure,
}

impl Outcome {
    /// Classify a received response
    ///
    /// `now` anchors HTTP-date `Retry-After` values.
    pub fn from_response(response: Response, now: DateTime<Utc>) -> Self {
        if response.is_success() {
            return Self::Success(response);
        }
        match classify_http_status(response.status) {
            RetryClass::Retryable => Self::TransientFailure {
                status: Some(response.status),
                retry_after: response.retry_after(now),
            },
            RetryClass::Permanent => Self::PermanentFailure { status: response.status },
        }
    }

    /// Failure that never produced a response (refused, reset, DNS, ...)
    pub fn connection_failure() -> Self {
        Self::TransientFailure { status: None, retry_after: None }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success(response) => Some(response.status),
            Self::TransientFailure { status, .. } => *status,
            Self::PermanentFailure { status } => Some(*status),
            Self::TimeoutFailure => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Stable name for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::TransientFailure { .. } => "transient_failure",
            Self::PermanentFailure { .. } => "permanent_failure",
            Self::TimeoutFailure => "timeout_failure",
        }
    }
}

impl RetrySignal for Outcome {
    /// A success is never retried, so it classifies as permanent.
    fn retry_class(&self) -> RetryClass {
        match self {
            Self::TransientFailure { .. } | Self::TimeoutFailure => RetryClass::Retryable,
            Self::Success(_) | Self::PermanentFailure { .. } => RetryClass::Permanent,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TransientFailure { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP-date
///
/// Negative deltas and dates in the past clamp to zero. Unparseable values
/// yield `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return Some(Duration::from_secs(u64::try_from(seconds).unwrap_or(0)));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
