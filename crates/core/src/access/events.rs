//! Structured access events
//!
//! The executor reports what it does as [`AccessEvent`] values: one per
//! network attempt, one per admission rejection, one per circuit transition
//! and one terminal event per `execute` call. Rendering is left to the sink.

use std::time::Duration;

use scifetch_common::resilience::CircuitState;
use scifetch_domain::EndpointKey;
use serde::Serialize;
use uuid::Uuid;

use super::ports::AccessEventSink;

/// Severity attached to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// Served from the response cache; no admission and no network call
    CacheHit,
    AttemptSucceeded {
        status: u16,
    },
    AttemptFailed {
        outcome: &'static str,
        status: Option<u16>,
        retry_after_ms: Option<u64>,
        /// Wait before the next attempt; `None` when no retry follows
        delay_ms: Option<u64>,
    },
    CircuitRejected {
        retry_after_ms: Option<u64>,
    },
    RateLimitTimeout {
        required_wait_ms: u64,
    },
    CircuitTransition {
        from: CircuitState,
        to: CircuitState,
    },
    /// Terminal outcome of an `execute` call: `success`, `cache`, `fallback`
    /// or an error kind
    Completed {
        outcome: &'static str,
    },
}

impl EventKind {
    /// Stable event name for log fields
    pub fn name(&self) -> &'static str {
        match self {
            Self::CacheHit => "cache_hit",
            Self::AttemptSucceeded { .. } => "attempt_succeeded",
            Self::AttemptFailed { .. } => "attempt_failed",
            Self::CircuitRejected { .. } => "circuit_rejected",
            Self::RateLimitTimeout { .. } => "rate_limit_timeout",
            Self::CircuitTransition { .. } => "circuit_transition",
            Self::Completed { .. } => "completed",
        }
    }

    /// Whether this event records a network attempt
    pub fn is_attempt(&self) -> bool {
        matches!(self, Self::AttemptSucceeded { .. } | Self::AttemptFailed { .. })
    }
}

/// One structured event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessEvent {
    /// Identifies the `execute` call; `None` for circuit transitions, which
    /// belong to the endpoint rather than to one request
    pub request_id: Option<Uuid>,
    pub source: String,
    pub endpoint: String,
    /// 1-based attempt number; 0 when no attempt was made
    pub attempt: u32,
    pub duration_ms: u64,
    pub level: EventLevel,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl AccessEvent {
    pub fn new(endpoint: &EndpointKey, level: EventLevel, kind: EventKind) -> Self {
        Self {
            request_id: None,
            source: endpoint.source().to_string(),
            endpoint: endpoint.to_string(),
            attempt: 0,
            duration_ms: 0,
            level,
            kind,
        }
    }

    pub fn for_request(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn took(mut self, duration: Duration) -> Self {
        self.duration_ms = millis(duration);
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl AccessEventSink for NoopEventSink {
    fn emit(&self, _event: &AccessEvent) {}
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
