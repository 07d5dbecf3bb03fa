use scifetch_common::resilience::CircuitState;
use scifetch_core::{AccessEvent, AccessEventSink, EventKind, EventLevel};
use tracing::field::display;

/// `tracing` target used for every access event
pub const ACCESS_TARGET: &str = "scifetch::access";

/// Sink that renders access events through `tracing`
///
/// Each event is logged at its own level under [`ACCESS_TARGET`], with the
/// kind-specific values as structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// Kind-specific values, flattened so every level shares one field set
#[derive(Debug, Default)]
struct Details {
    status: Option<u16>,
    outcome: Option<&'static str>,
    retry_after_ms: Option<u64>,
    delay_ms: Option<u64>,
    required_wait_ms: Option<u64>,
    from: Option<CircuitState>,
    to: Option<CircuitState>,
}

impl From<&EventKind> for Details {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::CacheHit => Self::default(),
            EventKind::AttemptSucceeded { status } => {
                Self { status: Some(*status), ..Self::default() }
            }
            EventKind::AttemptFailed { outcome, status, retry_after_ms, delay_ms } => Self {
                status: *status,
                outcome: Some(*outcome),
                retry_after_ms: *retry_after_ms,
                delay_ms: *delay_ms,
                ..Self::default()
            },
            EventKind::CircuitRejected { retry_after_ms } => {
                Self { retry_after_ms: *retry_after_ms, ..Self::default() }
            }
            EventKind::RateLimitTimeout { required_wait_ms } => {
                Self { required_wait_ms: Some(*required_wait_ms), ..Self::default() }
            }
            EventKind::CircuitTransition { from, to } => {
                Self { from: Some(*from), to: Some(*to), ..Self::default() }
            }
            EventKind::Completed { outcome } => Self { outcome: Some(*outcome), ..Self::default() },
        }
    }
}

// `tracing` needs the level as a constant at each call site.
macro_rules! access_event {
    ($level:expr, $event:expr, $details:expr) => {
        tracing::event!(
            target: ACCESS_TARGET,
            $level,
            event = $event.name(),
            request_id = $event.request_id.map(display),
            source = %$event.source,
            endpoint = %$event.endpoint,
            attempt = $event.attempt,
            duration_ms = $event.duration_ms,
            status = $details.status,
            outcome = $details.outcome,
            retry_after_ms = $details.retry_after_ms,
            delay_ms = $details.delay_ms,
            required_wait_ms = $details.required_wait_ms,
            from = $details.from.map(display),
            to = $details.to.map(display),
            "access_event"
        )
    };
}

impl AccessEventSink for TracingEventSink {
    fn emit(&self, event: &AccessEvent) {
        let details = Details::from(&event.kind);
        match event.level {
            EventLevel::Debug => access_event!(tracing::Level::DEBUG, event, details),
            EventLevel::Info => access_event!(tracing::Level::INFO, event, details),
            EventLevel::Warn => access_event!(tracing::Level::WARN, event, details),
            EventLevel::Error => access_event!(tracing::Level::ERROR, event, details),
        }
    }
}
