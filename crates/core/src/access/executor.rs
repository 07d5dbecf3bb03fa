//! Request executor
//!
//! Runs one logical request through the endpoint's resilience state:
//!
//! 1. Idempotent requests consult the response cache; a hit returns at once.
//! 2. The circuit breaker admits or rejects the attempt.
//! 3. The rate limiter grants a token or fails when the wait would cross the
//!    deadline.
//! 4. The transport makes one attempt under a per-attempt timeout, truncated
//!    to the time left before the deadline.
//! 5. The retry policy classifies the outcome and either schedules another
//!    pass from step 2 or ends the loop.
//!
//! Every failed attempt is recorded with the breaker. Exhausted retries turn
//! into a fallback record when both the request and the endpoint policy allow
//! it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use scifetch_common::resilience::{
    AcquireError, Clock, GiveUpReason, RetryDecision, RetrySignal, SystemClock,
};
use scifetch_common::{CommonResult, ErrorClassification, ErrorSeverity};
use scifetch_domain::{
    AccessConfig, AccessError, EndpointKey, FallbackReason, FallbackRecord, Outcome,
    RequestDescriptor, Response,
};
use tracing::debug;
use uuid::Uuid;

use super::events::{millis, AccessEvent, EventKind, EventLevel};
use super::fallback::FallbackManager;
use super::ports::{AccessEventSink, Transport};
use super::registry::{EndpointRegistry, EndpointState};

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOrigin {
    Network { attempts: u32 },
    Cache,
}

/// Successful result of [`RequestExecutor::execute`]
#[derive(Debug, Clone)]
pub enum Fetched {
    Response { response: Arc<Response>, origin: ResponseOrigin },
    /// Substituted for exhausted retries
    Fallback { record: FallbackRecord, attempts: u32 },
}

impl Fetched {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Response { response, .. } => Some(response),
            Self::Fallback { .. } => None,
        }
    }

    pub fn fallback(&self) -> Option<&FallbackRecord> {
        match self {
            Self::Fallback { record, .. } => Some(record),
            Self::Response { .. } => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Response { origin: ResponseOrigin::Cache, .. })
    }

    /// Network attempts made; 0 for a cache hit
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Response { origin: ResponseOrigin::Network { attempts }, .. }
            | Self::Fallback { attempts, .. } => *attempts,
            Self::Response { origin: ResponseOrigin::Cache, .. } => 0,
        }
    }
}

/// One in-flight `execute` call
struct Call<'a> {
    id: Uuid,
    request: &'a RequestDescriptor,
    started: Instant,
}

/// Executes requests against per-endpoint limiter, breaker, cache and retry
/// policy
///
/// Construct once and share by `Arc`; every method takes `&self`.
pub struct RequestExecutor<C: Clock = SystemClock> {
    registry: EndpointRegistry<C>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn AccessEventSink>,
    fallback: FallbackManager,
    clock: C,
}

impl RequestExecutor<SystemClock> {
    pub fn new(
        config: AccessConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn AccessEventSink>,
    ) -> CommonResult<Self> {
        Self::with_clock(config, transport, sink, SystemClock)
    }
}

impl<C: Clock + Clone> RequestExecutor<C> {
    /// Create an executor with a custom clock
    ///
    /// Waits use tokio's timer, so the clock should follow tokio time.
    pub fn with_clock(
        config: AccessConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn AccessEventSink>,
        clock: C,
    ) -> CommonResult<Self> {
        let registry = EndpointRegistry::new(config, Arc::clone(&sink), clock.clone())?;
        Ok(Self { registry, transport, sink, fallback: FallbackManager::new(), clock })
    }

    pub fn registry(&self) -> &EndpointRegistry<C> {
        &self.registry
    }

    /// State of an endpoint that has been used
    pub fn endpoint_state(&self, key: &EndpointKey) -> Option<Arc<EndpointState<C>>> {
        self.registry.get(key)
    }

    /// Execute one logical request
    ///
    /// Returns the response, or a fallback record when retries are exhausted
    /// and fallback is allowed. Every failure names the endpoint and the
    /// number of network attempts made.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Fetched, AccessError> {
        let call = Call { id: Uuid::new_v4(), request, started: self.clock.now() };
        let result = self.run(&call).await;
        self.emit_completion(&call, &result);
        result
    }

    async fn run(&self, call: &Call<'_>) -> Result<Fetched, AccessError> {
        let request = call.request;
        let endpoint = request.endpoint();
        let state = self.registry.get_or_create(endpoint).map_err(|err| {
            AccessError::InvalidRequest {
                endpoint: endpoint.clone(),
                attempts: 0,
                message: err.to_string(),
            }
        })?;
        let policy = state.policy();
        let deadline = match request.deadline() {
            Some(deadline) => deadline.resolve(call.started),
            None => call.started.checked_add(policy.default_deadline).unwrap_or(call.started),
        };

        let signature =
            (request.is_cacheable() && state.cache().is_enabled()).then(|| request.signature());
        if let Some(signature) = &signature {
            if let Some(response) = state.cache().lookup(signature) {
                self.emit(call, 0, Duration::ZERO, EventLevel::Debug, EventKind::CacheHit);
                return Ok(Fetched::Response { response, origin: ResponseOrigin::Cache });
            }
        }

        let mut attempts = 0u32;
        loop {
            if self.clock.now() >= deadline {
                return Err(AccessError::DeadlineExceeded { endpoint: endpoint.clone(), attempts });
            }

            let permit = match state.breaker().allow() {
                Ok(permit) => permit,
                Err(rejected) => {
                    self.emit(
                        call,
                        attempts,
                        Duration::ZERO,
                        EventLevel::Warn,
                        EventKind::CircuitRejected { retry_after_ms: rejected.retry_after.map(millis) },
                    );
                    return Err(AccessError::CircuitOpen {
                        endpoint: endpoint.clone(),
                        attempts,
                        retry_after: rejected.retry_after,
                    });
                }
            };

            if let Err(err) = state.limiter().acquire(request.cost(), deadline).await {
                return Err(match err {
                    AcquireError::CostExceedsCapacity { cost, capacity } => {
                        AccessError::InvalidRequest {
                            endpoint: endpoint.clone(),
                            attempts,
                            message: format!(
                                "request cost {cost} exceeds rate limit capacity {capacity}"
                            ),
                        }
                    }
                    AcquireError::Timeout { required_wait, .. }
                    | AcquireError::WouldBlock { required_wait, .. } => {
                        self.emit(
                            call,
                            attempts,
                            Duration::ZERO,
                            EventLevel::Warn,
                            EventKind::RateLimitTimeout { required_wait_ms: millis(required_wait) },
                        );
                        AccessError::RateLimitTimeout {
                            endpoint: endpoint.clone(),
                            attempts,
                            required_wait,
                        }
                    }
                });
            }

            let remaining = deadline.saturating_duration_since(self.clock.now());
            if remaining.is_zero() {
                return Err(AccessError::DeadlineExceeded { endpoint: endpoint.clone(), attempts });
            }
            let budget = policy.attempt_timeout.min(remaining);
            let truncated = budget < policy.attempt_timeout;

            let attempt_started = self.clock.now();
            let outcome =
                match tokio::time::timeout(budget, self.transport.send(request, budget)).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(err)) => {
                        return Err(AccessError::InvalidRequest {
                            endpoint: endpoint.clone(),
                            attempts,
                            message: err.to_string(),
                        });
                    }
                    Err(_) => Outcome::TimeoutFailure,
                };
            attempts += 1;
            let took = self.clock.now().saturating_duration_since(attempt_started);

            // A timeout caused by the caller's deadline says nothing about the
            // endpoint, so the permit is dropped unreported.
            if truncated && outcome == Outcome::TimeoutFailure {
                drop(permit);
                self.emit_failure(call, attempts, took, &outcome, None);
                return Err(AccessError::DeadlineExceeded { endpoint: endpoint.clone(), attempts });
            }

            let outcome = match outcome {
                Outcome::Success(response) => {
                    permit.record_success();
                    self.emit(
                        call,
                        attempts,
                        took,
                        EventLevel::Info,
                        EventKind::AttemptSucceeded { status: response.status },
                    );
                    let response = Arc::new(response);
                    if let Some(signature) = &signature {
                        state.cache().store(signature.clone(), Arc::clone(&response));
                    }
                    return Ok(Fetched::Response {
                        response,
                        origin: ResponseOrigin::Network { attempts },
                    });
                }
                failure => failure,
            };

            permit.record_failure();
            match state.retry().decide(attempts, &outcome) {
                RetryDecision::RetryAfter(delay) => {
                    let resume = self.clock.now().checked_add(delay);
                    if resume.map_or(true, |resume| resume > deadline) {
                        self.emit_failure(call, attempts, took, &outcome, None);
                        return Err(AccessError::DeadlineExceeded {
                            endpoint: endpoint.clone(),
                            attempts,
                        });
                    }
                    self.emit_failure(call, attempts, took, &outcome, Some(delay));
                    debug!(
                        endpoint = %endpoint,
                        attempt = attempts,
                        delay_ms = millis(delay),
                        "retry_scheduled"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp(GiveUpReason::Permanent) => {
                    self.emit_failure(call, attempts, took, &outcome, None);
                    return Err(AccessError::PermanentRequest {
                        endpoint: endpoint.clone(),
                        attempts,
                        status: outcome.status().unwrap_or_default(),
                    });
                }
                RetryDecision::GiveUp(GiveUpReason::AttemptsExhausted) => {
                    self.emit_failure(call, attempts, took, &outcome, None);
                    if request.allow_fallback() && policy.fallback.enabled {
                        let business_key = request
                            .business_key()
                            .map(str::to_owned)
                            .unwrap_or_else(|| request.signature());
                        let record = self.fallback.build(
                            endpoint,
                            &business_key,
                            &FallbackReason::RetriesExhausted,
                        );
                        return Ok(Fetched::Fallback { record, attempts });
                    }
                    return Err(AccessError::RetryExhausted {
                        endpoint: endpoint.clone(),
                        attempts,
                        last_status: outcome.status(),
                    });
                }
            }
        }
    }

    fn emit(&self, call: &Call<'_>, attempt: u32, took: Duration, level: EventLevel, kind: EventKind) {
        let event = AccessEvent::new(call.request.endpoint(), level, kind)
            .for_request(call.id)
            .attempt(attempt)
            .took(took);
        self.sink.emit(&event);
    }

    fn emit_failure(
        &self,
        call: &Call<'_>,
        attempt: u32,
        took: Duration,
        outcome: &Outcome,
        delay: Option<Duration>,
    ) {
        self.emit(
            call,
            attempt,
            took,
            EventLevel::Warn,
            EventKind::AttemptFailed {
                outcome: outcome.kind(),
                status: outcome.status(),
                retry_after_ms: outcome.retry_after().map(millis),
                delay_ms: delay.map(millis),
            },
        );
    }

    fn emit_completion(&self, call: &Call<'_>, result: &Result<Fetched, AccessError>) {
        let took = self.clock.now().saturating_duration_since(call.started);
        let (level, outcome, attempts) = match result {
            Ok(fetched) => {
                let (level, outcome) = match fetched {
                    Fetched::Response { origin: ResponseOrigin::Cache, .. } => {
                        (EventLevel::Debug, "cache")
                    }
                    Fetched::Response { .. } => (EventLevel::Info, "success"),
                    Fetched::Fallback { .. } => (EventLevel::Warn, "fallback"),
                };
                (level, outcome, fetched.attempts())
            }
            Err(err) => (severity_level(err.severity()), err.kind(), err.attempts()),
        };
        self.emit(call, attempts, took, level, EventKind::Completed { outcome });
    }

    /// Execute independent requests with at most `concurrency` in flight
    ///
    /// Each request runs as its own task; results come back in input order.
    pub async fn execute_all(
        self: &Arc<Self>,
        requests: Vec<RequestDescriptor>,
        concurrency: usize,
    ) -> Vec<Result<Fetched, AccessError>> {
        let tasks = requests.into_iter().map(|request| {
            let executor = Arc::clone(self);
            let endpoint = request.endpoint().clone();
            async move {
                let handle = tokio::spawn(async move { executor.execute(&request).await });
                match handle.await {
                    Ok(result) => result,
                    Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                    // Only happens when the runtime shuts down under us
                    Err(_) => Err(AccessError::DeadlineExceeded { endpoint, attempts: 0 }),
                }
            }
        });

        stream::iter(tasks).buffered(concurrency.max(1)).collect().await
    }
}

fn severity_level(severity: ErrorSeverity) -> EventLevel {
    match severity {
        ErrorSeverity::Info => EventLevel::Info,
        ErrorSeverity::Warning => EventLevel::Warn,
        ErrorSeverity::Error | ErrorSeverity::Critical => EventLevel::Error,
    }
}
