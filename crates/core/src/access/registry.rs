//! Per-endpoint resilience state
//!
//! The registry replaces process-wide client singletons: it is an explicit
//! value owned by the executor that maps each [`EndpointKey`] to its own
//! limiter, breaker, cache and retry policy. Distinct keys never share a
//! lock, so contention on one endpoint does not slow down another.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use scifetch_common::cache::TtlCache;
use scifetch_common::resilience::{
    CircuitBreaker, CircuitState, Clock, RetryPolicy, StateTransition, SystemClock, TokenBucket,
};
use scifetch_common::CommonResult;
use scifetch_domain::{AccessConfig, EndpointKey, EndpointPolicy, Response};
use tracing::debug;

use super::events::{AccessEvent, EventKind, EventLevel};
use super::ports::AccessEventSink;

/// Cache keyed by request signature
pub type ResponseCache<C> = TtlCache<String, Response, C>;

/// Everything the executor needs for one endpoint
pub struct EndpointState<C: Clock = SystemClock> {
    key: EndpointKey,
    policy: EndpointPolicy,
    limiter: TokenBucket<C>,
    breaker: CircuitBreaker<C>,
    cache: ResponseCache<C>,
    retry: RetryPolicy,
}

impl<C: Clock> fmt::Debug for EndpointState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointState")
            .field("key", &self.key)
            .field("breaker", &self.breaker)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl<C: Clock + Clone> EndpointState<C> {
    fn build(
        key: &EndpointKey,
        policy: &EndpointPolicy,
        sink: Arc<dyn AccessEventSink>,
        clock: C,
    ) -> CommonResult<Self> {
        let listener_key = key.clone();
        let breaker = CircuitBreaker::with_clock(policy.circuit_breaker.clone(), clock.clone())?
            .named(key.to_string())
            .with_listener(Arc::new(move |transition: &StateTransition| {
                let level = match transition.to {
                    CircuitState::Open => EventLevel::Warn,
                    _ => EventLevel::Info,
                };
                sink.emit(&AccessEvent::new(
                    &listener_key,
                    level,
                    EventKind::CircuitTransition { from: transition.from, to: transition.to },
                ));
            }));

        Ok(Self {
            key: key.clone(),
            policy: policy.clone(),
            limiter: TokenBucket::with_clock(policy.rate_limit.clone(), clock.clone())?,
            breaker,
            cache: TtlCache::with_clock(policy.cache.clone(), clock),
            retry: RetryPolicy::new(policy.retry.clone())?,
        })
    }
}

impl<C: Clock> EndpointState<C> {
    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    pub fn policy(&self) -> &EndpointPolicy {
        &self.policy
    }

    pub fn limiter(&self) -> &TokenBucket<C> {
        &self.limiter
    }

    pub fn breaker(&self) -> &CircuitBreaker<C> {
        &self.breaker
    }

    pub fn cache(&self) -> &ResponseCache<C> {
        &self.cache
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Lazily populated map from endpoint to its state
pub struct EndpointRegistry<C: Clock = SystemClock> {
    config: AccessConfig,
    states: DashMap<EndpointKey, Arc<EndpointState<C>>>,
    sink: Arc<dyn AccessEventSink>,
    clock: C,
}

impl<C: Clock> fmt::Debug for EndpointRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRegistry").field("endpoints", &self.states.len()).finish()
    }
}

impl<C: Clock + Clone> EndpointRegistry<C> {
    /// Validate `config` and create an empty registry
    pub fn new(config: AccessConfig, sink: Arc<dyn AccessEventSink>, clock: C) -> CommonResult<Self> {
        config.validate()?;
        Ok(Self { config, states: DashMap::new(), sink, clock })
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// State for `key`, created from its source's policy on first use
    ///
    /// Concurrent first calls may each build a state; only one is kept and
    /// every caller receives that one.
    pub fn get_or_create(&self, key: &EndpointKey) -> CommonResult<Arc<EndpointState<C>>> {
        if let Some(state) = self.states.get(key) {
            return Ok(Arc::clone(state.value()));
        }

        let policy = self.config.policy_for(key);
        let state = Arc::new(EndpointState::build(
            key,
            policy,
            Arc::clone(&self.sink),
            self.clock.clone(),
        )?);
        debug!(endpoint = %key, "endpoint_state_created");

        let entry = self.states.entry(key.clone()).or_insert(state);
        Ok(Arc::clone(entry.value()))
    }

    /// State for `key` if it has been used
    pub fn get(&self, key: &EndpointKey) -> Option<Arc<EndpointState<C>>> {
        self.states.get(key).map(|state| Arc::clone(state.value()))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Endpoints whose breaker is not `CLOSED`
    pub fn degraded(&self) -> Vec<EndpointKey> {
        self.states
            .iter()
            .filter(|entry| entry.value().breaker.state() != CircuitState::Closed)
            .map(|entry| entry.key().clone())
            .collect()
    }
}
