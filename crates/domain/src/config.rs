//! Access-layer configuration
//!
//! One [`EndpointPolicy`] per data source, with a `defaults` policy for
//! sources that are not listed. Every section has defaults, so a file only
//! needs the keys it changes. Durations use `*_ms` keys.
//!
//! ```toml
//! [defaults.retry]
//! max_attempts = 4
//! base_delay_ms = 250
//!
//! [sources.chembl.rate_limit]
//! max_calls = 5
//! period_ms = 1000
//!
//! [sources.chembl.cache]
//! enabled = true
//! ttl_ms = 60000
//! ```
//!
//! A listed source gets its own complete policy: unspecified sections take
//! the built-in defaults, not the `defaults` table.

use std::collections::BTreeMap;
use std::time::Duration;

use scifetch_common::cache::CacheConfig;
use scifetch_common::duration_millis;
use scifetch_common::resilience::{CircuitBreakerConfig, RateLimitConfig, RetryConfig};
use scifetch_common::{CommonError, CommonResult};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ATTEMPT_TIMEOUT_MS, DEFAULT_DEADLINE_MS};
use crate::types::EndpointKey;

/// Fallback switch for an endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
}

/// Resilience policy applied to one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPolicy {
    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub fallback: FallbackConfig,

    /// Upper bound on a single network attempt
    #[serde(rename = "attempt_timeout_ms", with = "duration_millis")]
    pub attempt_timeout: Duration,

    /// Deadline applied to requests that carry none
    #[serde(rename = "default_deadline_ms", with = "duration_millis")]
    pub default_deadline: Duration,
}

impl Default for EndpointPolicy {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            fallback: FallbackConfig::default(),
            attempt_timeout: Duration::from_millis(DEFAULT_ATTEMPT_TIMEOUT_MS),
            default_deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
        }
    }
}

impl EndpointPolicy {
    pub fn validate(&self) -> CommonResult<()> {
        self.rate_limit.validate()?;
        self.circuit_breaker.validate()?;
        self.retry.validate()?;
        self.cache.validate()?;
        if self.attempt_timeout.is_zero() {
            return Err(CommonError::config_field("attempt_timeout_ms", "must be greater than 0"));
        }
        if self.default_deadline.is_zero() {
            return Err(CommonError::config_field("default_deadline_ms", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Complete access-layer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub defaults: EndpointPolicy,
    /// Per-source overrides keyed by [`EndpointKey::source`]
    pub sources: BTreeMap<String, EndpointPolicy>,
}

impl AccessConfig {
    /// Policy governing `key`: its source's entry, else the defaults
    pub fn policy_for(&self, key: &EndpointKey) -> &EndpointPolicy {
        self.sources.get(key.source()).unwrap_or(&self.defaults)
    }

    pub fn with_source(mut self, source: impl Into<String>, policy: EndpointPolicy) -> Self {
        self.sources.insert(source.into(), policy);
        self
    }

    /// Validate every policy; field paths are prefixed with their table
    pub fn validate(&self) -> CommonResult<()> {
        self.defaults.validate().map_err(|e| scoped(e, "defaults"))?;
        for (source, policy) in &self.sources {
            policy.validate().map_err(|e| scoped(e, &format!("sources.{source}")))?;
        }
        Ok(())
    }
}

fn scoped(error: CommonError, prefix: &str) -> CommonError {
    match error {
        CommonError::Config { message, field: Some(field) } => {
            CommonError::config_field(format!("{prefix}.{field}"), message)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates that a partial TOML document fills in defaults.
    ///
    /// Assertions:
    /// - Confirms overridden keys are applied.
    /// - Confirms untouched sections keep their defaults.
    /// - Confirms `policy_for` picks the source entry or the defaults.
    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AccessConfig = toml::from_str(
            r#"
            [defaults.retry]
            max_attempts = 4

            [sources.chembl.rate_limit]
            max_calls = 5
            period_ms = 2000

            [sources.chembl.cache]
            enabled = true
            ttl_ms = 60000
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.defaults.retry.max_attempts, 4);
        assert_eq!(config.defaults.retry.base_delay, Duration::from_millis(500));

        let chembl = config.policy_for(&EndpointKey::new("chembl", "www.ebi.ac.uk", "/x"));
        assert_eq!(chembl.rate_limit.max_calls, 5);
        assert_eq!(chembl.rate_limit.period, Duration::from_secs(2));
        assert!(chembl.cache.enabled);
        assert_eq!(chembl.retry.max_attempts, 3);

        let other = config.policy_for(&EndpointKey::new("pubchem", "h", "/y"));
        assert_eq!(other, &config.defaults);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_reports_scoped_field() {
        let mut policy = EndpointPolicy::default();
        policy.retry.max_attempts = 0;
        let config = AccessConfig::default().with_source("uniprot", policy);

        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            CommonError::config_field("sources.uniprot.retry.max_attempts", "must be greater than 0")
        );
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let policy = EndpointPolicy { attempt_timeout: Duration::ZERO, ..EndpointPolicy::default() };
        assert!(policy.validate().is_err());
    }
}
