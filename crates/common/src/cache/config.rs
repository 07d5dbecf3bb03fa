//! Response cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};
use crate::utils::serde::duration_millis;

/// Configuration for a [`TtlCache`](super::TtlCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When `false`, lookups always miss and stores are dropped
    pub enabled: bool,

    /// Lifetime of a stored entry
    #[serde(rename = "ttl_ms", with = "duration_millis")]
    pub ttl: Duration,

    /// Entry bound (None = unlimited); the oldest entry is evicted first
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: false, ttl: Duration::from_secs(300), max_entries: Some(1024) }
    }
}

impl CacheConfig {
    /// Enabled cache with the given TTL and no size bound
    pub fn ttl(ttl: Duration) -> Self {
        Self { enabled: true, ttl, max_entries: None }
    }

    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn validate(&self) -> CommonResult<()> {
        if self.enabled && self.ttl.is_zero() {
            return Err(CommonError::config_field("cache.ttl_ms", "must be greater than 0"));
        }
        if self.max_entries == Some(0) {
            return Err(CommonError::config_field("cache.max_entries", "must be greater than 0"));
        }
        Ok(())
    }
}
