//! Endpoint identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical target of a request: source name, host and route template
///
/// Partition key for every piece of per-endpoint state (rate limiter,
/// circuit breaker, cache). Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointKey {
    source: String,
    host: String,
    route: String,
}

impl EndpointKey {
    pub fn new(
        source: impl Into<String>,
        host: impl Into<String>,
        route: impl Into<String>,
    ) -> Self {
        Self { source: source.into(), host: host.into(), route: route.into() }
    }

    /// Adapter or data source name, also the key into per-source config
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Route template, e.g. `/compound/{cid}/JSON`
    pub fn route(&self) -> &str {
        &self.route
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.source, self.host, self.route)
    }
}
