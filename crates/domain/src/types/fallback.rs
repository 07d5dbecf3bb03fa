//! Deterministic fallback records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::endpoint::EndpointKey;

/// Why a fallback record was produced
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FallbackReason {
    /// The retry loop ended without a success
    RetriesExhausted,
    /// Caller-defined reason, for adapters that call
    /// `FallbackManager::build` themselves (a rejected page, a record that
    /// failed validation). The executor only produces `RetriesExhausted`.
    Custom(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetriesExhausted => f.write_str("retries_exhausted"),
            Self::Custom(reason) => write!(f, "custom:{reason}"),
        }
    }
}

/// Placeholder substituted for a result that could not be fetched
///
/// Everything except `generated_at` is a pure function of
/// `(endpoint, business_key, reason)`: `content_hash` covers `payload`, and
/// `fallback_id` is derived from the hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub fallback_id: String,
    pub endpoint: EndpointKey,
    pub business_key: String,
    pub reason: FallbackReason,
    pub payload: serde_json::Value,
    pub content_hash: String,
    /// Wall-clock creation time; excluded from the hash
    pub generated_at: DateTime<Utc>,
}

impl FallbackRecord {
    /// Equality on every field except `generated_at`
    pub fn content_eq(&self, other: &Self) -> bool {
        self.fallback_id == other.fallback_id
            && self.endpoint == other.endpoint
            && self.business_key == other.business_key
            && self.reason == other.reason
            && self.payload == other.payload
            && self.content_hash == other.content_hash
    }
}
