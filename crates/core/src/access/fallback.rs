//! Deterministic fallback records
//!
//! A fallback record stands in for a result that could not be fetched. Its
//! identity and payload depend only on `(endpoint, business_key, reason)`, so
//! re-running an extraction after a partial failure writes identical rows.
//! The only wall-clock value, `generated_at`, is kept out of the hash.

use blake3::Hasher;
use chrono::Utc;
use scifetch_domain::constants::FALLBACK_SCHEMA_VERSION;
use scifetch_domain::{EndpointKey, FallbackReason, FallbackRecord};
use serde_json::json;

/// Builds [`FallbackRecord`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackManager;

impl FallbackManager {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        endpoint: &EndpointKey,
        business_key: &str,
        reason: &FallbackReason,
    ) -> FallbackRecord {
        let content_hash = content_hash(endpoint, business_key, reason);
        let payload = json!({
            "schema_version": FALLBACK_SCHEMA_VERSION,
            "source": endpoint.source(),
            "host": endpoint.host(),
            "route": endpoint.route(),
            "business_key": business_key,
            "reason": reason.to_string(),
            "status": "unavailable",
        });

        FallbackRecord {
            fallback_id: format!("fb_{}", &content_hash[..32]),
            endpoint: endpoint.clone(),
            business_key: business_key.to_string(),
            reason: reason.clone(),
            payload,
            content_hash,
            generated_at: Utc::now(),
        }
    }
}

/// BLAKE3 over length-prefixed fields, hex encoded
fn content_hash(endpoint: &EndpointKey, business_key: &str, reason: &FallbackReason) -> String {
    let mut hasher = Hasher::new();
    let version = FALLBACK_SCHEMA_VERSION.to_string();
    let reason = reason.to_string();
    for field in [
        version.as_str(),
        endpoint.source(),
        endpoint.host(),
        endpoint.route(),
        business_key,
        reason.as_str(),
    ] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}
