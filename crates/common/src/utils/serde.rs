//! Serialization utilities for durations in configuration files
//!
//! Every duration in a policy file is written as an integer number of
//! milliseconds (`cooldown_period_ms = 30000`). These modules plug into
//! `#[serde(with = "...")]` so the typed structs can keep `Duration` fields.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize a `Duration` as milliseconds (u64)
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use scifetch_common::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "duration_millis")]
///     timeout: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
