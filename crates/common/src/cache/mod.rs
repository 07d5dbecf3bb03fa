//! TTL cache for immutable values
//!
//! Values are stored behind `Arc`, so an overwrite swaps the whole entry and
//! concurrent readers keep whatever version they already fetched. Expiry is
//! checked lazily: a lookup that finds an expired entry reports a miss and
//! leaves the entry in place; the next store purges it. There is no
//! background eviction task.
//!
//! ```
//! use std::time::Duration;
//!
//! use scifetch_common::cache::{CacheConfig, TtlCache};
//!
//! let cache: TtlCache<String, Vec<u8>> = TtlCache::new(CacheConfig::ttl(Duration::from_secs(60)));
//! cache.store("GET https://api.example.org/items".to_string(), b"[]".to_vec());
//! assert!(cache.lookup(&"GET https://api.example.org/items".to_string()).is_some());
//! ```

mod config;
mod core;
mod stats;

pub use self::config::CacheConfig;
pub use self::core::TtlCache;
pub use self::stats::CacheStats;
