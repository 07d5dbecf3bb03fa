//! Domain constants
//!
//! Defaults shared by the configuration types and the access layer.

/// Per-attempt network timeout when the policy does not set one
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 30_000;

/// Overall deadline applied to requests that carry none
pub const DEFAULT_DEADLINE_MS: u64 = 120_000;

/// Version stamped into every fallback payload; part of the content hash
pub const FALLBACK_SCHEMA_VERSION: u32 = 1;

/// Header carrying the server's retry hint
pub const RETRY_AFTER_HEADER: &str = "retry-after";
