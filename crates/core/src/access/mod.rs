//! Resilient outbound access
//!
//! Everything here is keyed by [`EndpointKey`](scifetch_domain::EndpointKey):
//! the [`registry`] owns one limiter, breaker and cache per key, and the
//! [`executor`] drives a request through them.

pub mod events;
pub mod executor;
pub mod fallback;
pub mod pagination;
pub mod paging;
pub mod ports;
pub mod registry;
