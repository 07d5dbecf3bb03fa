//! # Scifetch Core
//!
//! Adapter-agnostic access logic - no HTTP client or subscriber code.
//!
//! This crate contains:
//! - Port interfaces (transport, source adapters, event sinks)
//! - The per-endpoint state registry
//! - `RequestExecutor`, which runs one logical request through cache,
//!   circuit breaker, rate limiter and retry policy
//! - Pagination and deterministic fallback records
//!
//! ## Architecture Principles
//! - Depends only on `scifetch-common` and `scifetch-domain`
//! - All I/O goes through traits implemented in `scifetch-infra`
//! - No ambient singletons: callers own the executor and share it by `Arc`

pub mod access;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use access::events::{AccessEvent, EventKind, EventLevel, NoopEventSink};
pub use access::executor::{Fetched, RequestExecutor, ResponseOrigin};
pub use access::fallback::FallbackManager;
pub use access::pagination::{Advance, PageMeta, PaginationCursor};
pub use access::paging::{collect_pages, PagedResult, PagingError, StopReason};
pub use access::ports::{AccessEventSink, Page, SourceAdapter, Transport, TransportError};
pub use access::registry::{EndpointRegistry, EndpointState};
