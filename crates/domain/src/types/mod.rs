//! Domain types for the outbound-access layer

pub mod endpoint;
pub mod fallback;
pub mod outcome;
pub mod pagination;
pub mod request;

pub use endpoint::EndpointKey;
pub use fallback::{FallbackReason, FallbackRecord};
pub use outcome::{parse_retry_after, Outcome, Response};
pub use pagination::{PagePosition, PaginationState};
pub use request::{Deadline, HttpMethod, Idempotency, RequestBuilder, RequestDescriptor};
