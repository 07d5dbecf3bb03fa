//! Port interfaces for outbound access
//!
//! These traits are the seams between the executor and the outside world:
//! the wire ([`Transport`]), per-source request/response mapping
//! ([`SourceAdapter`]) and the logging collaborator ([`AccessEventSink`]).

use std::time::Duration;

use async_trait::async_trait;
use scifetch_domain::{Outcome, PaginationState, RequestDescriptor, Response, Result};
use thiserror::Error;

use super::events::AccessEvent;

/// A request the transport refused to issue
///
/// Network-level failures are not errors at this level; they come back as
/// [`Outcome::TransientFailure`] or [`Outcome::TimeoutFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport could not issue request: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Performs a single network attempt
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` once and classify what came back
    ///
    /// `timeout` is the budget for this attempt; implementations should pass
    /// it to their client so the attempt is abandoned cleanly.
    async fn send(
        &self,
        request: &RequestDescriptor,
        timeout: Duration,
    ) -> std::result::Result<Outcome, TransportError>;
}

/// One page of parsed records
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    /// Server cursor for the next page, for cursor-paged APIs
    pub next_cursor: Option<String>,
    /// The response explicitly marked the end of results
    pub end_of_results: bool,
}

impl<R> Page<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records, next_cursor: None, end_of_results: false }
    }

    pub fn with_next_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.next_cursor = Some(cursor.into());
        self
    }

    pub fn last(mut self) -> Self {
        self.end_of_results = true;
        self
    }
}

/// Maps a data source's queries onto requests and its responses onto records
///
/// Adapters are plain values handed to the paging helper; the access layer
/// never needs to know which source it is talking to.
pub trait SourceAdapter: Send + Sync {
    type Query: Send + Sync;
    type Record: Send;

    /// Source name, matching the `sources` table of the access config
    fn name(&self) -> &str;

    /// Build the request for the page `state` points at
    fn build_request(
        &self,
        query: &Self::Query,
        state: &PaginationState,
    ) -> Result<RequestDescriptor>;

    /// Parse a successful response into records
    fn parse_response(&self, response: &Response) -> Result<Page<Self::Record>>;
}

/// Receives structured access events
///
/// Called inline on the request path (and under the breaker's lock for
/// circuit transitions), so implementations must not block or call back into
/// the executor.
pub trait AccessEventSink: Send + Sync {
    fn emit(&self, event: &AccessEvent);
}
