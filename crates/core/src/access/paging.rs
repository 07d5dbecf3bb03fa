//! Paging helper
//!
//! Repeatedly executes an adapter's page requests while advancing a
//! [`PaginationCursor`]. Each page is an independent `execute` call with its
//! own retries and admission checks.

use scifetch_common::resilience::Clock;
use scifetch_domain::{AccessError, FallbackRecord, PaginationState, ScifetchError};
use thiserror::Error;
use tracing::debug;

use super::executor::{Fetched, RequestExecutor};
use super::pagination::{Advance, PageMeta, PaginationCursor};
use super::ports::SourceAdapter;

/// Why paging stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cursor reported the end of results
    Exhausted,
    /// `max_pages` pages were fetched
    MaxPages,
    /// A page was replaced by a fallback record
    Fallback,
}

/// Records gathered across pages
#[derive(Debug, Clone)]
pub struct PagedResult<R> {
    pub records: Vec<R>,
    /// Final cursor state, usable to resume after `MaxPages`
    pub state: PaginationState,
    pub fallback: Option<FallbackRecord>,
    pub stopped: StopReason,
}

/// Failure while paging
#[derive(Debug, Error)]
pub enum PagingError {
    #[error("page {page} failed: {source}")]
    Access {
        /// 1-based index of the page that failed
        page: u32,
        #[source]
        source: AccessError,
    },

    #[error("adapter failed on page {page}: {source}")]
    Adapter {
        page: u32,
        #[source]
        source: ScifetchError,
    },
}

/// Fetch pages of `query` until exhausted, a fallback, or `max_pages`
///
/// Records from pages fetched before an error are discarded with it.
pub async fn collect_pages<A, C>(
    executor: &RequestExecutor<C>,
    adapter: &A,
    query: &A::Query,
    state: PaginationState,
    max_pages: u32,
) -> Result<PagedResult<A::Record>, PagingError>
where
    A: SourceAdapter,
    C: Clock + Clone,
{
    let mut cursor = PaginationCursor::new(state);
    let mut records = Vec::new();
    let mut fetched_here = 0u32;

    let stopped = loop {
        if cursor.is_exhausted() {
            break StopReason::Exhausted;
        }
        if fetched_here >= max_pages {
            break StopReason::MaxPages;
        }
        let page_index = fetched_here + 1;

        let request = adapter
            .build_request(query, cursor.state())
            .map_err(|source| PagingError::Adapter { page: page_index, source })?;
        let fetched = executor
            .execute(&request)
            .await
            .map_err(|source| PagingError::Access { page: page_index, source })?;
        fetched_here = page_index;

        let response = match fetched {
            Fetched::Response { response, .. } => response,
            Fetched::Fallback { record, .. } => {
                debug!(source = adapter.name(), page = page_index, "paging_stopped_on_fallback");
                return Ok(PagedResult {
                    records,
                    state: cursor.into_state(),
                    fallback: Some(record),
                    stopped: StopReason::Fallback,
                });
            }
        };

        let page = adapter
            .parse_response(&response)
            .map_err(|source| PagingError::Adapter { page: page_index, source })?;
        let meta = PageMeta {
            records: page.records.len(),
            next_cursor: page.next_cursor,
            end_of_results: page.end_of_results,
        };
        records.extend(page.records);

        if cursor.advance(&meta) == Advance::Exhausted {
            break StopReason::Exhausted;
        }
    };

    debug!(
        source = adapter.name(),
        pages = fetched_here,
        records = records.len(),
        stopped = ?stopped,
        "paging_finished"
    );
    Ok(PagedResult { records, state: cursor.into_state(), fallback: None, stopped })
}
