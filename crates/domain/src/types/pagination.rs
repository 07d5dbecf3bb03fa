//! Pagination state owned by one paged query

use serde::{Deserialize, Serialize};

/// Where the next page starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePosition {
    /// Record offset (`offset=`/`start=` style APIs)
    Offset(u64),
    /// 1-based page number (`page=` style APIs)
    PageNumber(u64),
    /// Opaque server cursor; `None` before the first page
    Cursor(Option<String>),
}

/// Position, page size and exhaustion flag of one logical paged query
///
/// Owned by the caller driving the query and never shared across queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub position: PagePosition,
    pub page_size: u32,
    pub exhausted: bool,
    /// Pages already fetched for this query
    pub pages_fetched: u32,
}

impl PaginationState {
    pub fn offset(page_size: u32) -> Self {
        Self::starting_at(PagePosition::Offset(0), page_size)
    }

    pub fn page_number(page_size: u32) -> Self {
        Self::starting_at(PagePosition::PageNumber(1), page_size)
    }

    pub fn cursor(page_size: u32) -> Self {
        Self::starting_at(PagePosition::Cursor(None), page_size)
    }

    pub fn starting_at(position: PagePosition, page_size: u32) -> Self {
        Self { position, page_size, exhausted: false, pages_fetched: 0 }
    }
}
