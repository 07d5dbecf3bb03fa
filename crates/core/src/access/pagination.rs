//! Pagination cursor
//!
//! Advances a [`PaginationState`] after each page. The cursor never fetches
//! anything itself; every page goes through the executor as its own request.

use scifetch_domain::{PagePosition, PaginationState};

/// What the last page told us about what comes next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// Records on the page just fetched
    pub records: usize,
    pub next_cursor: Option<String>,
    pub end_of_results: bool,
}

impl PageMeta {
    pub fn new(records: usize) -> Self {
        Self { records, ..Self::default() }
    }
}

/// Result of [`PaginationCursor::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Another page should be fetched
    Next,
    /// The query is complete
    Exhausted,
}

/// Drives one logical paged query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    state: PaginationState,
}

impl PaginationCursor {
    pub fn new(state: PaginationState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn into_state(self) -> PaginationState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.exhausted
    }

    /// Record the page just fetched and move to the next position
    ///
    /// The query is exhausted on an empty or short page, an explicit end
    /// marker, or a cursor-paged response without a next cursor. An empty page
    /// ends the query whatever the page size. Calling this on an exhausted
    /// cursor leaves it unchanged.
    pub fn advance(&mut self, page: &PageMeta) -> Advance {
        if self.state.exhausted {
            return Advance::Exhausted;
        }
        self.state.pages_fetched += 1;

        let short_page = page.records == 0 || page.records < self.state.page_size as usize;
        let next = if page.end_of_results || short_page {
            None
        } else {
            next_position(&self.state.position, page)
        };

        match next {
            Some(position) => {
                self.state.position = position;
                Advance::Next
            }
            None => {
                self.state.exhausted = true;
                Advance::Exhausted
            }
        }
    }
}

fn next_position(current: &PagePosition, page: &PageMeta) -> Option<PagePosition> {
    match current {
        PagePosition::Offset(offset) => Some(PagePosition::Offset(offset + page.records as u64)),
        PagePosition::PageNumber(number) => Some(PagePosition::PageNumber(number + 1)),
        PagePosition::Cursor(_) => {
            page.next_cursor.clone().map(|cursor| PagePosition::Cursor(Some(cursor)))
        }
    }
}
