//! Filter, sort and page state shared by the codec, the strategy selector and
//! the controller.

use shared::domain::{SortDirection, SortField};

/// Items per page. Fixed for the lifetime of a list view.
pub const PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    /// Empty means all categories.
    pub category: String,
    /// Live-typed search text, not yet applied.
    pub search_input: String,
    /// Committed search text that filters results.
    pub search_term: String,
    pub sort_field: Option<SortField>,
    pub sort_direction: SortDirection,
    pub page: u32,
    pub page_size: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: String::new(),
            search_input: String::new(),
            search_term: String::new(),
            sort_field: None,
            sort_direction: SortDirection::Desc,
            page: 1,
            page_size: PAGE_SIZE,
        }
    }
}

impl FilterState {
    pub fn is_search(&self) -> bool {
        !self.search_term.is_empty()
    }

    pub fn category_filter(&self) -> Option<&str> {
        (!self.category.is_empty()).then_some(self.category.as_str())
    }

    /// Sort direction only when a sort field is active.
    pub fn effective_direction(&self) -> Option<SortDirection> {
        self.sort_field.map(|_| self.sort_direction)
    }

    /// Zero-based offset of the first item on the current page.
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }

    /// Everything except the page number: a change here invalidates any
    /// retained client-side result set.
    pub fn search_key(&self) -> SearchKey {
        SearchKey {
            category: self.category.clone(),
            search_term: self.search_term.clone(),
            sort_field: self.sort_field,
            sort_direction: self.effective_direction(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub category: String,
    pub search_term: String,
    pub sort_field: Option<SortField>,
    pub sort_direction: Option<SortDirection>,
}
