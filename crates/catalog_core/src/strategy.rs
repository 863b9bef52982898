//! Retrieval strategy selection.
//!
//! Without a search term the catalog service paginates and sorts on its side
//! (`limit`/`skip`/`sortBy`/`order`). The service cannot combine full-text
//! search with its own sort and pagination, so in search mode the selector
//! asks for every match up to [`SEARCH_RESULT_CAP`], sorts locally and slices
//! the requested page. The sorted match set is retained so that paging through
//! the same search does not hit the network again.

use std::sync::Arc;

use shared::{
    domain::{Item, SortDirection, SortField},
    error::CatalogError,
    protocol::ListItemsQuery,
};
use tracing::debug;

use crate::{
    catalog::CatalogClient,
    filter::{FilterState, SearchKey},
};

/// Upper bound on the match set fetched in search mode.
pub const SEARCH_RESULT_CAP: u32 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ServerPaged,
    ClientPaged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub items: Vec<Item>,
    pub strategy: Strategy,
    /// True only for client-paged results, where the full match set is known.
    pub total_known: bool,
    /// Size of the full match set when `total_known`.
    pub total_matches: Option<usize>,
}

impl FetchResult {
    pub fn total_pages(&self, page_size: u32) -> Option<u32> {
        let total = self.total_matches?;
        let page_size = page_size.max(1) as usize;
        Some(total.div_ceil(page_size) as u32)
    }
}

/// Sorted match set of a completed search.
#[derive(Debug, Clone)]
pub struct RetainedSearch {
    pub key: SearchKey,
    pub items: Arc<Vec<Item>>,
}

#[derive(Debug, Clone)]
pub enum FetchPlan {
    /// The retained set already covers this state; no request is needed.
    Reslice(RetainedSearch),
    Request {
        strategy: Strategy,
        query: ListItemsQuery,
    },
}

impl FetchPlan {
    pub fn strategy(&self) -> Strategy {
        match self {
            FetchPlan::Reslice(_) => Strategy::ClientPaged,
            FetchPlan::Request { strategy, .. } => *strategy,
        }
    }

    pub fn issues_request(&self) -> bool {
        matches!(self, FetchPlan::Request { .. })
    }
}

/// Outcome of executing a plan. Client-paged requests hand back the full
/// sorted set so the caller can decide whether to retain it.
#[derive(Debug, Clone)]
pub struct Execution {
    pub result: FetchResult,
    pub retained: Option<RetainedSearch>,
}

#[derive(Debug, Default)]
pub struct FetchStrategySelector {
    retained: Option<RetainedSearch>,
}

impl FetchStrategySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retained(&self) -> Option<&RetainedSearch> {
        self.retained.as_ref()
    }

    pub fn plan(&mut self, state: &FilterState) -> FetchPlan {
        if !state.is_search() {
            if self.retained.take().is_some() {
                debug!("dropping retained search results for server-paged fetch");
            }
            return FetchPlan::Request {
                strategy: Strategy::ServerPaged,
                query: server_paged_query(state),
            };
        }

        let key = state.search_key();
        if let Some(retained) = self.retained.as_ref().filter(|r| r.key == key) {
            return FetchPlan::Reslice(retained.clone());
        }
        if self.retained.take().is_some() {
            debug!("search key changed; invalidating retained results");
        }
        FetchPlan::Request {
            strategy: Strategy::ClientPaged,
            query: client_paged_query(state),
        }
    }

    pub fn retain(&mut self, retained: RetainedSearch) {
        self.retained = Some(retained);
    }

    pub async fn select_and_fetch(
        &mut self,
        client: &dyn CatalogClient,
        state: &FilterState,
    ) -> Result<FetchResult, CatalogError> {
        let plan = self.plan(state);
        let execution = execute(client, plan, state).await?;
        if let Some(retained) = execution.retained {
            self.retain(retained);
        }
        Ok(execution.result)
    }
}

pub async fn execute(
    client: &dyn CatalogClient,
    plan: FetchPlan,
    state: &FilterState,
) -> Result<Execution, CatalogError> {
    match plan {
        FetchPlan::Reslice(retained) => Ok(Execution {
            result: reslice(&retained, state),
            retained: None,
        }),
        FetchPlan::Request {
            strategy: Strategy::ServerPaged,
            query,
        } => {
            let items = client.list_items(&query).await?;
            Ok(Execution {
                result: FetchResult {
                    items,
                    strategy: Strategy::ServerPaged,
                    total_known: false,
                    total_matches: None,
                },
                retained: None,
            })
        }
        FetchPlan::Request {
            strategy: Strategy::ClientPaged,
            query,
        } => {
            let mut items = client.list_items(&query).await?;
            if let Some(field) = state.sort_field {
                sort_items(&mut items, field, state.sort_direction);
            }
            debug!(matches = items.len(), "fetched full search result set");
            let retained = RetainedSearch {
                key: state.search_key(),
                items: Arc::new(items),
            };
            Ok(Execution {
                result: page_of(&retained.items, state),
                retained: Some(retained),
            })
        }
    }
}

/// Stable numeric sort; items with equal keys keep their upstream order.
pub fn sort_items(items: &mut [Item], field: SortField, direction: SortDirection) {
    items.sort_by(|a, b| {
        let ordering = field.key(a).total_cmp(&field.key(b));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Items of the current page within a sorted match set. Pages past the end are
/// empty rather than an error.
pub fn page_slice<'a>(items: &'a [Item], state: &FilterState) -> &'a [Item] {
    let start = state.offset().min(items.len());
    let end = start
        .saturating_add(state.page_size as usize)
        .min(items.len());
    &items[start..end]
}

/// Page of a retained search for `state`, without touching the network.
pub fn reslice(retained: &RetainedSearch, state: &FilterState) -> FetchResult {
    page_of(&retained.items, state)
}

fn page_of(items: &[Item], state: &FilterState) -> FetchResult {
    FetchResult {
        items: page_slice(items, state).to_vec(),
        strategy: Strategy::ClientPaged,
        total_known: true,
        total_matches: Some(items.len()),
    }
}

fn server_paged_query(state: &FilterState) -> ListItemsQuery {
    ListItemsQuery {
        category: state.category_filter().map(str::to_string),
        search_term: None,
        sort_by: state.sort_field,
        order: state.effective_direction(),
        limit: state.page_size,
        skip: Some((state.page.max(1) - 1).saturating_mul(state.page_size)),
    }
}

fn client_paged_query(state: &FilterState) -> ListItemsQuery {
    ListItemsQuery {
        category: state.category_filter().map(str::to_string),
        search_term: Some(state.search_term.clone()),
        sort_by: None,
        order: None,
        limit: SEARCH_RESULT_CAP,
        skip: None,
    }
}

#[cfg(test)]
#[path = "tests/strategy_tests.rs"]
mod tests;
