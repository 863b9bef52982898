//! List view state machine.
//!
//! Every triggering operation follows the same order: mutate the filter
//! state, push the encoded query to navigation, then dispatch exactly one
//! fetch. Fetches run as spawned tasks and report back over a channel; each
//! dispatch takes a fresh request token and only the completion carrying the
//! latest token is applied, so a slow earlier request can never overwrite the
//! result of a faster later one.

use std::sync::Arc;

use shared::{
    domain::{Item, ItemId, SortDirection, SortField},
    error::CatalogError,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    carousel::{CycleDirection, ImageIndexMap},
    catalog::CatalogClient,
    codec::{self, LIST_PATH},
    filter::FilterState,
    navigation::Navigation,
    strategy::{self, Execution, FetchPlan, FetchResult, FetchStrategySelector, Strategy},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    /// Holds the user-facing message. Recovery is manual via
    /// [`QueryStateController::go_back`].
    Errored { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("page must be at least 1, got {0}")]
    InvalidPage(u32),
}

#[derive(Debug)]
pub struct FetchCompletion {
    pub token: u64,
    pub outcome: Result<Execution, CatalogError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    /// Known only under the client-paged strategy.
    pub total_pages: Option<u32>,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Render-ready snapshot of the list view.
#[derive(Debug)]
pub struct ListView<'a> {
    pub status: &'a LoadStatus,
    pub filter: &'a FilterState,
    pub categories: &'a [String],
    pub items: &'a [Item],
    pub page: PageInfo,
    pub empty_message: Option<String>,
}

pub struct QueryStateController<N: Navigation> {
    client: Arc<dyn CatalogClient>,
    navigation: N,
    state: FilterState,
    status: LoadStatus,
    selector: FetchStrategySelector,
    categories: Vec<String>,
    /// Set by a failed category load. Survives fetch completions so the
    /// failure stays visible until categories load or the user goes back.
    category_error: Option<String>,
    result: Option<FetchResult>,
    image_index: ImageIndexMap,
    latest_token: u64,
    resolved_token: u64,
    dispatched: u64,
    last_synced_query: Option<String>,
    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    completions_rx: mpsc::UnboundedReceiver<FetchCompletion>,
}

impl<N: Navigation> QueryStateController<N> {
    pub fn new(client: Arc<dyn CatalogClient>, navigation: N) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            client,
            navigation,
            state: FilterState::default(),
            status: LoadStatus::Idle,
            selector: FetchStrategySelector::new(),
            categories: Vec::new(),
            category_error: None,
            result: None,
            image_index: ImageIndexMap::new(),
            latest_token: 0,
            resolved_token: 0,
            dispatched: 0,
            last_synced_query: None,
            completions_tx,
            completions_rx,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn navigation(&self) -> &N {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut N {
        &mut self.navigation
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn result(&self) -> Option<&FetchResult> {
        self.result.as_ref()
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.result.as_ref().map(|result| result.strategy)
    }

    pub fn items(&self) -> &[Item] {
        self.result
            .as_ref()
            .map(|result| result.items.as_slice())
            .unwrap_or_default()
    }

    /// Fetch cycles dispatched so far, including ones served from the
    /// retained search set.
    pub fn dispatched_fetches(&self) -> u64 {
        self.dispatched
    }

    pub fn has_pending_fetch(&self) -> bool {
        self.resolved_token < self.latest_token
    }

    /// Initial load: adopt whatever the address bar holds.
    pub fn start(&mut self) {
        let query = self.navigation.current_query();
        self.state = codec::decode(&query);
        self.last_synced_query = Some(query);
        info!(query = ?self.last_synced_query, "list view started");
        self.dispatch();
    }

    pub async fn load_categories(&mut self) -> Result<&[String], CatalogError> {
        match self.client.list_categories().await {
            Ok(raw) => {
                let mut unique: Vec<String> = Vec::with_capacity(raw.len());
                for category in raw {
                    if !unique.contains(&category) {
                        unique.push(category);
                    }
                }
                debug!(count = unique.len(), "loaded categories");
                self.categories = unique;
                self.category_error = None;
                Ok(&self.categories)
            }
            Err(err) => {
                warn!(error = %err, "failed to load categories");
                let message = err.to_string();
                self.category_error = Some(message.clone());
                self.status = LoadStatus::Errored { message };
                Err(err)
            }
        }
    }

    /// Empty `value` selects all categories. Validation applies once the
    /// category list has been loaded.
    pub fn set_category(&mut self, value: &str) -> Result<(), ControllerError> {
        if !value.is_empty()
            && !self.categories.is_empty()
            && !self.categories.iter().any(|known| known == value)
        {
            return Err(ControllerError::UnknownCategory(value.to_string()));
        }
        self.state.category = value.to_string();
        self.state.page = 1;
        self.publish_and_fetch();
        Ok(())
    }

    /// Live typing; nothing leaves the controller until the search is committed.
    pub fn update_search_input(&mut self, text: &str) {
        self.state.search_input = text.to_string();
    }

    pub fn commit_search(&mut self) {
        self.state.search_term = self.state.search_input.clone();
        self.state.page = 1;
        self.publish_and_fetch();
    }

    /// Key press in the search box. Returns `true` when it committed the search.
    pub fn key_signal(&mut self, key: &str) -> bool {
        if key == "Enter" {
            self.commit_search();
            true
        } else {
            false
        }
    }

    /// `None` clears sorting.
    pub fn set_sort(&mut self, field: Option<SortField>, direction: SortDirection) {
        self.state.sort_field = field;
        // Without a field the address bar carries no order, so keep the
        // default to stay equal to what decoding the URL yields.
        self.state.sort_direction = if field.is_some() {
            direction
        } else {
            SortDirection::default()
        };
        self.state.page = 1;
        self.publish_and_fetch();
    }

    /// Re-requesting the current page is a full fetch cycle, not a no-op.
    pub fn set_page(&mut self, page: u32) -> Result<(), ControllerError> {
        if page < 1 {
            return Err(ControllerError::InvalidPage(page));
        }
        self.state.page = page;
        self.publish_and_fetch();
        Ok(())
    }

    pub fn next_page(&mut self) -> bool {
        if !self.page_info().has_next {
            debug!(page = self.state.page, "next page unavailable");
            return false;
        }
        self.set_page(self.state.page + 1).is_ok()
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.page_info().has_prev {
            return false;
        }
        self.set_page(self.state.page - 1).is_ok()
    }

    /// Adopts a query string that changed outside the controller, such as a
    /// back/forward navigation. All fields are replaced at once and a single
    /// fetch reflects the fully decoded state.
    pub fn sync_from_external_query(&mut self, query: &str) {
        let query = query.trim_start_matches('?');
        self.state = codec::decode(query);
        self.last_synced_query = Some(query.to_string());
        debug!(query, "synchronized from external query");
        self.dispatch();
    }

    /// Detects an address-bar change this controller did not make. Returns
    /// `true` if it resynchronized.
    pub fn poll_navigation(&mut self) -> bool {
        let current = self.navigation.current_query();
        if self.last_synced_query.as_deref() == Some(current.as_str()) {
            return false;
        }
        self.sync_from_external_query(&current);
        true
    }

    /// Recovery action for the errored state.
    pub fn go_back(&mut self) -> bool {
        if !self.navigation.back() {
            return false;
        }
        self.category_error = None;
        let query = self.navigation.current_query();
        self.sync_from_external_query(&query);
        true
    }

    /// Cycles the displayed image of a card on the current page.
    pub fn cycle_image(&mut self, id: &ItemId, direction: CycleDirection) -> usize {
        let count = self
            .items()
            .iter()
            .find(|item| &item.id == id)
            .map_or(0, Item::image_count);
        self.image_index.cycle(id, direction, count)
    }

    pub fn image_index(&self) -> &ImageIndexMap {
        &self.image_index
    }

    pub fn current_image<'a>(&self, item: &'a Item) -> Option<&'a str> {
        self.image_index.current_image(item)
    }

    pub fn detail_path(&self, id: &ItemId) -> String {
        codec::detail_path(id, &self.state)
    }

    pub fn page_info(&self) -> PageInfo {
        let page = self.state.page;
        let total_pages = self
            .result
            .as_ref()
            .and_then(|result| result.total_pages(self.state.page_size));
        let has_next = match &self.result {
            Some(result) if result.total_known => total_pages.is_some_and(|total| page < total),
            // Forward-only: a full page suggests there may be more.
            Some(result) => result.items.len() >= self.state.page_size as usize,
            None => false,
        };
        PageInfo {
            page,
            total_pages,
            has_prev: page > 1,
            has_next,
        }
    }

    pub fn view(&self) -> ListView<'_> {
        let items = self.items();
        let empty_message = (self.status == LoadStatus::Ready && items.is_empty())
            .then(|| format!("No items found for: {}", self.state.search_term));
        ListView {
            status: &self.status,
            filter: &self.state,
            categories: &self.categories,
            items,
            page: self.page_info(),
            empty_message,
        }
    }

    /// Waits for the next fetch completion and applies it if it is still
    /// current. Returns whether it was applied.
    pub async fn next_completion(&mut self) -> bool {
        match self.completions_rx.recv().await {
            Some(completion) => self.apply(completion),
            None => false,
        }
    }

    /// Drains completions until the latest dispatched fetch has resolved.
    pub async fn settle(&mut self) {
        while self.has_pending_fetch() {
            self.next_completion().await;
        }
    }

    pub fn apply(&mut self, completion: FetchCompletion) -> bool {
        if completion.token != self.latest_token {
            debug!(
                token = completion.token,
                latest = self.latest_token,
                "discarding stale fetch completion"
            );
            return false;
        }
        self.resolved_token = completion.token;

        match completion.outcome {
            Ok(execution) => {
                if let Some(retained) = execution.retained {
                    self.selector.retain(retained);
                }
                info!(
                    token = completion.token,
                    strategy = ?execution.result.strategy,
                    items = execution.result.items.len(),
                    "catalog fetch applied"
                );
                self.result = Some(execution.result);
                self.image_index.clear();
                self.status = match &self.category_error {
                    Some(message) => LoadStatus::Errored {
                        message: message.clone(),
                    },
                    None => LoadStatus::Ready,
                };
            }
            Err(err) => {
                warn!(token = completion.token, error = %err, "catalog fetch failed");
                self.status = LoadStatus::Errored {
                    message: err.to_string(),
                };
            }
        }
        true
    }

    fn publish_and_fetch(&mut self) {
        let query = codec::encode(&self.state);
        self.navigation.navigate_to(LIST_PATH, &query);
        self.last_synced_query = Some(query);
        self.dispatch();
    }

    fn dispatch(&mut self) {
        self.latest_token += 1;
        self.dispatched += 1;
        self.status = LoadStatus::Loading;
        let token = self.latest_token;
        let plan = self.selector.plan(&self.state);
        debug!(
            token,
            strategy = ?plan.strategy(),
            network = plan.issues_request(),
            "dispatching fetch"
        );

        match plan {
            FetchPlan::Reslice(retained) => {
                let completion = FetchCompletion {
                    token,
                    outcome: Ok(Execution {
                        result: strategy::reslice(&retained, &self.state),
                        retained: None,
                    }),
                };
                // The receiver lives in `self`, so the send cannot fail.
                let _ = self.completions_tx.send(completion);
            }
            plan @ FetchPlan::Request { .. } => {
                let client = Arc::clone(&self.client);
                let tx = self.completions_tx.clone();
                let snapshot = self.state.clone();
                tokio::spawn(async move {
                    let outcome = strategy::execute(client.as_ref(), plan, &snapshot).await;
                    let _ = tx.send(FetchCompletion { token, outcome });
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
