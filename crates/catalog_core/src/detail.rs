//! Item detail view: fetch-by-id plus the way back to the list.

use shared::domain::{Item, ItemId};
use tracing::{info, warn};

use crate::{
    carousel::CarouselDriver,
    catalog::CatalogClient,
    codec::{self, LIST_PATH},
    navigation::Navigation,
};

/// Shown for any failed or empty detail lookup.
pub const NOT_FOUND_MESSAGE: &str = "Failed to load product details. Please try again later.";

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loaded(Item),
    /// Terminal. The only way out is the manual back action.
    NotFound { id: ItemId, message: String },
}

impl DetailState {
    pub fn item(&self) -> Option<&Item> {
        match self {
            DetailState::Loaded(item) => Some(item),
            DetailState::NotFound { .. } => None,
        }
    }
}

/// Looks the item up once. Every failure, not only a 404, collapses into the
/// terminal not-found state; there is no retry.
pub async fn load_detail(client: &dyn CatalogClient, id: &ItemId) -> DetailState {
    match client.get_item(id).await {
        Ok(item) => {
            info!(%id, images = item.images.len(), "loaded item detail");
            DetailState::Loaded(item)
        }
        Err(err) => {
            warn!(%id, error = %err, "item detail unavailable");
            DetailState::NotFound {
                id: id.clone(),
                message: NOT_FOUND_MESSAGE.to_string(),
            }
        }
    }
}

/// List query to restore when leaving a detail view. The detail URL carries
/// the list's query; it is re-encoded so malformed values come back cleaned.
pub fn back_to_list_query(detail_query: &str) -> String {
    codec::encode(&codec::decode(detail_query))
}

/// An open detail view. Owns the gallery carousel, whose timers stop when the
/// view is dropped.
pub struct DetailView {
    pub state: DetailState,
    list_query: String,
    carousel: Option<CarouselDriver>,
}

impl DetailView {
    pub async fn open(client: &dyn CatalogClient, id: &ItemId, detail_query: &str) -> Self {
        let state = load_detail(client, id).await;
        let carousel = state
            .item()
            .map(|item| CarouselDriver::spawn(item.images.len()));
        Self {
            state,
            list_query: back_to_list_query(detail_query),
            carousel,
        }
    }

    pub fn carousel(&self) -> Option<&CarouselDriver> {
        self.carousel.as_ref()
    }

    pub fn list_query(&self) -> &str {
        &self.list_query
    }

    /// "Back to products": pushes the preserved list query and closes the
    /// view, tearing the carousel down.
    pub fn back<N: Navigation>(self, navigation: &mut N) {
        navigation.navigate_to(LIST_PATH, &self.list_query);
    }
}

#[cfg(test)]
#[path = "tests/detail_tests.rs"]
mod tests;
