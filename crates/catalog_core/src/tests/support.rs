use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{Item, ItemId, SortDirection},
    error::CatalogError,
    protocol::ListItemsQuery,
};

use crate::catalog::CatalogClient;

pub(crate) fn item(id: &str, title: &str, category: &str, price: f64, rating: f64) -> Item {
    Item {
        id: ItemId::new(id),
        title: title.to_string(),
        category: category.to_string(),
        tags: vec![category.to_ascii_lowercase()],
        price,
        rating,
        images: vec![format!("https://img.test/{id}/0.jpg")],
        description: None,
        brand: None,
        stock: None,
    }
}

pub(crate) fn with_images(mut item: Item, count: usize) -> Item {
    item.images = (0..count)
        .map(|n| format!("https://img.test/{}/{n}.jpg", item.id))
        .collect();
    item
}

/// In-memory catalog that behaves like the upstream service: filters by
/// category and title, sorts and paginates when asked, and records every
/// listing request.
pub(crate) struct FakeCatalog {
    items: Vec<Item>,
    categories: Vec<String>,
    fail_with: Option<CatalogError>,
    categories_fail_with: Option<CatalogError>,
    delays: Mutex<VecDeque<Duration>>,
    calls: Mutex<Vec<ListItemsQuery>>,
}

impl FakeCatalog {
    pub(crate) fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            categories: Vec::new(),
            fail_with: None,
            categories_fail_with: None,
            delays: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub(crate) fn failing(err: CatalogError) -> Self {
        let mut catalog = Self::new(Vec::new());
        catalog.fail_with = Some(err);
        catalog
    }

    /// Only the category listing fails; items and details still load.
    pub(crate) fn with_failing_categories(mut self, err: CatalogError) -> Self {
        self.categories_fail_with = Some(err);
        self
    }

    /// Delays applied to successive listing calls, in order.
    pub(crate) fn with_delays(self, delays: &[Duration]) -> Self {
        *self.delays.lock().expect("delays") = delays.iter().copied().collect();
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn calls(&self) -> Vec<ListItemsQuery> {
        self.calls.lock().expect("calls").clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().expect("calls").len()
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn list_items(&self, query: &ListItemsQuery) -> Result<Vec<Item>, CatalogError> {
        self.calls.lock().expect("calls").push(query.clone());
        let delay = self.delays.lock().expect("delays").pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }

        let needle = query.search_term.as_deref().map(str::to_ascii_lowercase);
        let mut matches: Vec<Item> = self
            .items
            .iter()
            .filter(|item| query.category.as_deref().map_or(true, |c| item.category == c))
            .filter(|item| {
                needle
                    .as_deref()
                    .map_or(true, |n| item.title.to_ascii_lowercase().contains(n))
            })
            .cloned()
            .collect();

        if let Some(field) = query.sort_by {
            let direction = query.order.unwrap_or(SortDirection::Asc);
            matches.sort_by(|a, b| {
                let ordering = field.key(a).total_cmp(&field.key(b));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        Ok(matches
            .into_iter()
            .skip(query.skip.unwrap_or(0) as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<String>, CatalogError> {
        if let Some(err) = self.fail_with.as_ref().or(self.categories_fail_with.as_ref()) {
            return Err(err.clone());
        }
        Ok(self.categories.clone())
    }

    async fn get_item(&self, id: &ItemId) -> Result<Item, CatalogError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.items
            .iter()
            .find(|item| &item.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }
}
