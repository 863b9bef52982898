use serde::{Deserialize, Serialize};

use crate::domain::{SortDirection, SortField};

/// Query parameters of the catalog's item listing endpoint.
///
/// `None` fields are omitted from the request entirely; the upstream service
/// treats a missing `category` as "all categories" and a missing `sortBy` as
/// its own default ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, rename = "search", skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortDirection>,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

impl ListItemsQuery {
    pub fn is_search(&self) -> bool {
        self.search_term.is_some()
    }
}
