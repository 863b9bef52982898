//! Conversion between [`FilterState`] and the list view's URL query string.
//!
//! Decoding never fails. Missing or malformed values fall back to defaults so
//! that a hand-edited or truncated URL still lands on a usable page.

use shared::domain::{ItemId, SortDirection, SortField};
use tracing::debug;
use url::form_urlencoded;

use crate::filter::FilterState;

pub const KEY_CATEGORY: &str = "category";
pub const KEY_SEARCH: &str = "search";
pub const KEY_SORT_BY: &str = "sortBy";
pub const KEY_ORDER: &str = "order";
pub const KEY_PAGE: &str = "page";

/// Path of the list view.
pub const LIST_PATH: &str = "/products";

pub fn encode(state: &FilterState) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !state.category.is_empty() {
        query.append_pair(KEY_CATEGORY, &state.category);
    }
    if !state.search_term.is_empty() {
        query.append_pair(KEY_SEARCH, &state.search_term);
    }
    if let Some(field) = state.sort_field {
        query.append_pair(KEY_SORT_BY, field.as_str());
        query.append_pair(KEY_ORDER, state.sort_direction.as_str());
    }
    query.append_pair(KEY_PAGE, &state.page.max(1).to_string());
    query.finish()
}

pub fn decode(query: &str) -> FilterState {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut state = FilterState::default();
    let mut order: Option<SortDirection> = None;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            KEY_CATEGORY => state.category = value.into_owned(),
            KEY_SEARCH => {
                state.search_term = value.into_owned();
                state.search_input = state.search_term.clone();
            }
            KEY_SORT_BY => match value.parse::<SortField>() {
                Ok(field) => state.sort_field = Some(field),
                Err(()) => {
                    debug!(value = %value, "ignoring malformed sortBy query value");
                    state.sort_field = None;
                }
            },
            KEY_ORDER => match value.parse::<SortDirection>() {
                Ok(direction) => order = Some(direction),
                Err(()) => {
                    debug!(value = %value, "ignoring malformed order query value");
                    order = None;
                }
            },
            KEY_PAGE => match value.parse::<u32>() {
                Ok(page) if page >= 1 => state.page = page,
                _ => {
                    debug!(value = %value, "defaulting malformed page query value to 1");
                    state.page = 1;
                }
            },
            _ => {}
        }
    }

    // Direction without a field is meaningless and collapses to the default.
    state.sort_direction = match state.sort_field {
        Some(_) => order.unwrap_or_default(),
        None => SortDirection::default(),
    };
    state
}

/// Link from a list card to its detail view. The list query rides along so
/// the detail view can restore it on "back".
pub fn detail_path(id: &ItemId, state: &FilterState) -> String {
    let mut path = String::from(LIST_PATH);
    path.push('/');
    path.extend(form_urlencoded::byte_serialize(id.as_str().as_bytes()));
    path.push('?');
    path.push_str(&encode(state));
    path
}

/// Item id named by a detail path produced by [`detail_path`], if `path` is one.
pub fn detail_id(path: &str) -> Option<ItemId> {
    let segment = path.strip_prefix(LIST_PATH)?.strip_prefix('/')?;
    if segment.is_empty() || segment.contains('/') {
        return None;
    }
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(id, _)| ItemId::new(id))
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
