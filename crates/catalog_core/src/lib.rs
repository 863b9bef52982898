//! Browse engine for a paged product catalog: query-string state, fetch
//! strategy selection and image carousels.

pub mod carousel;
pub mod catalog;
pub mod codec;
pub mod controller;
pub mod detail;
pub mod filter;
pub mod navigation;
pub mod strategy;

pub use carousel::{
    CarouselCommand, CarouselDriver, CarouselMode, CarouselSnapshot, CycleDirection,
    DetailCarousel, ImageIndexMap, Interaction,
};
pub use catalog::{CatalogClient, HttpCatalogClient};
pub use controller::{ControllerError, ListView, LoadStatus, PageInfo, QueryStateController};
pub use detail::{DetailState, DetailView};
pub use filter::{FilterState, PAGE_SIZE};
pub use navigation::{MemoryNavigation, Navigation};
pub use strategy::{FetchResult, FetchStrategySelector, Strategy, SEARCH_RESULT_CAP};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
