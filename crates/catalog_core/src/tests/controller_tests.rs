use std::time::Duration;

use super::*;
use crate::{
    navigation::MemoryNavigation,
    strategy::SEARCH_RESULT_CAP,
    test_support::{item, with_images, FakeCatalog},
};

fn catalog(count: usize) -> FakeCatalog {
    let items = (0..count)
        .map(|n| {
            let category = if n % 2 == 0 { "Books" } else { "Garden" };
            with_images(
                item(
                    &format!("p{n:02}"),
                    &format!("Atlas item {n}"),
                    category,
                    10.0 + (n * 7 % 13) as f64,
                    (n % 5) as f64,
                ),
                3,
            )
        })
        .collect();
    FakeCatalog::new(items).with_categories(&["Books", "Garden", "Books"])
}

fn controller(
    catalog: &Arc<FakeCatalog>,
    query: &str,
) -> QueryStateController<MemoryNavigation> {
    QueryStateController::new(catalog.clone(), MemoryNavigation::new("/products", query))
}

#[tokio::test]
async fn start_adopts_address_bar_and_fetches_once() {
    let catalog = catalog(60).shared();
    let mut ctl = controller(&catalog, "category=Books&page=2");
    assert_eq!(ctl.status(), &LoadStatus::Idle);

    ctl.start();
    assert_eq!(ctl.status(), &LoadStatus::Loading);
    ctl.settle().await;

    assert_eq!(ctl.status(), &LoadStatus::Ready);
    assert_eq!(ctl.state().category, "Books");
    assert_eq!(ctl.state().page, 2);
    assert_eq!(ctl.strategy(), Some(Strategy::ServerPaged));

    let calls = catalog.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].category.as_deref(), Some("Books"));
    assert_eq!(calls[0].skip, Some(20));
    assert_eq!(calls[0].limit, 20);
    assert_eq!(calls[0].sort_by, None);
    // Starting does not push a history entry.
    assert_eq!(ctl.navigation().entries().len(), 1);
}

#[tokio::test]
async fn set_category_resets_page_and_pushes_url() {
    let catalog = catalog(60).shared();
    let mut ctl = controller(&catalog, "page=3");
    ctl.start();
    ctl.settle().await;

    ctl.set_category("Garden").expect("category");
    assert_eq!(ctl.state().page, 1);
    assert_eq!(ctl.navigation().current_query(), "category=Garden&page=1");
    ctl.settle().await;

    assert_eq!(catalog.call_count(), 2);
    assert!(ctl.items().iter().all(|i| i.category == "Garden"));
}

#[tokio::test]
async fn unknown_category_is_rejected_once_categories_are_known() {
    let catalog = catalog(4).shared();
    let mut ctl = controller(&catalog, "");
    let categories = ctl.load_categories().await.expect("categories").to_vec();
    assert_eq!(categories, ["Books", "Garden"]);

    let err = ctl.set_category("Toys").expect_err("must reject");
    assert_eq!(err, ControllerError::UnknownCategory("Toys".to_string()));
    assert_eq!(ctl.dispatched_fetches(), 0);
    assert_eq!(ctl.navigation().entries().len(), 1);

    ctl.set_category("").expect("all categories");
    assert_eq!(ctl.dispatched_fetches(), 1);
}

#[tokio::test]
async fn typing_stays_local_until_commit() {
    let catalog = catalog(30).shared();
    let mut ctl = controller(&catalog, "page=2");
    ctl.start();
    ctl.settle().await;

    ctl.update_search_input("atl");
    ctl.update_search_input("atlas");
    assert_eq!(ctl.dispatched_fetches(), 1);
    assert_eq!(ctl.navigation().entries().len(), 1);
    assert_eq!(ctl.state().search_term, "");

    assert!(!ctl.key_signal("a"));
    assert!(ctl.key_signal("Enter"));
    assert_eq!(ctl.state().search_term, "atlas");
    assert_eq!(ctl.state().search_input, ctl.state().search_term);
    assert_eq!(ctl.state().page, 1);
    assert_eq!(ctl.navigation().current_query(), "search=atlas&page=1");
    ctl.settle().await;

    assert_eq!(ctl.strategy(), Some(Strategy::ClientPaged));
    assert_eq!(catalog.calls()[1].limit, SEARCH_RESULT_CAP);
}

#[tokio::test]
async fn search_sort_first_item_is_cheapest_match() {
    let catalog = catalog(45).shared();
    let mut ctl = controller(&catalog, "");
    ctl.update_search_input("atlas");
    ctl.commit_search();
    ctl.set_sort(Some(SortField::Price), SortDirection::Asc);
    ctl.settle().await;

    // Prices are 10 + (n * 7 % 13), so the cheapest match costs 10.
    assert_eq!(ctl.items().len(), 20);
    assert_eq!(ctl.items()[0].price, 10.0);
    assert_eq!(catalog.call_count(), 2);
    assert_eq!(ctl.page_info().total_pages, Some(3));
    assert!(ctl.page_info().has_next);
    assert_eq!(
        ctl.navigation().current_query(),
        "search=atlas&sortBy=price&order=asc&page=1"
    );
}

#[tokio::test]
async fn set_page_on_current_page_still_fetches_once() {
    let catalog = catalog(30).shared();
    let mut ctl = controller(&catalog, "");
    ctl.start();
    ctl.settle().await;

    ctl.set_page(1).expect("page");
    ctl.settle().await;

    assert_eq!(catalog.call_count(), 2);
    assert_eq!(ctl.dispatched_fetches(), 2);
    assert_eq!(ctl.status(), &LoadStatus::Ready);
}

#[tokio::test]
async fn page_zero_is_rejected_without_side_effects() {
    let catalog = catalog(5).shared();
    let mut ctl = controller(&catalog, "");

    assert_eq!(ctl.set_page(0), Err(ControllerError::InvalidPage(0)));
    assert_eq!(ctl.dispatched_fetches(), 0);
    assert_eq!(ctl.status(), &LoadStatus::Idle);
}

#[tokio::test]
async fn search_paging_reslices_without_network() {
    let catalog = catalog(45).shared();
    let mut ctl = controller(&catalog, "search=atlas");
    ctl.start();
    ctl.settle().await;

    assert!(ctl.next_page());
    ctl.settle().await;
    assert!(ctl.next_page());
    ctl.settle().await;

    assert_eq!(ctl.state().page, 3);
    assert_eq!(ctl.items().len(), 5);
    assert!(!ctl.page_info().has_next);
    assert!(!ctl.next_page());
    assert_eq!(catalog.call_count(), 1);
    assert_eq!(ctl.dispatched_fetches(), 3);
}

#[tokio::test]
async fn server_paging_stops_after_short_page() {
    let catalog = catalog(25).shared();
    let mut ctl = controller(&catalog, "");
    ctl.start();
    ctl.settle().await;

    assert!(!ctl.previous_page());
    assert!(ctl.page_info().has_next);
    assert!(ctl.next_page());
    ctl.settle().await;

    assert_eq!(ctl.items().len(), 5);
    assert_eq!(ctl.page_info().total_pages, None);
    assert!(!ctl.page_info().has_next);
    assert!(!ctl.next_page());
    assert!(ctl.previous_page());
}

#[tokio::test(start_paused = true)]
async fn slow_earlier_fetch_never_overwrites_newer_result() {
    let catalog = catalog(60)
        .with_delays(&[Duration::from_millis(500), Duration::from_millis(10)])
        .shared();
    let mut ctl = controller(&catalog, "");
    ctl.start();
    ctl.set_page(2).expect("page");

    ctl.settle().await;
    assert_eq!(ctl.status(), &LoadStatus::Ready);
    let page_two: Vec<_> = ctl.items().iter().map(|i| i.id.clone()).collect();
    assert_eq!(page_two.first().map(ItemId::as_str), Some("p20"));

    // The page-one response lands afterwards and must be discarded.
    assert!(!ctl.next_completion().await);
    let after: Vec<_> = ctl.items().iter().map(|i| i.id.clone()).collect();
    assert_eq!(after, page_two);
    assert_eq!(ctl.state().page, 2);
}

#[tokio::test]
async fn external_query_overwrites_all_fields_with_one_fetch() {
    let catalog = catalog(30).shared();
    let mut ctl = controller(&catalog, "");
    ctl.start();
    ctl.settle().await;

    ctl.update_search_input("draft");
    ctl.sync_from_external_query("?category=Garden&sortBy=rating&page=2");

    let state = ctl.state();
    assert_eq!(state.category, "Garden");
    assert_eq!(state.search_input, "");
    assert_eq!(state.search_term, "");
    assert_eq!(state.sort_field, Some(SortField::Rating));
    assert_eq!(state.sort_direction, SortDirection::Desc);
    assert_eq!(state.page, 2);
    ctl.settle().await;

    assert_eq!(catalog.call_count(), 2);
    assert_eq!(ctl.dispatched_fetches(), 2);
    assert_eq!(ctl.navigation().entries().len(), 1);
}

#[tokio::test]
async fn back_navigation_is_detected_and_resynchronized() {
    let catalog = catalog(30).shared();
    let mut ctl = controller(&catalog, "");
    ctl.start();
    ctl.set_category("Books").expect("books");
    ctl.set_page(2).expect("page");
    ctl.settle().await;
    assert!(!ctl.poll_navigation());

    assert!(ctl.navigation_mut().back());
    assert!(ctl.poll_navigation());
    ctl.settle().await;

    assert_eq!(ctl.state().category, "Books");
    assert_eq!(ctl.state().page, 1);
    assert!(!ctl.poll_navigation());
}

#[tokio::test]
async fn failed_fetch_enters_errored_and_go_back_recovers() {
    let failing = FakeCatalog::failing(shared::error::CatalogError::Network(
        "connection refused".to_string(),
    ))
    .shared();
    let mut nav = MemoryNavigation::new("/products", "");
    nav.navigate_to("/products", "category=Books&page=1");
    let mut ctl = QueryStateController::new(failing.clone(), nav);

    ctl.start();
    ctl.settle().await;
    match ctl.status() {
        LoadStatus::Errored { message } => assert!(message.contains("connection refused")),
        other => panic!("expected errored, got {other:?}"),
    }
    // No automatic retry.
    assert_eq!(failing.call_count(), 1);

    assert!(ctl.go_back());
    assert_eq!(ctl.state().category, "");
    assert_eq!(ctl.status(), &LoadStatus::Loading);
    ctl.settle().await;
    assert_eq!(failing.call_count(), 2);
    assert!(!ctl.go_back());
}

#[tokio::test]
async fn category_failure_enters_errored() {
    let failing =
        FakeCatalog::failing(shared::error::CatalogError::upstream(503, "unavailable")).shared();
    let mut ctl = controller(&failing, "");

    ctl.load_categories().await.expect_err("must fail");
    assert!(matches!(ctl.status(), LoadStatus::Errored { .. }));
}

#[tokio::test]
async fn category_failure_survives_pending_item_fetch() {
    let catalog = catalog(30)
        .with_failing_categories(shared::error::CatalogError::upstream(
            503,
            "categories unavailable",
        ))
        .shared();
    let mut ctl = controller(&catalog, "");

    ctl.start();
    ctl.load_categories().await.expect_err("must fail");
    ctl.settle().await;

    match ctl.status() {
        LoadStatus::Errored { message } => assert!(message.contains("categories unavailable")),
        other => panic!("expected errored, got {other:?}"),
    }
    assert_eq!(ctl.items().len(), 20);

    // Later fetches keep reporting the failure.
    ctl.set_page(2).expect("page");
    ctl.settle().await;
    assert!(matches!(ctl.view().status, LoadStatus::Errored { .. }));
}

#[tokio::test]
async fn go_back_clears_category_failure() {
    let catalog = catalog(30)
        .with_failing_categories(shared::error::CatalogError::upstream(503, "down"))
        .shared();
    let mut ctl = controller(&catalog, "");
    ctl.start();
    ctl.set_page(2).expect("page");
    ctl.load_categories().await.expect_err("must fail");
    ctl.settle().await;
    assert!(matches!(ctl.status(), LoadStatus::Errored { .. }));

    assert!(ctl.go_back());
    ctl.settle().await;
    assert_eq!(ctl.status(), &LoadStatus::Ready);
    assert_eq!(ctl.state().page, 1);
}

#[tokio::test]
async fn clearing_sort_resets_direction_to_match_url() {
    let catalog = catalog(5).shared();
    let mut ctl = controller(&catalog, "sortBy=price&order=asc");
    ctl.start();
    ctl.settle().await;

    ctl.set_sort(None, SortDirection::Asc);

    assert_eq!(ctl.navigation().current_query(), "page=1");
    assert_eq!(ctl.state().sort_direction, SortDirection::Desc);
    assert_eq!(
        *ctl.state(),
        codec::decode(&ctl.navigation().current_query())
    );
}

#[tokio::test]
async fn image_indices_cycle_per_item_and_reset_with_new_results() {
    let catalog = catalog(30).shared();
    let mut ctl = controller(&catalog, "");
    ctl.start();
    ctl.settle().await;

    let first = ctl.items()[0].id.clone();
    let second = ctl.items()[1].id.clone();

    assert_eq!(ctl.cycle_image(&first, CycleDirection::Prev), 2);
    assert_eq!(ctl.cycle_image(&first, CycleDirection::Next), 0);
    assert_eq!(ctl.cycle_image(&first, CycleDirection::Next), 1);
    assert_eq!(ctl.image_index().index(&second), 0);

    let item = ctl.items()[0].clone();
    assert_eq!(ctl.current_image(&item), Some(item.images[1].as_str()));

    ctl.set_page(2).expect("page");
    ctl.settle().await;
    assert!(ctl.image_index().is_empty());
}

#[tokio::test]
async fn cycling_unknown_item_is_a_no_op() {
    let catalog = catalog(3).shared();
    let mut ctl = controller(&catalog, "");
    ctl.start();
    ctl.settle().await;

    assert_eq!(ctl.cycle_image(&ItemId::new("missing"), CycleDirection::Next), 0);
    assert!(ctl.image_index().is_empty());
}

#[tokio::test]
async fn empty_results_render_no_items_message() {
    let catalog = catalog(10).shared();
    let mut ctl = controller(&catalog, "search=zebra");
    ctl.start();
    ctl.settle().await;

    let view = ctl.view();
    assert_eq!(view.status, &LoadStatus::Ready);
    assert!(view.items.is_empty());
    assert_eq!(view.empty_message.as_deref(), Some("No items found for: zebra"));
    assert_eq!(view.page.total_pages, Some(0));
    assert!(!view.page.has_next);
}

#[tokio::test]
async fn detail_links_carry_list_query() {
    let catalog = catalog(3).shared();
    let mut ctl = controller(&catalog, "category=Books&page=1");
    ctl.start();
    ctl.settle().await;

    assert_eq!(
        ctl.detail_path(&ItemId::new("p00")),
        "/products/p00?category=Books&page=1"
    );
}
