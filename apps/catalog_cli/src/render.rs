//! Plain-text rendering of list and detail views.

use std::fmt::Write as _;

use catalog_core::{CarouselMode, CarouselSnapshot, DetailState, ListView, LoadStatus};
use shared::domain::Item;

pub fn list_view(
    view: &ListView<'_>,
    image_of: impl Fn(&Item) -> Option<(usize, usize)>,
) -> String {
    let mut out = String::new();
    let filter = view.filter;
    let category = if filter.category.is_empty() {
        "all"
    } else {
        filter.category.as_str()
    };
    let search = if filter.search_term.is_empty() {
        "-"
    } else {
        filter.search_term.as_str()
    };
    let _ = writeln!(
        out,
        "category: {category} | search: {search} | sort: {} | page {}{}",
        filter
            .sort_field
            .map(|field| format!("{} {}", field.as_str(), filter.sort_direction.as_str()))
            .unwrap_or_else(|| "none".to_string()),
        view.page.page,
        view.page
            .total_pages
            .map(|total| format!(" of {total}"))
            .unwrap_or_default(),
    );

    match view.status {
        LoadStatus::Idle => out.push_str("idle\n"),
        LoadStatus::Loading => out.push_str("loading...\n"),
        LoadStatus::Errored { message } => {
            let _ = writeln!(out, "error: {message} (type `back` to return)");
        }
        LoadStatus::Ready => {
            if let Some(message) = &view.empty_message {
                let _ = writeln!(out, "{message}");
            }
            for item in view.items {
                let _ = write!(
                    out,
                    "{:>6}  {:<40}  {:>9.2}  {:>4.1}",
                    item.id.as_str(),
                    item.title,
                    item.price,
                    item.rating
                );
                if let Some((index, count)) = image_of(item) {
                    let _ = write!(out, "  [img {}/{}]", index + 1, count);
                }
                out.push('\n');
            }
        }
    }

    let mut nav = Vec::new();
    if view.page.has_prev {
        nav.push("prev");
    }
    if view.page.has_next {
        nav.push("next");
    }
    if !nav.is_empty() {
        let _ = writeln!(out, "({})", nav.join(" | "));
    }
    out
}

pub fn categories(categories: &[String]) -> String {
    let mut out = String::from("all\n");
    for category in categories {
        out.push_str(category);
        out.push('\n');
    }
    out
}

pub fn detail(state: &DetailState) -> String {
    let item = match state {
        DetailState::Loaded(item) => item,
        DetailState::NotFound { id, message } => return format!("{message} (item {id})\n"),
    };
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", item.title, item.id);
    let _ = writeln!(out, "price: {:.2}  rating: {:.1}", item.price, item.rating);
    if !item.category.is_empty() {
        let _ = writeln!(out, "category: {}", item.category);
    }
    if let Some(brand) = &item.brand {
        let _ = writeln!(out, "brand: {brand}");
    }
    if let Some(stock) = item.stock {
        let _ = writeln!(out, "stock: {stock}");
    }
    if !item.tags.is_empty() {
        let _ = writeln!(out, "tags: {}", item.tags.join(", "));
    }
    if let Some(description) = &item.description {
        let _ = writeln!(out, "{description}");
    }
    out
}

pub fn carousel(snapshot: &CarouselSnapshot, images: &[String]) -> String {
    let Some(url) = images.get(snapshot.current_index) else {
        return "no images\n".to_string();
    };
    let mode = match snapshot.mode {
        CarouselMode::Autoplay => "autoplay",
        CarouselMode::Paused => "paused",
    };
    format!(
        "image {}/{} ({mode}): {url}\n",
        snapshot.current_index + 1,
        snapshot.image_count
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
