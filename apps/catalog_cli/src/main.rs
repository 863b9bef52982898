use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use catalog_core::{
    codec, CatalogClient, DetailView, FilterState, HttpCatalogClient, MemoryNavigation,
    QueryStateController,
};
use clap::{Parser, Subcommand};
use shared::domain::{ItemId, SortDirection, SortField};
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

mod config;
mod render;
mod session;

use config::{load_settings, normalize_base_url};

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides the configured catalog service URL.
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of the product list.
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// price or rating
        #[arg(long)]
        sort: Option<String>,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        order: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Categories,
    /// Show one item and, with --watch, follow its image carousel.
    Detail {
        id: String,
        #[arg(long, default_value_t = 0)]
        watch: u64,
    },
    /// Interactive session reading commands from stdin.
    Browse {
        /// Starting list query, e.g. "category=beauty&page=2".
        #[arg(long, default_value = "")]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut settings, config_warnings) = load_settings();
    if let Some(base_url) = &cli.base_url {
        settings.catalog_base_url = normalize_base_url(base_url);
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout_secs = secs;
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();
    for warning in &config_warnings {
        warn!(%warning, "configuration value ignored");
    }
    info!(base_url = %settings.catalog_base_url, "using catalog service");

    let client: Arc<dyn CatalogClient> = Arc::new(
        HttpCatalogClient::with_timeout(&settings.catalog_base_url, settings.request_timeout())
            .context("failed to build catalog client")?,
    );

    match cli.command {
        Command::List {
            category,
            search,
            sort,
            order,
            page,
        } => {
            let sort_field = sort
                .map(|raw| {
                    raw.parse::<SortField>()
                        .map_err(|()| anyhow!("--sort must be price or rating, got {raw}"))
                })
                .transpose()?;
            let sort_direction = order
                .parse::<SortDirection>()
                .map_err(|()| anyhow!("--order must be asc or desc, got {order}"))?;
            let search = search.unwrap_or_default();
            let filter = FilterState {
                category: category.unwrap_or_default(),
                search_input: search.clone(),
                search_term: search,
                sort_field,
                sort_direction,
                page: page.max(1),
                ..FilterState::default()
            };
            list_once(client, &codec::encode(&filter)).await?;
        }
        Command::Categories => {
            let mut list = QueryStateController::new(client, MemoryNavigation::default());
            let categories = list
                .load_categories()
                .await
                .context("failed to load categories")?;
            print!("{}", render::categories(categories));
        }
        Command::Detail { id, watch } => {
            show_detail(client.as_ref(), &ItemId::new(id), Duration::from_secs(watch)).await;
        }
        Command::Browse { query } => session::run(client, &query).await?,
    }

    Ok(())
}

async fn list_once(client: Arc<dyn CatalogClient>, query: &str) -> Result<()> {
    let mut list = QueryStateController::new(client, MemoryNavigation::new("/", query));
    list.start();
    list.settle().await;
    let view = list.view();
    if let catalog_core::LoadStatus::Errored { message } = view.status {
        return Err(anyhow!("failed to load products: {message}"));
    }
    print!("{}", render::list_view(&view, |_| None));
    Ok(())
}

async fn show_detail(client: &dyn CatalogClient, id: &ItemId, watch: Duration) {
    let view = DetailView::open(client, id, "").await;
    print!("{}", render::detail(&view.state));
    let (Some(carousel), Some(item)) = (view.carousel(), view.state.item()) else {
        return;
    };
    carousel.image_loaded();
    print!("{}", render::carousel(&carousel.snapshot(), &item.images));

    let mut updates = carousel.subscribe();
    let until = Instant::now() + watch;
    while let Ok(Ok(())) = timeout_at(until, updates.changed()).await {
        let snapshot = updates.borrow_and_update().clone();
        print!("{}", render::carousel(&snapshot, &item.images));
    }
}
