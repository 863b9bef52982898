//! Interactive browse session: one list controller driven by lines on stdin,
//! with at most one detail view open on top of it.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use catalog_core::{
    codec, CatalogClient, CycleDirection, DetailView, Interaction, MemoryNavigation, Navigation,
    QueryStateController,
};
use shared::domain::{ItemId, SortDirection, SortField};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::render;

pub const HELP: &str = "\
commands:
  type <text>              edit the search box without applying it
  search [text]            apply the search box (optionally replacing it first)
  category [name]          filter by category; no name shows all
  sort <price|rating|none> [asc|desc]
  page <n> | next | prev
  cycle <id> [next|prev]   cycle a card's image
  open <id>                open the detail view
  thumb <n> | scroll       interact with the open detail gallery
  show                     redraw the current view
  back                     leave the detail view, or step back in history
  categories | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Type(String),
    Search(Option<String>),
    Category(String),
    Sort(Option<SortField>, SortDirection),
    Page(u32),
    Next,
    Prev,
    Cycle(ItemId, CycleDirection),
    Open(ItemId),
    Thumbnail(usize),
    Scroll,
    Show,
    Back,
    Categories,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<SessionCommand> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(word, rest)| (word, rest.trim()))
        .unwrap_or((line, ""));

    let command = match word {
        "type" => SessionCommand::Type(rest.to_string()),
        "search" | "/" => SessionCommand::Search((!rest.is_empty()).then(|| rest.to_string())),
        "category" | "cat" => SessionCommand::Category(rest.to_string()),
        "sort" => {
            let mut args = rest.split_whitespace();
            let field = match args.next() {
                None | Some("none") => None,
                Some(raw) => Some(
                    raw.parse::<SortField>()
                        .map_err(|()| anyhow!("unknown sort field: {raw}"))?,
                ),
            };
            let direction = match args.next() {
                None => SortDirection::default(),
                Some(raw) => raw
                    .parse::<SortDirection>()
                    .map_err(|()| anyhow!("unknown sort order: {raw}"))?,
            };
            SessionCommand::Sort(field, direction)
        }
        "page" => SessionCommand::Page(
            rest.parse()
                .map_err(|_| anyhow!("page needs a number, got `{rest}`"))?,
        ),
        "next" | "n" => SessionCommand::Next,
        "prev" | "p" => SessionCommand::Prev,
        "cycle" => {
            let mut args = rest.split_whitespace();
            let id = args.next().ok_or_else(|| anyhow!("cycle needs an item id"))?;
            let direction = match args.next() {
                None | Some("next") => CycleDirection::Next,
                Some("prev") => CycleDirection::Prev,
                Some(other) => bail!("unknown cycle direction: {other}"),
            };
            SessionCommand::Cycle(ItemId::new(id), direction)
        }
        "open" => {
            if rest.is_empty() {
                bail!("open needs an item id");
            }
            SessionCommand::Open(ItemId::new(rest))
        }
        "thumb" => SessionCommand::Thumbnail(
            rest.parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| anyhow!("thumb needs an image number starting at 1"))?,
        ),
        "scroll" => SessionCommand::Scroll,
        "show" | "" => SessionCommand::Show,
        "back" | "b" => SessionCommand::Back,
        "categories" => SessionCommand::Categories,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        other => bail!("unknown command: {other} (try `help`)"),
    };
    Ok(command)
}

pub struct BrowseSession {
    client: Arc<dyn CatalogClient>,
    list: QueryStateController<MemoryNavigation>,
    detail: Option<DetailView>,
}

impl BrowseSession {
    pub fn new(client: Arc<dyn CatalogClient>, initial_query: &str) -> Self {
        let navigation = MemoryNavigation::new("/", initial_query);
        Self {
            list: QueryStateController::new(Arc::clone(&client), navigation),
            client,
            detail: None,
        }
    }

    pub async fn start(&mut self) -> String {
        self.list.start();
        if let Err(err) = self.list.load_categories().await {
            debug!(error = %err, "continuing without category validation");
        }
        self.list.settle().await;
        self.render()
    }

    /// Runs one command. Returns `None` when the session should end.
    pub async fn handle(&mut self, command: SessionCommand) -> Result<Option<String>> {
        match command {
            SessionCommand::Quit => return Ok(None),
            SessionCommand::Help => return Ok(Some(format!("{HELP}\n"))),
            SessionCommand::Show => {}
            SessionCommand::Categories => {
                return Ok(Some(render::categories(self.list.categories())));
            }
            SessionCommand::Back => self.back().await,
            SessionCommand::Thumbnail(index) => {
                self.open_carousel()?.thumbnail_click(index);
                tokio::task::yield_now().await;
            }
            SessionCommand::Scroll => {
                self.open_carousel()?.interact(Interaction::Scroll);
                tokio::task::yield_now().await;
            }
            SessionCommand::Open(id) => self.open(id).await,
            list_command => {
                if self.detail.is_some() {
                    bail!("close the detail view with `back` first");
                }
                self.apply_list_command(list_command)?;
                self.list.settle().await;
            }
        }
        Ok(Some(self.render()))
    }

    fn apply_list_command(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::Type(text) => self.list.update_search_input(&text),
            SessionCommand::Search(text) => {
                if let Some(text) = text {
                    self.list.update_search_input(&text);
                }
                self.list.key_signal("Enter");
            }
            SessionCommand::Category(name) => self.list.set_category(&name)?,
            SessionCommand::Sort(field, direction) => self.list.set_sort(field, direction),
            SessionCommand::Page(page) => self.list.set_page(page)?,
            SessionCommand::Next => {
                if !self.list.next_page() {
                    bail!("already on the last page");
                }
            }
            SessionCommand::Prev => {
                if !self.list.previous_page() {
                    bail!("already on the first page");
                }
            }
            SessionCommand::Cycle(id, direction) => {
                self.list.cycle_image(&id, direction);
            }
            other => debug!(?other, "not a list command"),
        }
        Ok(())
    }

    async fn open(&mut self, id: ItemId) {
        let link = self.list.detail_path(&id);
        let (path, query) = link.split_once('?').unwrap_or((link.as_str(), ""));
        self.list.navigation_mut().navigate_to(path, query);
        self.show_detail(&id, query).await;
    }

    async fn show_detail(&mut self, id: &ItemId, list_query: &str) {
        let view = DetailView::open(self.client.as_ref(), id, list_query).await;
        if let Some(carousel) = view.carousel() {
            carousel.image_loaded();
        }
        self.detail = Some(view);
    }

    async fn back(&mut self) {
        match self.detail.take() {
            Some(view) => {
                view.back(self.list.navigation_mut());
                self.list.poll_navigation();
            }
            None => {
                if self.list.go_back() {
                    self.reopen_detail_entry().await;
                }
            }
        }
        self.list.settle().await;
    }

    /// History can step back onto a detail entry; show that item again.
    async fn reopen_detail_entry(&mut self) {
        let entry = self.list.navigation().current().clone();
        let Some(id) = codec::detail_id(&entry.path) else {
            return;
        };
        debug!(%id, "history returned to a detail view");
        self.show_detail(&id, &entry.query).await;
    }

    fn open_carousel(&self) -> Result<&catalog_core::CarouselDriver> {
        self.detail
            .as_ref()
            .and_then(DetailView::carousel)
            .ok_or_else(|| anyhow!("no detail gallery is open"))
    }

    pub fn render(&self) -> String {
        if let Some(view) = &self.detail {
            let mut out = render::detail(&view.state);
            if let (Some(carousel), Some(item)) = (view.carousel(), view.state.item()) {
                out.push_str(&render::carousel(&carousel.snapshot(), &item.images));
            }
            return out;
        }
        let list = &self.list;
        render::list_view(&list.view(), |item| {
            (item.image_count() > 1)
                .then(|| (list.image_index().index(&item.id), item.image_count()))
        })
    }

    pub fn current_query(&self) -> String {
        self.list.navigation().current_query()
    }
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run(client: Arc<dyn CatalogClient>, initial_query: &str) -> Result<()> {
    let mut session = BrowseSession::new(client, initial_query);
    print!("{}", session.start().await);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match session.handle(command).await {
            Ok(Some(output)) => {
                print!("{output}");
                println!("?{}", session.current_query());
            }
            Ok(None) => break,
            Err(err) => eprintln!("{err}"),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
