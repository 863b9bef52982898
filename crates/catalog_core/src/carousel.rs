//! Image carousels.
//!
//! [`ImageIndexMap`] backs the manual prev/next buttons on list cards, one
//! index per item. [`DetailCarousel`] is the auto-advancing gallery of the
//! detail view; it is a pure state machine over explicit instants, and
//! [`CarouselDriver`] runs it on the tokio timer.

use std::{collections::HashMap, time::Duration};

use shared::domain::{Item, ItemId};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, warn};

pub const AUTOPLAY_INTERVAL: Duration = Duration::from_secs(3);
pub const RESUME_DEBOUNCE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Prev,
    Next,
}

/// Wraparound step within `[0, count)`. `count` must be non-zero.
fn step(current: usize, direction: CycleDirection, count: usize) -> usize {
    let current = current % count;
    match direction {
        CycleDirection::Prev => (current + count - 1) % count,
        CycleDirection::Next => (current + 1) % count,
    }
}

/// Displayed image per list card. Absent entries mean index 0.
#[derive(Debug, Default, Clone)]
pub struct ImageIndexMap {
    indices: HashMap<ItemId, usize>,
}

impl ImageIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self, id: &ItemId) -> usize {
        self.indices.get(id).copied().unwrap_or(0)
    }

    /// Moves one image forward or back for `id`. A zero `image_count` is a
    /// no-op. Returns the new index.
    pub fn cycle(&mut self, id: &ItemId, direction: CycleDirection, image_count: usize) -> usize {
        if image_count == 0 {
            return self.index(id);
        }
        let next = step(self.index(id), direction, image_count);
        self.indices.insert(id.clone(), next);
        next
    }

    pub fn current_image<'a>(&self, item: &'a Item) -> Option<&'a str> {
        item.images
            .get(self.index(&item.id))
            .or_else(|| item.images.first())
            .map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselMode {
    Autoplay,
    Paused,
}

/// User activity on the gallery. All kinds pause autoplay the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Scroll,
    TouchStart,
    PointerDown,
    ThumbnailClick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselSnapshot {
    pub current_index: usize,
    pub image_count: usize,
    pub mode: CarouselMode,
    pub user_interacted: bool,
    pub ready_to_display: bool,
    pub resume_count: u64,
}

#[derive(Debug, Clone)]
pub struct DetailCarousel {
    current_index: usize,
    image_count: usize,
    mode: CarouselMode,
    next_advance_at: Option<Instant>,
    pending_resume_deadline: Option<Instant>,
    ready_to_display: bool,
    resume_count: u64,
}

impl DetailCarousel {
    pub fn new(image_count: usize, now: Instant) -> Self {
        let mut carousel = Self {
            current_index: 0,
            image_count,
            mode: CarouselMode::Autoplay,
            next_advance_at: None,
            pending_resume_deadline: None,
            ready_to_display: false,
            resume_count: 0,
        };
        carousel.schedule_advance(now);
        carousel
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn mode(&self) -> CarouselMode {
        self.mode
    }

    pub fn user_interacted(&self) -> bool {
        self.mode == CarouselMode::Paused
    }

    pub fn pending_resume_deadline(&self) -> Option<Instant> {
        self.pending_resume_deadline
    }

    pub fn ready_to_display(&self) -> bool {
        self.ready_to_display
    }

    /// Number of paused-to-autoplay transitions so far.
    pub fn resume_count(&self) -> u64 {
        self.resume_count
    }

    fn cycles(&self) -> bool {
        self.image_count > 1
    }

    fn schedule_advance(&mut self, from: Instant) {
        self.next_advance_at = self.cycles().then(|| from + AUTOPLAY_INTERVAL);
    }

    pub fn interaction(&mut self, kind: Interaction, now: Instant) {
        debug!(?kind, "carousel interaction; pausing autoplay");
        self.mode = CarouselMode::Paused;
        self.next_advance_at = None;
        // Replaces any pending deadline; timers never stack.
        self.pending_resume_deadline = Some(now + RESUME_DEBOUNCE);
    }

    pub fn thumbnail_click(&mut self, index: usize, now: Instant) {
        if index >= self.image_count {
            warn!(index, image_count = self.image_count, "ignoring out-of-range thumbnail");
            return;
        }
        self.current_index = index;
        self.interaction(Interaction::ThumbnailClick, now);
    }

    pub fn image_loaded(&mut self) {
        self.ready_to_display = true;
    }

    /// Earliest instant at which [`DetailCarousel::on_deadline`] has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.mode {
            CarouselMode::Paused => self.pending_resume_deadline,
            CarouselMode::Autoplay => self.next_advance_at,
        }
    }

    /// Processes every deadline that is due at `now`.
    pub fn on_deadline(&mut self, now: Instant) {
        while let Some(deadline) = self.next_deadline().filter(|d| *d <= now) {
            match self.mode {
                CarouselMode::Paused => {
                    self.pending_resume_deadline = None;
                    self.mode = CarouselMode::Autoplay;
                    self.resume_count += 1;
                    self.schedule_advance(deadline);
                    debug!("carousel debounce elapsed; resuming autoplay");
                }
                CarouselMode::Autoplay => {
                    self.current_index =
                        step(self.current_index, CycleDirection::Next, self.image_count);
                    self.schedule_advance(deadline);
                }
            }
        }
    }

    pub fn snapshot(&self) -> CarouselSnapshot {
        CarouselSnapshot {
            current_index: self.current_index,
            image_count: self.image_count,
            mode: self.mode,
            user_interacted: self.user_interacted(),
            ready_to_display: self.ready_to_display,
            resume_count: self.resume_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselCommand {
    Interact(Interaction),
    ThumbnailClick(usize),
    ImageLoaded,
}

/// Owns the single active detail carousel and its timers. Dropping the driver
/// aborts the task, which cancels any pending autoplay or debounce sleep.
pub struct CarouselDriver {
    commands: mpsc::UnboundedSender<CarouselCommand>,
    snapshots: watch::Receiver<CarouselSnapshot>,
    task: JoinHandle<()>,
}

impl CarouselDriver {
    pub fn spawn(image_count: usize) -> Self {
        let carousel = DetailCarousel::new(image_count, Instant::now());
        let (commands, mut command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(carousel.snapshot());

        let task = tokio::spawn(async move {
            let mut carousel = carousel;
            loop {
                let deadline = carousel.next_deadline();
                tokio::select! {
                    command = command_rx.recv() => {
                        let Some(command) = command else { break };
                        let now = Instant::now();
                        match command {
                            CarouselCommand::Interact(kind) => carousel.interaction(kind, now),
                            CarouselCommand::ThumbnailClick(index) => {
                                carousel.thumbnail_click(index, now)
                            }
                            CarouselCommand::ImageLoaded => carousel.image_loaded(),
                        }
                    }
                    _ = async {
                        match deadline {
                            Some(at) => sleep_until(at).await,
                            None => std::future::pending::<()>().await,
                        }
                    } => {
                        carousel.on_deadline(Instant::now());
                    }
                }
                snapshot_tx.send_replace(carousel.snapshot());
            }
        });

        Self {
            commands,
            snapshots,
            task,
        }
    }

    pub fn send(&self, command: CarouselCommand) {
        if self.commands.send(command).is_err() {
            warn!(?command, "carousel task is gone; dropping command");
        }
    }

    pub fn interact(&self, kind: Interaction) {
        self.send(CarouselCommand::Interact(kind));
    }

    pub fn thumbnail_click(&self, index: usize) {
        self.send(CarouselCommand::ThumbnailClick(index));
    }

    pub fn image_loaded(&self) {
        self.send(CarouselCommand::ImageLoaded);
    }

    pub fn snapshot(&self) -> CarouselSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CarouselSnapshot> {
        self.snapshots.clone()
    }
}

impl Drop for CarouselDriver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "tests/carousel_tests.rs"]
mod tests;
