//! Application state and logic.
//!
//! The controller owns the fetched listings, the list view, the chart modal
//! and the single selection slot. Network calls run as spawned tasks and
//! report back as [`AppEvent`]s, which the UI loop drains between frames.

use crate::api::PriceTrackerClient;
use crate::chart::{ChartModal, ChartState};
use crate::cli::Args;
use crate::config::Config;
use crate::error::ApiError;
use crate::listing::{ListView, SortConfig, TrackControl};
use crate::models::{ChartSeries, RamListing, SortKey};
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shown when the listing fetch fails without a message of its own.
pub const LOAD_FALLBACK_ERROR: &str =
    "Failed to load RAM data. Make sure the backend server is running.";

/// How long a notice stays on screen.
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Results of background requests.
#[derive(Debug)]
pub enum AppEvent {
    ListingsLoaded {
        request: u64,
        result: Result<Vec<RamListing>, ApiError>,
    },
    SeriesLoaded {
        request: u64,
        result: Result<ChartSeries, ApiError>,
    },
    TrackFinished {
        item_id: i64,
        result: Result<(), ApiError>,
    },
}

/// Lifecycle of the listing fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// Which input the keyboard is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Browse,
    Search,
    SortMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient acknowledgment shown over the list.
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    shown_at: Instant,
}

impl Notice {
    fn new(message: impl Into<String>, level: NoticeLevel) -> Self {
        Self {
            message: message.into(),
            level,
            shown_at: Instant::now(),
        }
    }

    fn expired(&self) -> bool {
        self.shown_at.elapsed() >= NOTICE_TTL
    }
}

/// Application state.
pub struct App {
    /// Full listing collection as last fetched
    pub items: Vec<RamListing>,
    pub load: LoadState,
    pub list: ListView,
    /// The selected listing; the chart modal is visible iff this is set
    pub selected: Option<RamListing>,
    pub chart: ChartModal,
    pub notice: Option<Notice>,
    pub mode: InputMode,
    pub show_help: bool,
    pub currency: String,
    pub last_loaded: Option<Instant>,
    /// Is the app running
    pub running: bool,
    client: PriceTrackerClient,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    chart_task: Option<JoinHandle<()>>,
    /// Id of the newest listing fetch; older results are dropped
    load_request: u64,
    /// Spinner frame counter
    pub tick: usize,
}

impl App {
    /// Create a new application from CLI args and config.
    pub fn new(args: &Args, config: &Config) -> Result<Self> {
        let client = PriceTrackerClient::new(&config.api.base_url, config.api.timeout)
            .context("Failed to create API client")?;

        let mut list = ListView::new(config.display.page_size);
        list.sort = SortConfig {
            key: config.display.sort_key(),
            direction: config.display.sort_direction(),
        };
        if let Some(ref filter) = args.filter {
            list.set_filter(filter.clone());
        }

        let (events_tx, events_rx) = unbounded_channel();

        Ok(Self {
            items: Vec::new(),
            load: LoadState::Loading,
            list,
            selected: None,
            chart: ChartModal::new(&config.display.currency),
            notice: None,
            mode: InputMode::Browse,
            show_help: false,
            currency: config.display.currency.clone(),
            last_loaded: None,
            running: true,
            client,
            events_tx,
            events_rx,
            chart_task: None,
            load_request: 0,
            tick: 0,
        })
    }

    /// Fetch the listing collection in the background.
    pub fn start_load(&mut self) {
        self.load = LoadState::Loading;
        self.load_request += 1;
        let request = self.load_request;
        info!(url = self.client.base_url(), request, "loading listings");

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.list_items().await;
            let _ = tx.send(AppEvent::ListingsLoaded { request, result });
        });
    }

    /// Apply every event that has arrived. Returns how many were applied.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ListingsLoaded { request, .. } if request != self.load_request => {
                debug!(request, "dropping superseded listing load");
            }
            AppEvent::ListingsLoaded {
                result: Ok(items), ..
            } => {
                info!(count = items.len(), "listings loaded");
                self.items = items;
                self.load = LoadState::Ready;
                self.last_loaded = Some(Instant::now());
            }
            AppEvent::ListingsLoaded { result: Err(e), .. } => {
                warn!(status = ?e.status(), error = %e, "listing load failed");
                self.load = LoadState::Failed(e.user_message(LOAD_FALLBACK_ERROR));
            }
            AppEvent::SeriesLoaded { request, result } => {
                let Some(item) = self.selected.as_ref() else {
                    debug!(request, "dropping chart data for closed modal");
                    return;
                };
                if !self.chart.resolve(request, item, result) {
                    debug!(request, "dropping stale chart data");
                }
            }
            AppEvent::TrackFinished { item_id, result } => match result {
                Ok(()) => {
                    self.mark_tracked(item_id);
                    self.notice = Some(Notice::new(
                        format!("Added RAM {} to tracking", item_id),
                        NoticeLevel::Success,
                    ));
                }
                Err(e) => {
                    warn!(item_id, status = ?e.status(), error = %e, "track failed");
                    self.notice = Some(Notice::new(
                        "Failed to add to tracking",
                        NoticeLevel::Error,
                    ));
                }
            },
        }
    }

    fn mark_tracked(&mut self, item_id: i64) {
        for item in self.items.iter_mut().filter(|i| i.id == item_id) {
            item.is_tracked = true;
        }
        if let Some(selected) = self.selected.as_mut() {
            if selected.id == item_id {
                selected.is_tracked = true;
            }
        }
    }

    /// Listings on the current page, or none until the list is ready.
    pub fn page_items(&self) -> Vec<&RamListing> {
        match self.load {
            LoadState::Ready => self.list.current_page(&self.items),
            _ => Vec::new(),
        }
    }

    /// Listing under the cursor.
    pub fn highlighted(&self) -> Option<&RamListing> {
        match self.load {
            LoadState::Ready => self.list.highlighted(&self.items),
            _ => None,
        }
    }

    pub fn is_chart_visible(&self) -> bool {
        self.selected.is_some()
    }

    /// Select the highlighted listing and open its price chart.
    pub fn open_highlighted(&mut self) {
        if let Some(item) = self.highlighted().cloned() {
            self.select(item);
        }
    }

    /// Put `item` in the selection slot and start fetching its series.
    pub fn select(&mut self, item: RamListing) {
        if let Some(task) = self.chart_task.take() {
            task.abort();
        }

        let request = self.chart.open();
        let item_id = item.id;
        self.selected = Some(item);
        debug!(item_id, request, "opening chart");

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        self.chart_task = Some(tokio::spawn(async move {
            let result = client.fetch_series(item_id).await;
            let _ = tx.send(AppEvent::SeriesLoaded { request, result });
        }));
    }

    /// Close the chart modal and clear the selection.
    pub fn close_chart(&mut self) {
        if let Some(task) = self.chart_task.take() {
            task.abort();
        }
        self.chart.close();
        self.selected = None;
    }

    /// Ask the backend to track the highlighted listing.
    ///
    /// Returns false when nothing was sent because the listing is already
    /// tracked or there is no highlighted listing.
    pub fn track_highlighted(&mut self) -> bool {
        let Some(item) = self.highlighted() else {
            return false;
        };
        if TrackControl::for_item(item) == TrackControl::Disabled {
            return false;
        }
        let item_id = item.id;
        self.track(item_id);
        true
    }

    fn track(&mut self, item_id: i64) {
        info!(item_id, "requesting tracking");
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.track_item(item_id).await;
            let _ = tx.send(AppEvent::TrackFinished { item_id, result });
        });
    }

    /// Drop the list and fetch it again.
    pub fn reload(&mut self) {
        self.close_chart();
        self.items.clear();
        self.start_load();
    }

    /// Per-frame housekeeping.
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        if self.notice.as_ref().is_some_and(Notice::expired) {
            self.notice = None;
        }
    }

    pub fn activate_sort(&mut self, key: SortKey) {
        self.list.activate_sort(key);
        self.mode = InputMode::Browse;
    }

    pub fn next_page(&mut self) {
        self.list.next_page(&self.items);
    }

    pub fn prev_page(&mut self) {
        self.list.prev_page(&self.items);
    }

    pub fn first_page(&mut self) {
        self.list.first_page(&self.items);
    }

    pub fn last_page(&mut self) {
        self.list.last_page(&self.items);
    }

    pub fn select_up(&mut self) {
        self.list.cursor_up();
    }

    pub fn select_down(&mut self) {
        self.list.cursor_down(&self.items);
    }

    pub fn select_top(&mut self) {
        self.list.cursor_top();
    }

    pub fn select_bottom(&mut self) {
        self.list.cursor_bottom(&self.items);
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn should_quit(&self) -> bool {
        !self.running
    }

    /// Number of listings left after filtering.
    pub fn match_count(&self) -> usize {
        self.list.derive(&self.items).len()
    }

    pub fn chart_state(&self) -> &ChartState {
        &self.chart.state
    }

    /// Time since the list was last fetched, e.g. "2m 5s ago".
    pub fn time_since_load(&self) -> String {
        match self.last_loaded {
            Some(t) => {
                let elapsed = Duration::from_secs(t.elapsed().as_secs());
                format!("{} ago", humantime::format_duration(elapsed))
            }
            None => "never".to_string(),
        }
    }
}
