//! Searchable, sortable, paginated view over the fetched listings.
//!
//! The view never owns the listings. It keeps only filter text, sort
//! settings, the page index and a cursor, and derives the visible slice from
//! whatever collection the controller hands it.

use crate::models::{RamListing, SortDirection, SortKey};

/// Listings shown per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Active sort key and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    /// Re-choosing the active key while ascending flips to descending; any
    /// other choice starts ascending.
    pub fn activate(self, key: SortKey) -> Self {
        let direction = if self.key == key {
            self.direction.toggle()
        } else {
            SortDirection::Ascending
        };
        Self { key, direction }
    }
}

/// What the track control should look like for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackControl {
    Enabled,
    Disabled,
}

impl TrackControl {
    pub fn for_item(item: &RamListing) -> Self {
        if item.is_tracked {
            TrackControl::Disabled
        } else {
            TrackControl::Enabled
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrackControl::Enabled => "Track",
            TrackControl::Disabled => "Tracked",
        }
    }
}

/// Local state of the list view.
#[derive(Debug, Clone)]
pub struct ListView {
    /// Case-insensitive substring matched against `name_raw`
    pub filter: String,
    pub sort: SortConfig,
    /// Zero-based page index as chosen by the pagination controls
    pub page: usize,
    /// Listings per page; 0 shows everything on one page
    pub page_size: usize,
    /// Highlighted row within the current page
    pub cursor: usize,
}

impl Default for ListView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ListView {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: String::new(),
            sort: SortConfig::default(),
            page: 0,
            page_size,
            cursor: 0,
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.page_size > 0
    }

    /// Filtered and sorted listings, all pages.
    pub fn derive<'a>(&self, items: &'a [RamListing]) -> Vec<&'a RamListing> {
        let mut view = filter_items(items, &self.filter);
        sort_items(&mut view, self.sort);
        view
    }

    /// Number of pages for `len` derived listings.
    pub fn page_count_for(&self, len: usize) -> usize {
        if self.is_paginated() {
            len.div_ceil(self.page_size)
        } else {
            usize::from(len > 0)
        }
    }

    pub fn page_count(&self, items: &[RamListing]) -> usize {
        self.page_count_for(self.derive(items).len())
    }

    /// The page index actually shown: the chosen page, or the last page
    /// when the derived list has shrunk below it.
    pub fn effective_page(&self, len: usize) -> usize {
        self.page.min(self.page_count_for(len).saturating_sub(1))
    }

    /// Listings on the page currently shown.
    pub fn current_page<'a>(&self, items: &'a [RamListing]) -> Vec<&'a RamListing> {
        let derived = self.derive(items);
        paginate(derived, self.effective_page_size(), self.effective_page_of(items))
    }

    fn effective_page_of(&self, items: &[RamListing]) -> usize {
        self.effective_page(self.derive(items).len())
    }

    fn effective_page_size(&self) -> usize {
        if self.is_paginated() {
            self.page_size
        } else {
            usize::MAX
        }
    }

    /// Listing under the cursor, if the page has one there.
    pub fn highlighted<'a>(&self, items: &'a [RamListing]) -> Option<&'a RamListing> {
        let page = self.current_page(items);
        let idx = self.cursor.min(page.len().saturating_sub(1));
        page.get(idx).copied()
    }

    /// Apply a sort-menu choice.
    pub fn activate_sort(&mut self, key: SortKey) {
        self.sort = self.sort.activate(key);
    }

    pub fn cycle_sort(&mut self) {
        self.activate_sort(self.sort.key.next());
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.cursor = 0;
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter.push(c);
        self.cursor = 0;
    }

    pub fn pop_filter_char(&mut self) {
        self.filter.pop();
        self.cursor = 0;
    }

    /// Jump to `page`, clamped to the pages that exist.
    pub fn go_to_page(&mut self, page: usize, items: &[RamListing]) {
        let count = self.page_count(items);
        self.page = page.min(count.saturating_sub(1));
        self.cursor = 0;
    }

    pub fn next_page(&mut self, items: &[RamListing]) {
        let current = self.effective_page_of(items);
        self.go_to_page(current + 1, items);
    }

    pub fn prev_page(&mut self, items: &[RamListing]) {
        let current = self.effective_page_of(items);
        self.go_to_page(current.saturating_sub(1), items);
    }

    pub fn first_page(&mut self, items: &[RamListing]) {
        self.go_to_page(0, items);
    }

    pub fn last_page(&mut self, items: &[RamListing]) {
        self.go_to_page(usize::MAX, items);
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self, items: &[RamListing]) {
        let rows = self.current_page(items).len();
        if self.cursor + 1 < rows {
            self.cursor += 1;
        }
    }

    pub fn cursor_top(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_bottom(&mut self, items: &[RamListing]) {
        self.cursor = self.current_page(items).len().saturating_sub(1);
    }
}

/// Keep listings whose `name_raw` contains `filter`, ignoring case.
pub fn filter_items<'a>(items: &'a [RamListing], filter: &str) -> Vec<&'a RamListing> {
    if filter.is_empty() {
        return items.iter().collect();
    }
    let needle = filter.to_lowercase();
    items
        .iter()
        .filter(|item| item.name_raw.to_lowercase().contains(&needle))
        .collect()
}

/// Stable sort by the configured key and direction.
pub fn sort_items(items: &mut [&RamListing], sort: SortConfig) {
    items.sort_by(|a, b| sort.key.compare(a, b, sort.direction));
}

/// Slice out page `page` of `page_size` listings.
pub fn paginate<T>(items: Vec<T>, page_size: usize, page: usize) -> Vec<T> {
    if page_size == 0 {
        return Vec::new();
    }
    let offset = page.saturating_mul(page_size);
    items.into_iter().skip(offset).take(page_size).collect()
}
