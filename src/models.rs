//! Data models for RAM listings and their price history.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A memory-module listing with its most recently scraped price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamListing {
    /// Unique listing id assigned by the backend
    pub id: i64,
    /// Manufacturer
    #[serde(default)]
    pub brand: Option<String>,
    /// Listing title as scraped
    pub name_raw: String,
    /// Product category (e.g. "DDR5 desktop")
    #[serde(default)]
    pub category: Option<String>,
    /// Module capacity, e.g. "32GB (16GBx2)"
    #[serde(default)]
    pub capacity: Option<String>,
    /// Rated speed, e.g. "6000"
    #[serde(default)]
    pub speed: Option<String>,
    /// CAS latency, e.g. "CL30"
    #[serde(default)]
    pub latency: Option<String>,
    /// Whether the kit is sold as a dual-channel pair
    #[serde(default)]
    pub is_dual_channel: bool,
    /// Latest observed price
    #[serde(default)]
    pub latest_price: Option<f64>,
    /// Latest availability state
    #[serde(default)]
    pub latest_status: Option<String>,
    /// When the latest price was scraped
    #[serde(default)]
    pub latest_scraped_at: Option<String>,
    /// Whether the backend is already tracking this listing
    #[serde(default)]
    pub is_tracked: bool,
}

impl RamListing {
    /// Brand and name joined for display.
    pub fn display_name(&self) -> String {
        match self.brand.as_deref() {
            Some(brand) if !brand.is_empty() => format!("{} {}", brand, self.name_raw),
            _ => self.name_raw.clone(),
        }
    }

    /// Card detail line: category, capacity, speed and latency, skipping
    /// missing parts.
    pub fn spec_line(&self) -> String {
        let mut parts: Vec<&str> = [&self.category, &self.capacity, &self.speed, &self.latency]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect();
        if self.is_dual_channel {
            parts.push("dual-channel");
        }
        parts.join(" ")
    }

    /// Scrape timestamp rendered in local time, falling back to the raw text.
    pub fn scraped_at_local(&self) -> Option<String> {
        self.latest_scraped_at.as_deref().map(format_timestamp)
    }
}

/// Render a backend timestamp as local date/time.
///
/// The backend emits either RFC 3339 or naive ISO timestamps; anything
/// else is shown as received.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return naive.format("%Y-%m-%d %H:%M").to_string();
        }
    }
    raw.to_string()
}

/// Historical price series for one listing, index-aligned.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartSeries {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Check that every date has exactly one price.
    pub fn is_aligned(&self) -> bool {
        self.dates.len() == self.prices.len()
    }
}

/// One historical price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub status: String,
    pub scraped_at: String,
}

/// Field a listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Brand,
    Name,
    Capacity,
    Speed,
    Latency,
    #[default]
    Price,
    Status,
    LastUpdated,
}

impl SortKey {
    /// Every key, in menu order.
    pub const ALL: [SortKey; 8] = [
        SortKey::Brand,
        SortKey::Name,
        SortKey::Capacity,
        SortKey::Speed,
        SortKey::Latency,
        SortKey::Price,
        SortKey::Status,
        SortKey::LastUpdated,
    ];

    /// Get the next sort key in cycle.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Menu label.
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Brand => "Brand",
            SortKey::Name => "Name",
            SortKey::Capacity => "Capacity",
            SortKey::Speed => "Speed",
            SortKey::Latency => "Latency",
            SortKey::Price => "Price",
            SortKey::Status => "Status",
            SortKey::LastUpdated => "Last Updated",
        }
    }

    /// Listing field this key sorts on, as named by the API.
    pub fn field_name(&self) -> &'static str {
        match self {
            SortKey::Brand => "brand",
            SortKey::Name => "name_raw",
            SortKey::Capacity => "capacity",
            SortKey::Speed => "speed",
            SortKey::Latency => "latency",
            SortKey::Price => "latest_price",
            SortKey::Status => "latest_status",
            SortKey::LastUpdated => "latest_scraped_at",
        }
    }

    /// Parse a config-file field name such as `latest_price` or `price`.
    pub fn from_field(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "brand" => Some(SortKey::Brand),
            "name" | "name_raw" => Some(SortKey::Name),
            "capacity" => Some(SortKey::Capacity),
            "speed" => Some(SortKey::Speed),
            "latency" => Some(SortKey::Latency),
            "price" | "latest_price" => Some(SortKey::Price),
            "status" | "latest_status" => Some(SortKey::Status),
            "last_updated" | "latest_scraped_at" => Some(SortKey::LastUpdated),
            _ => None,
        }
    }

    /// Three-way comparison of two listings on this key, ascending.
    ///
    /// Missing values are reported as `None` so the caller can keep them
    /// last regardless of direction.
    fn compare_present(&self, a: &RamListing, b: &RamListing) -> Option<Ordering> {
        match self {
            SortKey::Brand => cmp_present(a.brand.as_ref(), b.brand.as_ref(), Ord::cmp),
            SortKey::Name => Some(a.name_raw.cmp(&b.name_raw)),
            SortKey::Capacity => cmp_present(a.capacity.as_ref(), b.capacity.as_ref(), Ord::cmp),
            SortKey::Speed => cmp_present(a.speed.as_ref(), b.speed.as_ref(), Ord::cmp),
            SortKey::Latency => cmp_present(a.latency.as_ref(), b.latency.as_ref(), Ord::cmp),
            SortKey::Price => cmp_present(a.latest_price.as_ref(), b.latest_price.as_ref(), |x, y| {
                x.total_cmp(y)
            }),
            SortKey::Status => cmp_present(
                a.latest_status.as_ref(),
                b.latest_status.as_ref(),
                Ord::cmp,
            ),
            SortKey::LastUpdated => cmp_present(
                a.latest_scraped_at.as_ref(),
                b.latest_scraped_at.as_ref(),
                Ord::cmp,
            ),
        }
    }

    /// Compare two listings on this key in the given direction.
    ///
    /// The direction flips only the comparison of present values; listings
    /// missing the field always sort after those that have it.
    pub fn compare(&self, a: &RamListing, b: &RamListing, direction: SortDirection) -> Ordering {
        match self.compare_present(a, b) {
            Some(ord) => match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            },
            None => missing_last(self.is_missing(a), self.is_missing(b)),
        }
    }

    fn is_missing(&self, item: &RamListing) -> bool {
        match self {
            SortKey::Brand => item.brand.is_none(),
            SortKey::Name => false,
            SortKey::Capacity => item.capacity.is_none(),
            SortKey::Speed => item.speed.is_none(),
            SortKey::Latency => item.latency.is_none(),
            SortKey::Price => item.latest_price.is_none(),
            SortKey::Status => item.latest_status.is_none(),
            SortKey::LastUpdated => item.latest_scraped_at.is_none(),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn cmp_present<T, F>(a: Option<&T>, b: Option<&T>, cmp: F) -> Option<Ordering>
where
    T: ?Sized,
    F: Fn(&T, &T) -> Ordering,
{
    match (a, b) {
        (Some(a), Some(b)) => Some(cmp(a, b)),
        _ => None,
    }
}

fn missing_last(a_missing: bool, b_missing: bool) -> Ordering {
    match (a_missing, b_missing) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}
