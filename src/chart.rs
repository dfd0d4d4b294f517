//! Price-history modal: fetch state machine and the chart model it renders.

use crate::error::ApiError;
use crate::models::{ChartSeries, RamListing};

/// Shown when a failed fetch carries no message of its own.
pub const CHART_FALLBACK_ERROR: &str = "Could not load chart data.";

/// One labelled line of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub label: String,
    pub values: Vec<f64>,
}

impl LineSeries {
    /// Points as `(index, value)` pairs for plotting.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect()
    }
}

/// Chart-ready reshaping of a [`ChartSeries`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    /// Chart title, the listing's name
    pub title: String,
    /// X-axis labels, index-aligned with every series
    pub labels: Vec<String>,
    pub series: Vec<LineSeries>,
    /// Marker prefixed to y-axis ticks
    pub currency: String,
}

impl ChartModel {
    pub fn from_series(title: &str, series: ChartSeries, currency: &str) -> Self {
        Self {
            title: title.to_string(),
            labels: series.dates,
            series: vec![LineSeries {
                label: format!("Price History ({})", currency),
                values: series.prices,
            }],
            currency: currency.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Lowest and highest value across all series.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        let mut values = self.series.iter().flat_map(|s| s.values.iter().copied());
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Y-axis bounds with a little headroom so a flat series is still visible.
    pub fn padded_bounds(&self) -> (f64, f64) {
        match self.bounds() {
            Some((lo, hi)) => {
                let range = hi - lo;
                let pad = if range > 0.0 { range * 0.05 } else { (hi.abs() * 0.05).max(1.0) };
                (lo - pad, hi + pad)
            }
            None => (0.0, 1.0),
        }
    }

    /// Y-axis tick labels between `lo` and `hi`.
    pub fn y_ticks(&self, lo: f64, hi: f64, count: usize) -> Vec<String> {
        let count = count.max(2);
        (0..count)
            .map(|i| {
                let v = lo + (hi - lo) * i as f64 / (count - 1) as f64;
                format_tick(&self.currency, v)
            })
            .collect()
    }

    /// X-axis labels thinned to at most `count` evenly spaced dates.
    pub fn x_ticks(&self, count: usize) -> Vec<String> {
        let n = self.labels.len();
        if n == 0 || count == 0 {
            return Vec::new();
        }
        if n <= count {
            return self.labels.clone();
        }
        let count = count.max(2);
        (0..count)
            .map(|i| self.labels[i * (n - 1) / (count - 1)].clone())
            .collect()
    }

    /// Latest value of the first series.
    pub fn latest(&self) -> Option<f64> {
        self.series.first().and_then(|s| s.values.last().copied())
    }
}

/// Currency-prefixed axis tick, e.g. `NT$ 1290`.
pub fn format_tick(currency: &str, value: f64) -> String {
    if value.fract().abs() < f64::EPSILON || value.abs() >= 100.0 {
        format!("{} {:.0}", currency, value)
    } else {
        format!("{} {:.2}", currency, value)
    }
}

/// Where one open cycle of the modal is.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ChartState {
    #[default]
    Idle,
    Loading,
    Loaded(ChartModel),
    Failed(String),
}

/// The price-history modal.
///
/// The modal does not own the selected listing; the controller passes it in.
/// `request` identifies the current open cycle, and results tagged with any
/// other id belong to a closed or superseded cycle and are dropped.
#[derive(Debug, Clone, Default)]
pub struct ChartModal {
    pub state: ChartState,
    request: u64,
    currency: String,
}

impl ChartModal {
    pub fn new(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn request_id(&self) -> u64 {
        self.request
    }

    /// Start a new cycle, discarding any previous series or error. Returns
    /// the id the caller must tag its fetch result with.
    pub fn open(&mut self) -> u64 {
        self.request += 1;
        self.state = ChartState::Loading;
        self.request
    }

    /// End the cycle. Any fetch still in flight becomes stale.
    pub fn close(&mut self) {
        self.request += 1;
        self.state = ChartState::Idle;
    }

    /// Apply a fetch result for `item`. Returns false if it was stale and
    /// ignored.
    pub fn resolve(
        &mut self,
        request: u64,
        item: &RamListing,
        result: Result<ChartSeries, ApiError>,
    ) -> bool {
        if request != self.request || self.state != ChartState::Loading {
            return false;
        }

        self.state = match result {
            Ok(series) => ChartState::Loaded(ChartModel::from_series(
                &item.name_raw,
                series,
                &self.currency,
            )),
            Err(e) => ChartState::Failed(e.user_message(CHART_FALLBACK_ERROR)),
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::listing;
    use reqwest::StatusCode;

    fn example_series() -> ChartSeries {
        ChartSeries {
            dates: vec!["2024-01".to_string(), "2024-02".to_string()],
            prices: vec![100.0, 110.0],
        }
    }

    #[test]
    fn test_model_from_example_series() {
        let model = ChartModel::from_series("Kit A", example_series(), "NT$");
        assert_eq!(model.title, "Kit A");
        assert_eq!(model.series.len(), 1);
        assert_eq!(model.series[0].label, "Price History (NT$)");
        assert_eq!(model.series[0].values, vec![100.0, 110.0]);
        assert_eq!(model.labels, vec!["2024-01", "2024-02"]);
        assert_eq!(model.series[0].points(), vec![(0.0, 100.0), (1.0, 110.0)]);
    }

    #[test]
    fn test_ticks_are_currency_prefixed() {
        let model = ChartModel::from_series("Kit A", example_series(), "NT$");
        let ticks = model.y_ticks(100.0, 110.0, 3);
        assert_eq!(ticks, vec!["NT$ 100", "NT$ 105", "NT$ 110"]);
        assert_eq!(format_tick("$", 9.5), "$ 9.50");
    }

    #[test]
    fn test_bounds_and_padding() {
        let model = ChartModel::from_series("Kit A", example_series(), "NT$");
        assert_eq!(model.bounds(), Some((100.0, 110.0)));
        let (lo, hi) = model.padded_bounds();
        assert!(lo < 100.0 && hi > 110.0);

        let flat = ChartModel::from_series(
            "Flat",
            ChartSeries {
                dates: vec!["a".into()],
                prices: vec![50.0],
            },
            "NT$",
        );
        let (lo, hi) = flat.padded_bounds();
        assert!(lo < 50.0 && hi > 50.0);
    }

    #[test]
    fn test_x_ticks_thinned() {
        let series = ChartSeries {
            dates: (0..10).map(|i| format!("d{}", i)).collect(),
            prices: vec![1.0; 10],
        };
        let model = ChartModel::from_series("x", series, "NT$");
        assert_eq!(model.x_ticks(3), vec!["d0", "d4", "d9"]);
        assert_eq!(model.x_ticks(20).len(), 10);
    }

    #[test]
    fn test_open_then_load() {
        let item = listing(1, "Kit A", Some(100.0));
        let mut modal = ChartModal::new("NT$");
        assert_eq!(modal.state, ChartState::Idle);

        let id = modal.open();
        assert_eq!(modal.state, ChartState::Loading);
        assert!(modal.resolve(id, &item, Ok(example_series())));

        match &modal.state {
            ChartState::Loaded(model) => {
                assert_eq!(model.title, "Kit A");
                assert_eq!(model.latest(), Some(110.0));
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_failed_fetch_captures_message() {
        let item = listing(1, "Kit A", None);
        let mut modal = ChartModal::new("NT$");
        let id = modal.open();
        let err = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            message: "Failed to fetch chart data".to_string(),
        };
        assert!(modal.resolve(id, &item, Err(err)));
        assert_eq!(
            modal.state,
            ChartState::Failed("Failed to fetch chart data".to_string())
        );
    }

    #[test]
    fn test_result_after_close_is_dropped() {
        let item = listing(1, "Kit A", None);
        let mut modal = ChartModal::new("NT$");
        let id = modal.open();
        modal.close();
        assert!(!modal.resolve(id, &item, Ok(example_series())));
        assert_eq!(modal.state, ChartState::Idle);
    }

    #[test]
    fn test_superseded_cycle_is_dropped() {
        let item = listing(2, "Kit B", None);
        let mut modal = ChartModal::new("NT$");
        let first = modal.open();
        let second = modal.open();
        assert!(!modal.resolve(first, &item, Ok(example_series())));
        assert_eq!(modal.state, ChartState::Loading);
        assert!(modal.resolve(second, &item, Ok(example_series())));
        assert_eq!(modal.request_id(), second);
    }

    #[test]
    fn test_reopen_clears_previous_result() {
        let item = listing(1, "Kit A", None);
        let mut modal = ChartModal::new("NT$");
        let id = modal.open();
        modal.resolve(id, &item, Ok(example_series()));
        modal.close();
        modal.open();
        assert_eq!(modal.state, ChartState::Loading);
    }
}
