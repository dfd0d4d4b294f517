//! HTTP client for the RAM price-tracker backend.

use crate::error::{ApiError, ApiResult};
use crate::models::{ChartSeries, PricePoint, RamListing};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Where the backend listens unless configured otherwise.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

const USER_AGENT: &str = concat!("ramtop/", env!("CARGO_PKG_VERSION"));

const LIST_FAILED: &str = "Failed to fetch RAM options";
const CHART_FAILED: &str = "Failed to fetch chart data";
const HISTORY_FAILED: &str = "Failed to fetch price history";
const TRACK_FAILED: &str = "Failed to add to tracking";

/// Price-tracker API client.
#[derive(Debug, Clone)]
pub struct PriceTrackerClient {
    client: Client,
    base_url: String,
}

impl PriceTrackerClient {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: &str, timeout_secs: u64) -> ApiResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch every listing with its latest price.
    pub async fn list_items(&self) -> ApiResult<Vec<RamListing>> {
        let url = format!("{}/ram-options", self.base_url);
        let response = self.get(&url).await?;
        let response = ensure_success(response, LIST_FAILED).await?;
        let items: Vec<RamListing> = decode(response, LIST_FAILED).await?;
        debug!(count = items.len(), "fetched listings");
        Ok(items)
    }

    /// Fetch the chart-ready price series for one listing.
    pub async fn fetch_series(&self, item_id: i64) -> ApiResult<ChartSeries> {
        let url = format!("{}/ram/{}/chart-data", self.base_url, item_id);
        let response = self.get(&url).await?;
        let response = ensure_success(response, CHART_FAILED).await?;
        let series: ChartSeries = decode(response, CHART_FAILED).await?;

        if !series.is_aligned() {
            warn!(
                item_id,
                dates = series.dates.len(),
                prices = series.prices.len(),
                "chart data arrays differ in length"
            );
            return Err(ApiError::Decode {
                context: CHART_FAILED,
                detail: format!(
                    "{} dates but {} prices",
                    series.dates.len(),
                    series.prices.len()
                ),
            });
        }

        debug!(item_id, points = series.len(), "fetched chart data");
        Ok(series)
    }

    /// Fetch the full price history for one listing, oldest first.
    pub async fn fetch_price_history(&self, item_id: i64) -> ApiResult<Vec<PricePoint>> {
        let url = format!("{}/ram/{}/prices", self.base_url, item_id);
        let response = self.get(&url).await?;
        let response = ensure_success(response, HISTORY_FAILED).await?;
        decode(response, HISTORY_FAILED).await
    }

    /// Ask the backend to start tracking a listing.
    pub async fn track_item(&self, item_id: i64) -> ApiResult<()> {
        let url = format!("{}/ram/{}/track", self.base_url, item_id);
        debug!(%url, "POST");
        let response = self.client.post(&url).send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            ApiError::Network(e)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(item_id, "tracking enabled");
            return Ok(());
        }

        let message = backend_message(response)
            .await
            .unwrap_or_else(|| format!("{}: {}", TRACK_FAILED, status));
        warn!(item_id, %status, %message, "track request rejected");
        Err(ApiError::Status { status, message })
    }

    async fn get(&self, url: &str) -> ApiResult<Response> {
        debug!(%url, "GET");
        self.client.get(url).send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            ApiError::Network(e)
        })
    }
}

/// FastAPI's error envelope.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

async fn ensure_success(response: Response, message: &'static str) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    warn!(url = %response.url(), %status, "backend returned error");
    Err(ApiError::Status {
        status,
        message: message.to_string(),
    })
}

async fn decode<T: DeserializeOwned>(response: Response, context: &'static str) -> ApiResult<T> {
    let bytes = response.bytes().await.map_err(ApiError::Network)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        warn!(error = %e, "malformed response body");
        ApiError::Decode {
            context,
            detail: e.to_string(),
        }
    })
}

/// Pull a human-readable message out of an error response, if it has one.
async fn backend_message(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => Some(s),
        Ok(ErrorBody { detail }) => Some(detail.to_string()),
        Err(_) => Some(text.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serve canned responses, one per connection, reporting each request line.
    pub(crate) fn serve(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&buf);
                let line = request.lines().next().unwrap_or_default().to_string();
                let _ = tx.send(line);

                let reply = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes());
            }
        });

        (format!("http://{}", addr), rx)
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            PriceTrackerClient::new("not a url", 5),
            Err(ApiError::InvalidUrl { .. })
        ));
        assert!(PriceTrackerClient::new("ftp://example.com", 5).is_err());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = PriceTrackerClient::new("http://127.0.0.1:8000/", 5).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
    }

    #[tokio::test]
    async fn test_list_items() {
        let body = r#"[{"id":1,"name_raw":"Kit A","latest_price":1000},{"id":2,"name_raw":"Kit B","latest_price":500}]"#;
        let (url, requests) = serve(vec![(200, body)]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        let items = client.list_items().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].latest_price, Some(500.0));
        assert_eq!(requests.recv().unwrap(), "GET /ram-options HTTP/1.1");
    }

    #[tokio::test]
    async fn test_list_items_non_success() {
        let (url, _requests) = serve(vec![(500, r#"{"detail":"boom"}"#)]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        let err = client.list_items().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch RAM options");
        assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_list_items_malformed_body() {
        let (url, _requests) = serve(vec![(200, r#"{"not":"a list"}"#)]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        let err = client.list_items().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
        assert!(err.to_string().starts_with("Failed to fetch RAM options"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let client = PriceTrackerClient::new(&url, 2).unwrap();

        let err = client.list_items().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn test_fetch_series() {
        let body = r#"{"dates":["2024-01","2024-02"],"prices":[100,110]}"#;
        let (url, requests) = serve(vec![(200, body)]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        let series = client.fetch_series(1).await.unwrap();
        assert_eq!(series.dates, vec!["2024-01", "2024-02"]);
        assert_eq!(series.prices, vec![100.0, 110.0]);
        assert_eq!(requests.recv().unwrap(), "GET /ram/1/chart-data HTTP/1.1");
    }

    #[tokio::test]
    async fn test_fetch_series_not_found() {
        let (url, _requests) = serve(vec![(404, r#"{"detail":"RAM not found or no chart data"}"#)]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        let err = client.fetch_series(999).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch chart data");
    }

    #[tokio::test]
    async fn test_fetch_series_misaligned() {
        let (url, _requests) = serve(vec![(200, r#"{"dates":["a","b"],"prices":[1]}"#)]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        let err = client.fetch_series(1).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_price_history() {
        let body = r#"[{"price":1200,"status":"in_stock","scraped_at":"2024-01-01T00:00:00"}]"#;
        let (url, requests) = serve(vec![(200, body)]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        let history = client.fetch_price_history(4).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, "in_stock");
        assert_eq!(requests.recv().unwrap(), "GET /ram/4/prices HTTP/1.1");
    }

    #[tokio::test]
    async fn test_track_item_posts_once() {
        let (url, requests) = serve(vec![(200, "")]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        client.track_item(7).await.unwrap();
        assert_eq!(requests.recv().unwrap(), "POST /ram/7/track HTTP/1.1");
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_track_item_surfaces_backend_detail() {
        let (url, _requests) = serve(vec![(409, r#"{"detail":"already tracked"}"#)]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        let err = client.track_item(7).await.unwrap_err();
        assert_eq!(err.to_string(), "already tracked");
    }

    #[tokio::test]
    async fn test_track_item_without_body_uses_status() {
        let (url, _requests) = serve(vec![(503, "")]);
        let client = PriceTrackerClient::new(&url, 5).unwrap();

        let err = client.track_item(7).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to add to tracking"));
    }
}
