//! Grow a Garden stock API client.
//!
//! Fetches the public stock document and decodes it into a
//! `RawStockSnapshot` for the stock engine.

pub mod wire;

use std::future::Future;
use std::time::Duration;

use common::config::UpstreamConfig;
use common::{Error, RawStockSnapshot};
use tracing::debug;

pub use wire::StockResponse;

/// Source of raw stock snapshots.
///
/// A returned snapshot whose `fetch_id` equals the previous one means the
/// upstream has not refreshed; only transport/decode problems are errors.
pub trait StockFetcher: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<RawStockSnapshot, Error>> + Send;
}

/// HTTP client for the upstream stock endpoint, with connection pooling.
#[derive(Debug, Clone)]
pub struct GagClient {
    client: reqwest::Client,
    url: String,
}

impl GagClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(2)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build stock HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and decode the upstream stock document.
    pub async fn fetch_stock(&self) -> Result<StockResponse, Error> {
        debug!("Fetching stock: {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Http(format!("failed to fetch stock: {}", e)))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Http(format!("failed to read stock body: {}", e)))?;

        if status != 200 {
            return Err(Error::UpstreamStatus {
                status,
                body: truncate(&body, 500).to_string(),
            });
        }

        let stock: StockResponse = serde_json::from_str(&body)?;

        debug!(
            "Got stock document lastApiFetch={} seeds={} gear={} eggs={}",
            stock.last_api_fetch,
            stock.seeds_stock.len(),
            stock.gear_stock.len(),
            stock.egg_stock.len()
        );

        Ok(stock)
    }
}

impl StockFetcher for GagClient {
    async fn fetch(&self) -> Result<RawStockSnapshot, Error> {
        self.fetch_stock().await.map(RawStockSnapshot::from)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
