//! USD price feed
//!
//! Asset ids are CoinGecko ids (`ethereum`, `avalanche-2`).

use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait UsdPriceFeed: Send + Sync {
    /// USD price of one unit of `asset_id`
    async fn usd_price(&self, asset_id: &str) -> Result<f64>;
}

/// `GET {base}/simple/price?ids=<id>&vs_currencies=usd`
pub struct CoinGeckoFeed {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl UsdPriceFeed for CoinGeckoFeed {
    async fn usd_price(&self, asset_id: &str) -> Result<f64> {
        let url = format!("{}/simple/price", self.base_url);
        let body: Value = self
            .client
            .get(&url)
            .query(&[("ids", asset_id), ("vs_currencies", "usd")])
            .send()
            .await
            .wrap_err_with(|| format!("price feed request for {}", asset_id))?
            .error_for_status()?
            .json()
            .await?;

        let price = parse_usd_price(&body, asset_id)?;
        debug!("💲 {} = ${:.4}", asset_id, price);
        Ok(price)
    }
}

fn parse_usd_price(body: &Value, asset_id: &str) -> Result<f64> {
    body.get(asset_id)
        .and_then(|entry| entry.get("usd"))
        .and_then(Value::as_f64)
        .ok_or_else(|| eyre!("price feed response has no usd price for {}", asset_id))
}
