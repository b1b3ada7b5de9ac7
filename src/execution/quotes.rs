//! Swap-quote aggregator (0x `swap/v1/quote`)
//!
//! Every request waits out a fixed pause since the previous one so the
//! provider does not throttle us.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use eyre::{ensure, eyre, Result, WrapErr};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Decimals kept when parsing a quoted price
pub const PRICE_DECIMALS: usize = 18;

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub sell_token: Address,
    pub buy_token: Address,
    pub sell_amount: U256,
    /// Fraction, e.g. 0.015
    pub slippage: f64,
}

/// An executable swap with its guaranteed price
#[derive(Debug, Clone, PartialEq)]
pub struct SwapQuote {
    pub sell_amount: U256,
    pub buy_token: Address,
    /// Buy units per sell unit, scaled by `10^PRICE_DECIMALS`
    pub guaranteed_price: U256,
    pub to: Address,
    pub data: Bytes,
}

impl SwapQuote {
    /// `floor(sellAmount * guaranteedPrice)`, exact in integer arithmetic
    pub fn min_buy_amount(&self) -> U256 {
        self.sell_amount.saturating_mul(self.guaranteed_price) / price_scale()
    }
}

fn price_scale() -> U256 {
    U256::from(10u64).pow(U256::from(PRICE_DECIMALS))
}

/// Parse a decimal price such as `"0.0512"` into a `10^PRICE_DECIMALS`
/// scaled integer; digits past that are truncated.
pub fn parse_price(text: &str) -> Result<U256> {
    let text = text.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    ensure!(
        !(whole.is_empty() && fraction.is_empty())
            && whole.bytes().all(|b| b.is_ascii_digit())
            && fraction.bytes().all(|b| b.is_ascii_digit()),
        "not a decimal price: {:?}",
        text
    );

    let digits: String = whole
        .chars()
        .chain(fraction.chars().chain(std::iter::repeat('0')).take(PRICE_DECIMALS))
        .collect();
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|e| eyre!("price {:?} out of range: {}", text, e))
}

#[async_trait]
pub trait QuoteAggregator: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote>;
}

/// Blocking pause between successive calls
pub struct Throttle {
    pause: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(pause: Duration) -> Self {
        Self { pause, last: Mutex::new(None) }
    }

    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready = previous + self.pause;
            if Instant::now() < ready {
                tokio::time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZeroExQuote {
    sell_amount: String,
    buy_token_address: Address,
    guaranteed_price: String,
    to: Address,
    data: Bytes,
}

impl ZeroExQuote {
    fn into_quote(self) -> Result<SwapQuote> {
        Ok(SwapQuote {
            sell_amount: self
                .sell_amount
                .parse()
                .wrap_err_with(|| format!("bad sellAmount {}", self.sell_amount))?,
            buy_token: self.buy_token_address,
            guaranteed_price: parse_price(&self.guaranteed_price)
                .wrap_err_with(|| format!("bad guaranteedPrice {}", self.guaranteed_price))?,
            to: self.to,
            data: self.data,
        })
    }
}

pub struct ZeroExClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    throttle: Throttle,
}

impl ZeroExClient {
    pub fn new(base_url: &str, api_key: &str, pause: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            throttle: Throttle::new(pause),
        })
    }
}

#[async_trait]
impl QuoteAggregator for ZeroExClient {
    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote> {
        self.throttle.wait().await;

        let response = self
            .client
            .get(&self.base_url)
            .header("0x-api-key", &self.api_key)
            .query(&[
                ("sellToken", format!("{:?}", request.sell_token)),
                ("buyToken", format!("{:?}", request.buy_token)),
                ("sellAmount", request.sell_amount.to_string()),
                ("slippagePercentage", request.slippage.to_string()),
                ("enableSlippageProtection", "true".to_string()),
            ])
            .send()
            .await
            .wrap_err("quote request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("quote for {:?} -> {:?} failed ({}): {}", request.sell_token, request.buy_token, status, body));
        }

        let quote: ZeroExQuote = response.json().await.wrap_err("malformed quote response")?;
        let quote = quote.into_quote()?;
        debug!(
            "💱 quote {} of {:?} -> {:?} via {:?} (guaranteed {})",
            quote.sell_amount, request.sell_token, quote.buy_token, quote.to, quote.guaranteed_price
        );
        Ok(quote)
    }
}
