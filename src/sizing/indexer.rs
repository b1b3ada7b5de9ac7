//! Tick-liquidity indexer (Uniswap V3 subgraph)
//!
//! Returns every initialized tick of a pool with a nonzero `liquidityNet`,
//! ascending by tick index.

use alloy_primitives::Address;
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Page size accepted by the hosted subgraph
const PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializedTick {
    pub index: i32,
    pub liquidity_net: i128,
}

#[async_trait]
pub trait TickIndexer: Send + Sync {
    async fn ticks(&self, pool: Address) -> Result<Vec<InitializedTick>>;
}

pub struct SubgraphTicks {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    data: Option<GraphData>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GraphData {
    ticks: Vec<RawTick>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTick {
    tick_idx: String,
    liquidity_net: String,
}

impl RawTick {
    fn parse(&self) -> Result<InitializedTick> {
        Ok(InitializedTick {
            index: self
                .tick_idx
                .parse()
                .wrap_err_with(|| format!("bad tickIdx {}", self.tick_idx))?,
            liquidity_net: self
                .liquidity_net
                .parse()
                .wrap_err_with(|| format!("bad liquidityNet {}", self.liquidity_net))?,
        })
    }
}

impl SubgraphTicks {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.to_string() })
    }

    async fn page(&self, pool: Address, after: i64) -> Result<Vec<RawTick>> {
        let query = format!(
            "{{ ticks(first: {}, orderBy: tickIdx, orderDirection: asc, \
             where: {{ pool: \"{}\", tickIdx_gt: \"{}\" }}) {{ tickIdx liquidityNet }} }}",
            PAGE_SIZE,
            format!("{:?}", pool).to_lowercase(),
            after
        );

        let response: GraphResponse = self
            .client
            .post(&self.url)
            .json(&json!({ "query": query }))
            .send()
            .await
            .wrap_err("tick indexer request failed")?
            .error_for_status()?
            .json()
            .await?;

        if !response.errors.is_empty() {
            return Err(eyre!("tick indexer returned errors: {:?}", response.errors));
        }
        response
            .data
            .map(|d| d.ticks)
            .ok_or_else(|| eyre!("tick indexer returned no data"))
    }
}

#[async_trait]
impl TickIndexer for SubgraphTicks {
    async fn ticks(&self, pool: Address) -> Result<Vec<InitializedTick>> {
        let mut raw = Vec::new();
        let mut after = i64::from(i32::MIN);

        loop {
            let page = self.page(pool, after).await?;
            let full = page.len() == PAGE_SIZE;
            for tick in &page {
                raw.push(tick.parse()?);
            }
            match raw.last() {
                Some(last) if full => after = i64::from(last.index),
                _ => break,
            }
        }

        let ticks = normalize_ticks(raw);
        debug!("Fetched {} initialized ticks for {:?}", ticks.len(), pool);
        Ok(ticks)
    }
}

/// Drop zero-net ticks and sort ascending
pub fn normalize_ticks(mut ticks: Vec<InitializedTick>) -> Vec<InitializedTick> {
    ticks.retain(|t| t.liquidity_net != 0);
    ticks.sort_by_key(|t| t.index);
    ticks
}
