//! Trade sizing - how much to trade to bring a pool back to NAV
//!
//! One solver per pool kind:
//! - constant product: closed form on `x * y = k`
//! - discretized bins: walk non-empty bins toward the target bin
//! - concentrated liquidity: walk initialized ticks toward the target tick
//!
//! Every solver reads a fresh snapshot through the context it is handed and
//! mutates nothing, so sizing on the fork and discarding the result is safe.
//! Sizes are in native wei: the amount to mint with (premium) or to spend
//! buying the index from the pool (discount).

pub mod bins;
pub mod constant_product;
pub mod indexer;
pub mod ticks;

use alloy_primitives::U256;
use eyre::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::ExecutionContext;
use crate::deployments::Deployment;
use crate::pricing::{Pool, PoolKind, PriceOracle};
use crate::units::{f64_to_u256, to_ether, u256_to_f64};

pub use bins::{walk_bins, BinSource, BinWalk, LbPairBins};
pub use constant_product::{solve_constant_product, ConstantProductSolution};
pub use indexer::{InitializedTick, SubgraphTicks, TickIndexer};
pub use ticks::tick_walk;

/// Which way the pool is mispriced relative to NAV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
    /// Pool above NAV: mint index, sell it into the pool
    Premium,
    /// Pool below NAV: buy index from the pool, burn it
    Discount,
}

impl TradeDirection {
    /// `None` when there is nothing to arbitrage
    pub fn from_delta(delta: f64) -> Option<Self> {
        if delta > 0.0 {
            Some(TradeDirection::Premium)
        } else if delta < 0.0 {
            Some(TradeDirection::Discount)
        } else {
            None
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, TradeDirection::Premium)
    }
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeDirection::Premium => write!(f, "premium"),
            TradeDirection::Discount => write!(f, "discount"),
        }
    }
}

/// Result of sizing one pool; zero means no trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TradeSize {
    /// Native wei
    pub amount: U256,
    /// Liquidity ran out before the target was reached
    pub exhausted: bool,
}

impl TradeSize {
    pub fn exact(amount: U256) -> Self {
        Self { amount, exhausted: false }
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

pub struct TradeSizer {
    oracle: PriceOracle,
    ticks: Arc<dyn TickIndexer>,
    deployment: Arc<Deployment>,
}

impl TradeSizer {
    pub fn new(oracle: PriceOracle, ticks: Arc<dyn TickIndexer>, deployment: Arc<Deployment>) -> Self {
        Self { oracle, ticks, deployment }
    }

    /// Size a trade moving `pool` to `target_price` (quote units per index)
    pub async fn size(
        &self,
        ctx: &ExecutionContext,
        pool: &Pool,
        target_price: f64,
        direction: TradeDirection,
    ) -> Result<TradeSize> {
        let size = match pool.kind {
            PoolKind::ConstantProduct => {
                constant_product::size(self, ctx, pool, target_price, direction).await?
            }
            PoolKind::DiscretizedBins => bins::size(self, ctx, pool, target_price, direction).await?,
            PoolKind::ConcentratedLiquidity => {
                ticks::size(self, ctx, pool, target_price, direction).await?
            }
        };

        if size.exhausted {
            warn!(
                "⚠️  {} ran out of liquidity before the target price; size is best-effort",
                pool.label
            );
        }
        info!(
            "📐 {} {} size: {:.6} {}",
            pool.label,
            direction,
            to_ether(size.amount),
            ctx.network.native_symbol
        );
        Ok(size)
    }

    /// Index units to native units at NAV: `amount * navUsd / nativeUsd`
    pub(crate) async fn index_to_native(&self, ctx: &ExecutionContext, amount: f64) -> Result<U256> {
        let nav = self.oracle.nav_usd(ctx).await?;
        let native = self.oracle.usd_price(&ctx.network.native_price_id).await?;
        Ok(f64_to_u256(index_to_native_units(amount, nav, native)))
    }

    /// Apply the premium conversion to a swap-in amount that is denominated in index
    pub(crate) async fn swap_in_to_size(
        &self,
        ctx: &ExecutionContext,
        amount_in: U256,
        direction: TradeDirection,
    ) -> Result<U256> {
        match direction {
            TradeDirection::Premium => self.index_to_native(ctx, u256_to_f64(amount_in)).await,
            TradeDirection::Discount => Ok(amount_in),
        }
    }

    pub(crate) fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub(crate) fn tick_indexer(&self) -> &dyn TickIndexer {
        self.ticks.as_ref()
    }
}

pub(crate) fn index_to_native_units(amount: f64, nav_usd: f64, native_usd: f64) -> f64 {
    if native_usd <= 0.0 {
        return 0.0;
    }
    amount * nav_usd / native_usd
}
