//! PriceOracle
//!
//! NAV comes from the index helper's `totalEvaluation`, scaled by 1e6.
//! Spot prices are read fresh from the pool on every call and converted to USD
//! with the pool's quote-currency price.

use alloy_primitives::{Address, U256};
use eyre::{ensure, Result};
use std::sync::Arc;
use tracing::debug;

use super::{Pool, PoolKind, UsdPriceFeed};
use crate::chain::ExecutionContext;
use crate::contracts::{IConcentratedPool, IConstantProductPair, IIndexHelper, ILBPair};
use crate::units::u256_to_f64;

/// Decimal scale of `totalEvaluation`'s index price
pub const NAV_SCALE: f64 = 1e6;

const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0;
const Q128: f64 = 340_282_366_920_938_463_463_374_607_431_768_211_456.0;

#[derive(Clone)]
pub struct PriceOracle {
    feed: Arc<dyn UsdPriceFeed>,
    index: Address,
    index_helper: Address,
}

impl PriceOracle {
    pub fn new(feed: Arc<dyn UsdPriceFeed>, index: Address, index_helper: Address) -> Self {
        Self { feed, index, index_helper }
    }

    pub async fn usd_price(&self, asset_id: &str) -> Result<f64> {
        self.feed.usd_price(asset_id).await
    }

    /// NAV of one index token in USD
    pub async fn nav_usd(&self, ctx: &ExecutionContext) -> Result<f64> {
        let evaluation = ctx
            .read(self.index_helper, IIndexHelper::totalEvaluationCall { _index: self.index })
            .await?;
        Ok(u256_to_f64(evaluation._indexPriceInBase) / NAV_SCALE)
    }

    /// NAV expressed in `quote_asset` units
    pub async fn nav_in(&self, ctx: &ExecutionContext, quote_asset: &str) -> Result<f64> {
        let nav = self.nav_usd(ctx).await?;
        let quote = self.usd_price(quote_asset).await?;
        ensure!(quote > 0.0, "non-positive USD price for {}", quote_asset);
        Ok(nav / quote)
    }

    /// Fails unless the pool's base token (token0 / tokenX) is the index
    pub async fn check_base_asset(&self, ctx: &ExecutionContext, pool: &Pool) -> Result<()> {
        let base = match pool.kind {
            PoolKind::ConstantProduct => {
                ctx.read(pool.address, IConstantProductPair::token0Call {}).await?
            }
            PoolKind::DiscretizedBins => ctx.read(pool.address, ILBPair::getTokenXCall {}).await?,
            PoolKind::ConcentratedLiquidity => {
                ctx.read(pool.address, IConcentratedPool::token0Call {}).await?
            }
        };
        ensure!(
            base == self.index,
            "pool {} base asset {:?} is not the index token {:?}",
            pool,
            base,
            self.index
        );
        Ok(())
    }

    /// Pool price of one index token, in quote units (no USD conversion)
    pub async fn raw_spot_price(&self, ctx: &ExecutionContext, pool: &Pool) -> Result<f64> {
        match pool.kind {
            PoolKind::ConstantProduct => {
                let reserves = ctx.read(pool.address, IConstantProductPair::getReservesCall {}).await?;
                Ok(constant_product_price(
                    U256::from(reserves.reserve0),
                    U256::from(reserves.reserve1),
                ))
            }
            PoolKind::DiscretizedBins => {
                let active = ctx.read(pool.address, ILBPair::getActiveIdCall {}).await?;
                let raw = ctx
                    .read(pool.address, ILBPair::getPriceFromIdCall { id: active })
                    .await?;
                Ok(bin_price(raw))
            }
            PoolKind::ConcentratedLiquidity => {
                let slot0 = ctx.read(pool.address, IConcentratedPool::slot0Call {}).await?;
                Ok(sqrt_price_to_price(U256::from(slot0.sqrtPriceX96)))
            }
        }
    }

    /// Pool price of one index token in USD
    pub async fn spot_price(&self, ctx: &ExecutionContext, pool: &Pool) -> Result<f64> {
        let raw = self.raw_spot_price(ctx, pool).await?;
        let quote = self.usd_price(&pool.quote_asset).await?;
        Ok(raw * quote)
    }

    /// `spot / nav - 1`: positive is a premium, negative a discount
    pub async fn price_delta(&self, ctx: &ExecutionContext, pool: &Pool) -> Result<f64> {
        let spot = self.spot_price(ctx, pool).await?;
        let nav = self.nav_usd(ctx).await?;
        ensure!(nav > 0.0, "index NAV is zero");

        let delta = spot / nav - 1.0;
        debug!("📊 {} spot ${:.4} vs NAV ${:.4} (delta {:+.4})", pool.label, spot, nav, delta);
        Ok(delta)
    }
}

/// `reserve1 / reserve0`
pub fn constant_product_price(reserve0: U256, reserve1: U256) -> f64 {
    u256_to_f64(reserve1) / u256_to_f64(reserve0)
}

/// 128.128 fixed-point bin price to float
pub fn bin_price(raw: U256) -> f64 {
    u256_to_f64(raw) / Q128
}

/// `sqrtPriceX96^2 / 2^192`
pub fn sqrt_price_to_price(sqrt_price_x96: U256) -> f64 {
    let sqrt = u256_to_f64(sqrt_price_x96) / Q96;
    sqrt * sqrt
}
