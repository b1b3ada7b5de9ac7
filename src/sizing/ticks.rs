//! Concentrated-liquidity solver
//!
//! Walks initialized ticks from the current tick to the target tick, summing
//! the amount available in each liquidity range, then asks the quoter what
//! input buys that amount.

use alloy_primitives::{aliases::U160, U256};
use eyre::{ensure, Result};
use tracing::debug;

use super::{InitializedTick, TradeDirection, TradeSize, TradeSizer};
use crate::chain::ExecutionContext;
use crate::contracts::{IConcentratedPool, IQuoterV2};
use crate::pricing::oracle::sqrt_price_to_price;
use crate::pricing::Pool;
use crate::units::f64_to_u256;

const TICK_BASE: f64 = 1.0001;

/// Amount of token0 in range `[sp, smax]` (square-root prices)
pub fn x_in_range(liquidity: f64, sp: f64, smax: f64) -> f64 {
    liquidity * (smax - sp) / (sp * smax)
}

/// Amount of token1 in range `[smin, sp]`
pub fn y_in_range(liquidity: f64, sp: f64, smin: f64) -> f64 {
    liquidity * (sp - smin)
}

fn sqrt_price_at(tick: i32) -> f64 {
    TICK_BASE.powf(tick as f64 / 2.0)
}

/// `floor(log_1.0001(price))`
pub fn price_to_tick(price: f64) -> i32 {
    (price.ln() / TICK_BASE.ln()).floor() as i32
}

/// Token amount between `current` and `target`.
///
/// `ticks` must be ascending. Moving up sums token0, moving down token1;
/// crossing a tick adds its net liquidity going up and removes it going down.
pub fn tick_walk(ticks: &[InitializedTick], current: i32, target: i32, liquidity: f64) -> f64 {
    let mut current = current;
    let mut liquidity = liquidity;
    let mut output = 0.0;

    while current != target {
        if target > current {
            match ticks.iter().find(|t| t.index > current) {
                Some(next) if next.index < target => {
                    output += x_in_range(liquidity, sqrt_price_at(current), sqrt_price_at(next.index));
                    current = next.index;
                    liquidity += next.liquidity_net as f64;
                }
                _ => {
                    output += x_in_range(liquidity, sqrt_price_at(current), sqrt_price_at(target));
                    current = target;
                }
            }
        } else {
            match ticks.iter().rev().find(|t| t.index < current) {
                Some(next) if next.index > target => {
                    output += y_in_range(liquidity, sqrt_price_at(current), sqrt_price_at(next.index));
                    current = next.index;
                    liquidity -= next.liquidity_net as f64;
                }
                _ => {
                    output += y_in_range(liquidity, sqrt_price_at(current), sqrt_price_at(target));
                    current = target;
                }
            }
        }
        liquidity = liquidity.max(0.0);
    }

    output
}

pub(super) async fn size(
    sizer: &TradeSizer,
    ctx: &ExecutionContext,
    pool: &Pool,
    target_price: f64,
    direction: TradeDirection,
) -> Result<TradeSize> {
    ensure!(target_price > 0.0, "target price must be positive, got {}", target_price);

    let slot0 = ctx.read(pool.address, IConcentratedPool::slot0Call {}).await?;
    let current_tick = price_to_tick(sqrt_price_to_price(U256::from(slot0.sqrtPriceX96)));
    let target_tick = price_to_tick(target_price);

    let wrong_side = match direction {
        TradeDirection::Premium => target_tick >= current_tick,
        TradeDirection::Discount => target_tick <= current_tick,
    };
    if wrong_side {
        return Ok(TradeSize::default());
    }

    let liquidity = ctx.read(pool.address, IConcentratedPool::liquidityCall {}).await? as f64;
    let ticks = sizer.tick_indexer().ticks(pool.address).await?;
    let output = tick_walk(&ticks, current_tick, target_tick, liquidity);
    debug!(
        "🧮 {} ticks {} -> {} over {} initialized ticks: output {:.0}",
        pool.label,
        current_tick,
        target_tick,
        ticks.len(),
        output
    );
    if output <= 0.0 {
        return Ok(TradeSize::default());
    }

    let deployment = sizer.deployment();
    let (token_in, token_out) = match direction {
        TradeDirection::Premium => (deployment.index, deployment.wrapped_native),
        TradeDirection::Discount => (deployment.wrapped_native, deployment.index),
    };
    let fee = ctx.read(pool.address, IConcentratedPool::feeCall {}).await?;

    let quote = ctx
        .read(
            deployment.uniswap_quoter,
            IQuoterV2::quoteExactOutputSingleCall {
                params: IQuoterV2::QuoteExactOutputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    amount: f64_to_u256(output),
                    fee,
                    sqrtPriceLimitX96: U160::ZERO,
                },
            },
        )
        .await?;

    let amount = sizer.swap_in_to_size(ctx, quote.amountIn, direction).await?;
    Ok(TradeSize::exact(amount))
}
