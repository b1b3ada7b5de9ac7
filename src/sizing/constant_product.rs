//! Constant-product solver
//!
//! With `k = x * y` and target `p = y / x`: `new_x = sqrt(k / p)`,
//! `new_y = sqrt(k * p)`. `x` is the index reserve, `y` the native reserve.

use alloy_primitives::U256;
use eyre::{ensure, Result};

use super::{TradeDirection, TradeSize, TradeSizer};
use crate::chain::ExecutionContext;
use crate::contracts::IConstantProductPair;
use crate::pricing::Pool;
use crate::units::{f64_to_u256, u256_to_f64};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantProductSolution {
    pub new_x: f64,
    pub new_y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
}

pub fn solve_constant_product(x: f64, y: f64, target_price: f64) -> ConstantProductSolution {
    let k = x * y;
    let new_x = (k / target_price).sqrt();
    let new_y = (k * target_price).sqrt();
    ConstantProductSolution {
        new_x,
        new_y,
        delta_x: new_x - x,
        delta_y: new_y - y,
    }
}

pub(super) async fn size(
    sizer: &TradeSizer,
    ctx: &ExecutionContext,
    pool: &Pool,
    target_price: f64,
    direction: TradeDirection,
) -> Result<TradeSize> {
    ensure!(target_price > 0.0, "target price must be positive, got {}", target_price);

    let reserves = ctx.read(pool.address, IConstantProductPair::getReservesCall {}).await?;
    let x = u256_to_f64(U256::from(reserves.reserve0));
    let y = u256_to_f64(U256::from(reserves.reserve1));
    ensure!(x > 0.0 && y > 0.0, "pool {} has an empty reserve", pool);

    let solution = solve_constant_product(x, y, target_price);

    let amount = match direction {
        // index to sell, valued in native at NAV
        TradeDirection::Premium if solution.delta_x > 0.0 => {
            sizer.index_to_native(ctx, solution.delta_x).await?
        }
        TradeDirection::Discount if solution.delta_y > 0.0 => f64_to_u256(solution.delta_y),
        _ => U256::ZERO,
    };

    Ok(TradeSize::exact(amount))
}
