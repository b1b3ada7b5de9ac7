//! Discretized-bin (liquidity book) solver
//!
//! The target bin is snapped to a multiple of 5; the walk then visits
//! non-empty bins from the active bin toward it, summing the reserve the
//! trade would take out of each bin. The total is turned into a required
//! input with the pair's `getSwapIn`.

use alloy_primitives::{aliases::U24, Address, U256};
use async_trait::async_trait;
use eyre::{ensure, Result};

use super::{TradeDirection, TradeSize, TradeSizer};
use crate::chain::ExecutionContext;
use crate::contracts::ILBPair;
use crate::pricing::Pool;

/// Bin id of price 1.0
pub const BIN_ID_OFFSET: f64 = 8_388_608.0;

/// Returned by `getNextNonEmptyBin` when nothing is left in that direction
pub const NO_BIN_LOW: u32 = 0;
pub const NO_BIN_HIGH: u32 = 0xFF_FFFF;

/// Bin reserves and neighbour lookup
#[async_trait]
pub trait BinSource: Send + Sync {
    /// `(reserveX, reserveY)` of a bin
    async fn bin(&self, id: u32) -> Result<(u128, u128)>;

    /// Next non-empty bin; `swap_for_y` walks down, otherwise up
    async fn next_non_empty(&self, swap_for_y: bool, id: u32) -> Result<u32>;
}

/// Bins read from a live LB pair
pub struct LbPairBins<'a> {
    ctx: &'a ExecutionContext,
    pair: Address,
}

impl<'a> LbPairBins<'a> {
    pub fn new(ctx: &'a ExecutionContext, pair: Address) -> Self {
        Self { ctx, pair }
    }
}

#[async_trait]
impl BinSource for LbPairBins<'_> {
    async fn bin(&self, id: u32) -> Result<(u128, u128)> {
        let bin = self
            .ctx
            .read(self.pair, ILBPair::getBinCall { id: U24::from(id) })
            .await?;
        Ok((bin.binReserveX, bin.binReserveY))
    }

    async fn next_non_empty(&self, swap_for_y: bool, id: u32) -> Result<u32> {
        let next = self
            .ctx
            .read(
                self.pair,
                ILBPair::getNextNonEmptyBinCall { swapForY: swap_for_y, id: U24::from(id) },
            )
            .await?;
        Ok(next.to::<u32>())
    }
}

/// `round((ln(p) / ln(1 + step / 1e4) + offset) / 5) * 5`
///
/// Fails when the id falls outside the book, i.e. not strictly between the
/// two `getNextNonEmptyBin` sentinels.
pub fn target_bin(target_price: f64, bin_step: u16) -> Result<u32> {
    let raw = target_price.ln() / (1.0 + bin_step as f64 / 10_000.0).ln() + BIN_ID_OFFSET;
    let id = (raw / 5.0).round() * 5.0;
    ensure!(
        id.is_finite() && id > NO_BIN_LOW as f64 && id < NO_BIN_HIGH as f64,
        "price {} with bin step {} is off the bin book",
        target_price,
        bin_step
    );
    Ok(id as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinWalk {
    /// Reserve the trade would take out of the visited bins
    pub output: u128,
    /// Bins whose reserves were read
    pub steps: u32,
    /// The pool ran out of non-empty bins before the target
    pub exhausted: bool,
}

/// Walk from `active` to `target`, one non-empty bin at a time.
///
/// Moving up takes X out of each bin, moving down takes Y. The target bin
/// counts only when the walk lands on it exactly.
pub async fn walk_bins<S: BinSource + ?Sized>(source: &S, active: u32, target: u32) -> Result<BinWalk> {
    let mut walk = BinWalk::default();
    if active == target {
        return Ok(walk);
    }

    let up = target > active;
    let take = |(x, y): (u128, u128)| if up { x } else { y };
    let mut current = active;

    loop {
        walk.output = walk.output.saturating_add(take(source.bin(current).await?));
        walk.steps += 1;

        let next = source.next_non_empty(!up, current).await?;
        if next == NO_BIN_LOW || next == NO_BIN_HIGH {
            walk.exhausted = true;
            break;
        }

        let before_target = if up { next < target } else { next > target };
        let moves_forward = if up { next > current } else { next < current };
        ensure!(moves_forward, "bin walk did not advance past {}", current);

        if before_target {
            current = next;
        } else {
            if next == target {
                walk.output = walk.output.saturating_add(take(source.bin(next).await?));
                walk.steps += 1;
            }
            break;
        }
    }

    Ok(walk)
}

pub(super) async fn size(
    sizer: &TradeSizer,
    ctx: &ExecutionContext,
    pool: &Pool,
    target_price: f64,
    direction: TradeDirection,
) -> Result<TradeSize> {
    ensure!(target_price > 0.0, "target price must be positive, got {}", target_price);

    let active = ctx.read(pool.address, ILBPair::getActiveIdCall {}).await?.to::<u32>();
    let bin_step = ctx.read(pool.address, ILBPair::getBinStepCall {}).await?;
    let target = target_bin(target_price, bin_step)?;

    // premium pushes the price down, discount pushes it up
    let wrong_side = match direction {
        TradeDirection::Premium => target >= active,
        TradeDirection::Discount => target <= active,
    };
    if wrong_side {
        return Ok(TradeSize::default());
    }

    let walk = walk_bins(&LbPairBins::new(ctx, pool.address), active, target).await?;
    tracing::debug!(
        "🧮 {} bins {} -> {}: {} steps, output {}",
        pool.label,
        active,
        target,
        walk.steps,
        walk.output
    );
    if walk.output == 0 {
        return Ok(TradeSize { amount: U256::ZERO, exhausted: walk.exhausted });
    }

    let swap_in = ctx
        .read(
            pool.address,
            ILBPair::getSwapInCall { amountOut: walk.output, swapForY: direction.is_premium() },
        )
        .await?;

    let amount = sizer
        .swap_in_to_size(ctx, U256::from(swap_in.amountIn), direction)
        .await?;
    Ok(TradeSize { amount, exhausted: walk.exhausted })
}
