//! Pool swap calls per pool kind.
//!
//! Constant-product and bin pools route through the Trader Joe LB router
//! (path version 0 for V1 pairs, 2 for V2.1 pairs); concentrated pools go
//! through Uniswap's `exactInputSingle`. Minimum outputs are zero: the dry
//! run and the balance diff are what guard these trades.

use alloy_primitives::{aliases::U160, U256};
use alloy_sol_types::SolCall;
use eyre::{ensure, Result};

use crate::chain::{CallKind, ContractCall, ExecutionContext};
use crate::contracts::{IConcentratedPool, ILBPair, ILBRouter, IUniswapSwapRouter};
use crate::deployments::Deployment;
use crate::pricing::{Pool, PoolKind};

/// Seconds past the latest block a swap stays valid
const DEADLINE_WINDOW: u64 = 10_000;

/// Path version of a Trader Joe V1 pair
const JOE_V1_VERSION: u8 = 0;
/// Path version of a Trader Joe V2.1 pair
const JOE_V21_VERSION: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSide {
    /// Spend native, receive index
    BuyIndex,
    /// Spend index, receive native
    SellIndex,
}

/// Build the swap of `amount` (native wei when buying, index wei when selling)
pub async fn swap_call(
    ctx: &ExecutionContext,
    deployment: &Deployment,
    pool: &Pool,
    side: SwapSide,
    amount: U256,
) -> Result<ContractCall> {
    let router = deployment.swap_router(pool.kind);
    ensure!(!router.is_zero(), "no swap router for {} on this chain", pool.kind);

    let deadline = U256::from(ctx.rpc().latest_timestamp().await? + DEADLINE_WINDOW);
    let recipient = ctx.address();
    let (token_in, token_out) = match side {
        SwapSide::BuyIndex => (deployment.wrapped_native, deployment.index),
        SwapSide::SellIndex => (deployment.index, deployment.wrapped_native),
    };

    let call = match pool.kind {
        PoolKind::ConstantProduct | PoolKind::DiscretizedBins => {
            let (bin_step, version) = match pool.kind {
                PoolKind::DiscretizedBins => {
                    let step = ctx.read(pool.address, ILBPair::getBinStepCall {}).await?;
                    (U256::from(step), JOE_V21_VERSION)
                }
                _ => (U256::ZERO, JOE_V1_VERSION),
            };
            let path = ILBRouter::Path {
                pairBinSteps: vec![bin_step],
                versions: vec![version],
                tokenPath: vec![token_in, token_out],
            };

            match side {
                SwapSide::BuyIndex => {
                    let input = ILBRouter::swapExactNATIVEForTokensCall {
                        amountOutMin: U256::ZERO,
                        path,
                        to: recipient,
                        deadline,
                    }
                    .abi_encode();
                    ContractCall::new(router, input, CallKind::Swap).with_value(amount)
                }
                SwapSide::SellIndex => {
                    let input = ILBRouter::swapExactTokensForNATIVECall {
                        amountIn: amount,
                        amountOutMinNATIVE: U256::ZERO,
                        path,
                        to: recipient,
                        deadline,
                    }
                    .abi_encode();
                    ContractCall::new(router, input, CallKind::Swap)
                }
            }
        }
        PoolKind::ConcentratedLiquidity => {
            let fee = ctx.read(pool.address, IConcentratedPool::feeCall {}).await?;
            let input = IUniswapSwapRouter::exactInputSingleCall {
                params: IUniswapSwapRouter::ExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    fee,
                    recipient,
                    deadline,
                    amountIn: amount,
                    amountOutMinimum: U256::ZERO,
                    sqrtPriceLimitX96: U160::ZERO,
                },
            }
            .abi_encode();

            let call = ContractCall::new(router, input, CallKind::Swap);
            match side {
                SwapSide::BuyIndex => call.with_value(amount),
                SwapSide::SellIndex => call,
            }
        }
    };

    Ok(call)
}

/// Decode the amount a swap static call returned
pub fn decode_swap_output(pool: &Pool, side: SwapSide, output: &[u8]) -> Result<U256> {
    let amount = match (pool.kind, side) {
        (PoolKind::ConcentratedLiquidity, _) => {
            IUniswapSwapRouter::exactInputSingleCall::abi_decode_returns(output)?
        }
        (_, SwapSide::BuyIndex) => ILBRouter::swapExactNATIVEForTokensCall::abi_decode_returns(output)?,
        (_, SwapSide::SellIndex) => ILBRouter::swapExactTokensForNATIVECall::abi_decode_returns(output)?,
    };
    Ok(amount)
}
