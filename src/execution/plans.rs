//! Mint and burn plans
//!
//! A plan is one quote leg per constituent, in anatomy order. The wrapped
//! native asset never needs a swap and gets a null leg.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use eyre::{ensure, Result};
use tracing::debug;

use super::quotes::{QuoteAggregator, QuoteRequest};
use crate::chain::{CallKind, ContractCall, ExecutionContext};
use crate::config::ExecutionMode;
use crate::contracts::{IIndexRouter, IIndexToken};
use crate::deployments::Deployment;

/// Anatomy weights sum to this
pub const WEIGHT_TOTAL: u64 = 255;

/// Burn sell amounts are shaved to `amount * 99999 / 100000`
const BURN_SELL_NUMERATOR: u64 = 99_999;
const BURN_SELL_DENOMINATOR: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnatomyEntry {
    pub asset: Address,
    pub weight: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexAnatomy {
    pub active: Vec<AnatomyEntry>,
    /// Delisted but still held
    pub inactive: Vec<Address>,
}

impl IndexAnatomy {
    /// Read fresh from the index token
    pub async fn read(ctx: &ExecutionContext, index: Address) -> Result<Self> {
        let anatomy = ctx.read(index, IIndexToken::anatomyCall {}).await?;
        ensure!(
            anatomy._assets.len() == anatomy._weights.len(),
            "anatomy has {} assets but {} weights",
            anatomy._assets.len(),
            anatomy._weights.len()
        );
        let inactive = ctx.read(index, IIndexToken::inactiveAnatomyCall {}).await?;

        Ok(Self {
            active: anatomy
                ._assets
                .into_iter()
                .zip(anatomy._weights)
                .map(|(asset, weight)| AnatomyEntry { asset, weight })
                .collect(),
            inactive,
        })
    }

    /// Active then inactive assets, the order `burnTokensAmount` uses
    pub fn burn_assets(&self) -> Vec<Address> {
        self.active
            .iter()
            .map(|e| e.asset)
            .chain(self.inactive.iter().copied())
            .collect()
    }
}

/// One constituent's swap instruction inside a mint or burn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteLeg {
    pub target_asset: Address,
    pub swap_target: Address,
    pub minimum_output: U256,
    pub call_data: Bytes,
}

impl QuoteLeg {
    /// No swap; `minimum_output` carries the wrapped-native share on mints
    pub fn null(target_asset: Address, minimum_output: U256) -> Self {
        Self {
            target_asset,
            swap_target: Address::ZERO,
            minimum_output,
            call_data: Bytes::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.swap_target == Address::ZERO
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub asset: Address,
    pub amount: U256,
}

/// Split `amount` across the anatomy by weight; the last constituent takes
/// whatever is left so the split is exact.
pub fn allocate_mint(amount: U256, anatomy: &[AnatomyEntry]) -> Result<Vec<Allocation>> {
    ensure!(!anatomy.is_empty(), "index anatomy is empty");
    let total: u64 = anatomy.iter().map(|e| e.weight as u64).sum();
    ensure!(total == WEIGHT_TOTAL, "anatomy weights sum to {}, expected {}", total, WEIGHT_TOTAL);

    let mut remaining = amount;
    let mut allocations = Vec::with_capacity(anatomy.len());
    for (i, entry) in anatomy.iter().enumerate() {
        let share = if i == anatomy.len() - 1 {
            remaining
        } else {
            amount * U256::from(entry.weight) / U256::from(WEIGHT_TOTAL)
        };
        ensure!(share <= remaining, "allocation overran the input amount");
        remaining -= share;
        allocations.push(Allocation { asset: entry.asset, amount: share });
    }

    debug_assert!(remaining.is_zero());
    Ok(allocations)
}

/// `amount * 0.99999`, leaving dust for rounding inside the router
pub fn burn_sell_amount(amount: U256) -> U256 {
    amount * U256::from(BURN_SELL_NUMERATOR) / U256::from(BURN_SELL_DENOMINATOR)
}

/// Slippage handling per mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlippagePolicy {
    /// Live slippage tolerance
    pub live: f64,
    /// Fork slippage tolerance; minimum outputs are zeroed there
    pub simulated: f64,
}

impl SlippagePolicy {
    fn tolerance(&self, mode: ExecutionMode) -> f64 {
        match mode {
            ExecutionMode::Simulated => self.simulated,
            ExecutionMode::Live => self.live,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintPlan {
    /// Native wei sent with the mint
    pub amount: U256,
    pub legs: Vec<QuoteLeg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnPlan {
    /// Index wei burned
    pub amount: U256,
    pub legs: Vec<QuoteLeg>,
}

impl MintPlan {
    pub fn call(&self, deployment: &Deployment, recipient: Address) -> ContractCall {
        let params = IIndexRouter::MintSwapValueParams {
            index: deployment.index,
            inputToken: deployment.wrapped_native,
            amountInInputToken: self.amount,
            recipient,
            quotes: self
                .legs
                .iter()
                .map(|leg| IIndexRouter::MintQuoteParams {
                    asset: leg.target_asset,
                    swapTarget: leg.swap_target,
                    buyAssetMinAmount: leg.minimum_output,
                    assetQuote: leg.call_data.clone(),
                })
                .collect(),
        };
        let input = IIndexRouter::mintSwapValueCall { _params: params }.abi_encode();
        ContractCall::new(deployment.index_router, input, CallKind::Mint).with_value(self.amount)
    }
}

impl BurnPlan {
    pub fn call(&self, deployment: &Deployment, recipient: Address) -> ContractCall {
        let params = IIndexRouter::BurnSwapParams {
            index: deployment.index,
            amount: self.amount,
            outputAsset: deployment.wrapped_native,
            recipient,
            quotes: self
                .legs
                .iter()
                .map(|leg| IIndexRouter::BurnQuoteParams {
                    swapTarget: leg.swap_target,
                    buyAssetMinAmount: leg.minimum_output,
                    assetQuote: leg.call_data.clone(),
                })
                .collect(),
        };
        let input = IIndexRouter::burnSwapValueCall { _params: params }.abi_encode();
        ContractCall::new(deployment.index_router, input, CallKind::Burn)
    }
}

pub struct PlanBuilder<'a> {
    quotes: &'a dyn QuoteAggregator,
    wrapped_native: Address,
    slippage: SlippagePolicy,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(quotes: &'a dyn QuoteAggregator, wrapped_native: Address, slippage: SlippagePolicy) -> Self {
        Self { quotes, wrapped_native, slippage }
    }

    /// Mint `amount` native wei worth of index
    pub async fn mint_plan(&self, amount: U256, anatomy: &IndexAnatomy, mode: ExecutionMode) -> Result<MintPlan> {
        let allocations = allocate_mint(amount, &anatomy.active)?;
        let mut legs = Vec::with_capacity(allocations.len());

        for allocation in allocations {
            if allocation.asset == self.wrapped_native {
                legs.push(QuoteLeg::null(self.wrapped_native, allocation.amount));
                continue;
            }

            let quote = self
                .quotes
                .quote(&QuoteRequest {
                    sell_token: self.wrapped_native,
                    buy_token: allocation.asset,
                    sell_amount: allocation.amount,
                    slippage: self.slippage.tolerance(mode),
                })
                .await?;

            legs.push(QuoteLeg {
                target_asset: quote.buy_token,
                swap_target: quote.to,
                minimum_output: match mode {
                    ExecutionMode::Simulated => U256::ZERO,
                    ExecutionMode::Live => quote.min_buy_amount(),
                },
                call_data: quote.data,
            });
        }

        ensure!(legs.len() == anatomy.active.len(), "mint legs do not match the anatomy");
        debug!("Mint plan: {} legs for {} wei", legs.len(), amount);
        Ok(MintPlan { amount, legs })
    }

    /// Burn `amount` index wei; `sell_amounts` is `burnTokensAmount`'s output
    pub async fn burn_plan(
        &self,
        amount: U256,
        assets: &[Address],
        sell_amounts: &[U256],
        mode: ExecutionMode,
    ) -> Result<BurnPlan> {
        ensure!(
            assets.len() == sell_amounts.len(),
            "index holds {} assets but burnTokensAmount returned {} amounts",
            assets.len(),
            sell_amounts.len()
        );

        let mut legs = Vec::with_capacity(assets.len());
        for (asset, sell_amount) in assets.iter().zip(sell_amounts) {
            if sell_amount.is_zero() || *asset == self.wrapped_native {
                legs.push(QuoteLeg::null(*asset, U256::ZERO));
                continue;
            }

            let quote = self
                .quotes
                .quote(&QuoteRequest {
                    sell_token: *asset,
                    buy_token: self.wrapped_native,
                    sell_amount: burn_sell_amount(*sell_amount),
                    slippage: self.slippage.tolerance(mode),
                })
                .await?;

            legs.push(QuoteLeg {
                target_asset: *asset,
                swap_target: quote.to,
                minimum_output: match mode {
                    ExecutionMode::Simulated => U256::ZERO,
                    ExecutionMode::Live => quote.min_buy_amount(),
                },
                call_data: quote.data,
            });
        }

        debug!("Burn plan: {} legs for {} index wei", legs.len(), amount);
        Ok(BurnPlan { amount, legs })
    }
}
