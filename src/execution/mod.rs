//! Execution Coordinator - simulate, then commit
//!
//! Per pool and cycle:
//! 1. Assess the NAV delta on the primary context
//! 2. Size and dry-run both legs on the Simulated context; stop below threshold
//! 3. Commit leg 1, measure the index actually received, size leg 2 to it
//! 4. Report the native balance change as realized profit
//!
//! ⚠️  The two legs are separate transactions. A failed leg 2 leaves the leg 1
//! position open; it is reported, never unwound.

pub mod plans;
pub mod quotes;
pub mod swaps;

pub use plans::{
    allocate_mint, BurnPlan, IndexAnatomy, MintPlan, PlanBuilder, QuoteLeg, SlippagePolicy,
};
pub use quotes::{QuoteAggregator, SwapQuote, ZeroExClient};
pub use swaps::{swap_call, SwapSide};

use alloy_primitives::{I256, U256};
use alloy_sol_types::SolCall;
use eyre::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::chain::{ContractCall, ExecutionContext, TransactionBroker, TransactionOutcome};
use crate::config::GasPolicy;
use crate::contracts::IIndexRouter;
use crate::deployments::Deployment;
use crate::pricing::{Pool, PriceOracle};
use crate::sizing::{TradeDirection, TradeSize, TradeSizer};
use crate::units::{balance_delta, signed_to_ether, to_ether};

/// Which half of an arbitrage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    First,
    Second,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::First => write!(f, "leg 1"),
            Leg::Second => write!(f, "leg 2"),
        }
    }
}

/// Dry-run result on the fork
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryRunEstimate {
    pub size: TradeSize,
    /// Index minted (premium) or bought (discount)
    pub intermediate: U256,
    /// Native received from leg 2
    pub received: U256,
    /// Marked-up gas of both legs
    pub gas: u64,
    pub gas_price: u128,
    /// `received - gas * gasPrice - size`
    pub profit: I256,
}

impl DryRunEstimate {
    pub fn gas_cost(&self) -> U256 {
        U256::from(self.gas) * U256::from(self.gas_price)
    }
}

/// Terminal state of one pool's cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Pool price equals NAV
    NoDivergence,
    /// Sizing returned zero or the dry run missed the threshold
    Unprofitable {
        direction: TradeDirection,
        estimate: Option<DryRunEstimate>,
    },
    /// A committed leg reverted; the cycle stopped there
    LegFailed {
        direction: TradeDirection,
        leg: Leg,
        outcome: TransactionOutcome,
        estimate: DryRunEstimate,
    },
    Completed {
        direction: TradeDirection,
        estimate: DryRunEstimate,
        /// Change in native + wrapped-native balance
        profit: I256,
    },
}

impl CycleOutcome {
    /// Realized profit; only a completed arbitrage has one
    pub fn profit(&self) -> Option<I256> {
        match self {
            CycleOutcome::Completed { profit, .. } => Some(*profit),
            _ => None,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, CycleOutcome::LegFailed { .. } | CycleOutcome::Completed { .. })
    }
}

pub struct ExecutionCoordinator {
    deployment: Arc<Deployment>,
    oracle: PriceOracle,
    sizer: TradeSizer,
    quotes: Arc<dyn QuoteAggregator>,
    gas: GasPolicy,
    slippage: SlippagePolicy,
    /// Minimum dry-run profit in native wei
    profit_threshold: U256,
}

impl ExecutionCoordinator {
    pub fn new(
        deployment: Arc<Deployment>,
        oracle: PriceOracle,
        sizer: TradeSizer,
        quotes: Arc<dyn QuoteAggregator>,
        gas: GasPolicy,
        slippage: SlippagePolicy,
        profit_threshold: U256,
    ) -> Self {
        Self {
            deployment,
            oracle,
            sizer,
            quotes,
            gas,
            slippage,
            profit_threshold,
        }
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    fn plans(&self) -> PlanBuilder<'_> {
        PlanBuilder::new(self.quotes.as_ref(), self.deployment.wrapped_native, self.slippage)
    }

    /// Mint call for `amount` native wei, quoted for the context's mode
    pub async fn mint_call(&self, ctx: &ExecutionContext, amount: U256) -> Result<ContractCall> {
        let anatomy = IndexAnatomy::read(ctx, self.deployment.index).await?;
        let plan = self.plans().mint_plan(amount, &anatomy, ctx.mode).await?;
        Ok(plan.call(&self.deployment, ctx.address()))
    }

    /// Burn call for `amount` index wei, aligned with `burnTokensAmount`
    pub async fn burn_call(&self, ctx: &ExecutionContext, amount: U256) -> Result<ContractCall> {
        let anatomy = IndexAnatomy::read(ctx, self.deployment.index).await?;
        let sell_amounts = ctx
            .read(
                self.deployment.index_router,
                IIndexRouter::burnTokensAmountCall { _index: self.deployment.index, _amount: amount },
            )
            .await?;
        let plan = self
            .plans()
            .burn_plan(amount, &anatomy.burn_assets(), &sell_amounts, ctx.mode)
            .await?;
        Ok(plan.call(&self.deployment, ctx.address()))
    }

    /// Run one pool through assess, dry run and commit
    pub async fn run_pool(
        &self,
        primary: &ExecutionContext,
        simulated: &ExecutionContext,
        pool: &Pool,
    ) -> Result<CycleOutcome> {
        self.oracle.check_base_asset(primary, pool).await?;
        let delta = self.oracle.price_delta(primary, pool).await?;

        let Some(direction) = TradeDirection::from_delta(delta) else {
            info!("⚖️  {} trades at NAV, nothing to do", pool.label);
            return Ok(CycleOutcome::NoDivergence);
        };
        info!("🔍 {} is at a {} of {:+.3}%", pool.label, direction, delta * 100.0);

        let Some(estimate) = self.dry_run(simulated, pool, direction).await? else {
            return Ok(CycleOutcome::Unprofitable { direction, estimate: None });
        };

        if estimate.profit < I256::from_raw(self.profit_threshold) {
            info!(
                "📉 Arb not profitable enough using {:.6} {}: expected {:+.6}",
                to_ether(estimate.size.amount),
                primary.network.native_symbol,
                signed_to_ether(estimate.profit)
            );
            return Ok(CycleOutcome::Unprofitable { direction, estimate: Some(estimate) });
        }

        info!(
            "💰 Arb profitable using {:.6} {}: expected {:+.6}",
            to_ether(estimate.size.amount),
            primary.network.native_symbol,
            signed_to_ether(estimate.profit)
        );
        self.commit(primary, pool, direction, estimate).await
    }

    /// Size and static-call both legs on the fork; `None` when the size is zero
    pub async fn dry_run(
        &self,
        sim: &ExecutionContext,
        pool: &Pool,
        direction: TradeDirection,
    ) -> Result<Option<DryRunEstimate>> {
        let target = self.oracle.nav_in(sim, &pool.quote_asset).await?;
        let size = self.sizer.size(sim, pool, target, direction).await?;
        if size.is_zero() {
            info!("{} sized to zero, skipping", pool.label);
            return Ok(None);
        }

        let broker = TransactionBroker::new(sim, self.gas);
        let (intermediate, gas1, received, gas2) = match direction {
            TradeDirection::Premium => {
                let mint = self.mint_call(sim, size.amount).await?;
                let (out, gas1) = broker.simulate(&mint).await?;
                let minted = IIndexRouter::mintSwapValueCall::abi_decode_returns(&out)?;

                let sell = swap_call(sim, &self.deployment, pool, SwapSide::SellIndex, minted).await?;
                let (out, gas2) = broker.simulate(&sell).await?;
                let received = swaps::decode_swap_output(pool, SwapSide::SellIndex, &out)?;
                (minted, gas1, received, gas2)
            }
            TradeDirection::Discount => {
                let buy = swap_call(sim, &self.deployment, pool, SwapSide::BuyIndex, size.amount).await?;
                let (out, gas1) = broker.simulate(&buy).await?;
                let bought = swaps::decode_swap_output(pool, SwapSide::BuyIndex, &out)?;

                let burn = self.burn_call(sim, bought).await?;
                let (out, gas2) = broker.simulate(&burn).await?;
                let received = IIndexRouter::burnSwapValueCall::abi_decode_returns(&out)?;
                (bought, gas1, received, gas2)
            }
        };

        let mut estimate = DryRunEstimate {
            size,
            intermediate,
            received,
            gas: gas1 + gas2,
            gas_price: sim.gas_price().await?,
            profit: I256::ZERO,
        };
        estimate.profit = balance_delta(estimate.gas_cost() + size.amount, received);

        info!(
            "🧪 Dry run: {:.6} {} received (typically understated), gas {} @ {}",
            to_ether(received),
            sim.network.native_symbol,
            estimate.gas,
            estimate.gas_price
        );

        Ok(Some(estimate))
    }

    async fn commit(
        &self,
        ctx: &ExecutionContext,
        pool: &Pool,
        direction: TradeDirection,
        estimate: DryRunEstimate,
    ) -> Result<CycleOutcome> {
        let broker = TransactionBroker::new(ctx, self.gas);
        let index = self.deployment.index;

        let native_before = ctx.total_native_balance().await?;
        let index_before = ctx.token_balance(index).await?;

        let leg1 = match direction {
            TradeDirection::Premium => self.mint_call(ctx, estimate.size.amount).await?,
            TradeDirection::Discount => {
                swap_call(ctx, &self.deployment, pool, SwapSide::BuyIndex, estimate.size.amount).await?
            }
        };
        let outcome = broker.execute(&leg1).await?;
        if !outcome.success {
            warn!("❌ {} {} reverted; nothing else sent", pool.label, Leg::First);
            return Ok(CycleOutcome::LegFailed { direction, leg: Leg::First, outcome, estimate });
        }

        let index_after = ctx.token_balance(index).await?;
        let received_index = index_after.saturating_sub(index_before);
        info!(
            "📦 {} received {:.6} {}",
            Leg::First,
            to_ether(received_index),
            self.deployment.index_symbol
        );

        let leg2 = match direction {
            TradeDirection::Premium => {
                swap_call(ctx, &self.deployment, pool, SwapSide::SellIndex, received_index).await?
            }
            TradeDirection::Discount => self.burn_call(ctx, received_index).await?,
        };
        let outcome = broker.execute(&leg2).await?;
        if !outcome.success {
            error!(
                "🚨 {} {} reverted after {} succeeded: holding {:.6} {} unsold",
                pool.label,
                Leg::Second,
                Leg::First,
                to_ether(received_index),
                self.deployment.index_symbol
            );
            return Ok(CycleOutcome::LegFailed { direction, leg: Leg::Second, outcome, estimate });
        }

        let native_after = ctx.total_native_balance().await?;
        let profit = balance_delta(native_before, native_after);
        info!(
            "✅ {} arbitrage complete: {:+.6} {}",
            pool.label,
            signed_to_ether(profit),
            ctx.network.native_symbol
        );

        Ok(CycleOutcome::Completed { direction, estimate, profit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::{addr_word, test_context, words, MockRpc};
    use crate::config::ExecutionMode;
    use crate::contracts::{IConstantProductPair, IIndexHelper, IIndexToken, ILBRouter, IWrappedNative};
    use crate::deployments::{AVALANCHE_INDEX_HELPER, AVALANCHE_INDEX_ROUTER, CAI, CAI_TJ_V1_POOL, TRADER_JOE_ROUTER, WAVAX};
    use crate::pricing::UsdPriceFeed;
    use crate::sizing::{InitializedTick, TickIndexer};
    use alloy_primitives::{Address, Bytes, TxKind};
    use alloy_sol_types::{sol_data, SolCall, SolType};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const WAD: u128 = 1_000_000_000_000_000_000;

    /// Constituent that has to be swapped on burn
    const BASKET_ASSET: Address = Address::repeat_byte(0xB1);
    /// Delisted constituent the index holds none of
    const DELISTED: Address = Address::repeat_byte(0xD1);
    const QUOTE_TARGET: Address = Address::repeat_byte(0x0E);

    struct TenDollarFeed;

    #[async_trait]
    impl UsdPriceFeed for TenDollarFeed {
        async fn usd_price(&self, _asset_id: &str) -> Result<f64> {
            Ok(10.0)
        }
    }

    struct NoTicks;

    #[async_trait]
    impl TickIndexer for NoTicks {
        async fn ticks(&self, _pool: Address) -> Result<Vec<InitializedTick>> {
            Ok(Vec::new())
        }
    }

    /// The anatomy below is all wrapped native, so no quote is ever needed
    struct NoQuotes;

    #[async_trait]
    impl QuoteAggregator for NoQuotes {
        async fn quote(&self, _request: &quotes::QuoteRequest) -> Result<SwapQuote> {
            Err(eyre::eyre!("unexpected quote request"))
        }
    }

    /// Quotes every swap at a guaranteed price of 0.5 and keeps the requests
    #[derive(Default)]
    struct HalfPriceQuotes {
        requests: Mutex<Vec<quotes::QuoteRequest>>,
    }

    #[async_trait]
    impl QuoteAggregator for HalfPriceQuotes {
        async fn quote(&self, request: &quotes::QuoteRequest) -> Result<SwapQuote> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(SwapQuote {
                sell_amount: request.sell_amount,
                buy_token: request.buy_token,
                guaranteed_price: U256::from(WAD / 2),
                to: QUOTE_TARGET,
                data: Bytes::from(vec![0xab; 8]),
            })
        }
    }

    fn coordinator(threshold: U256) -> ExecutionCoordinator {
        coordinator_with(threshold, Arc::new(NoQuotes))
    }

    fn coordinator_with(threshold: U256, aggregator: Arc<dyn QuoteAggregator>) -> ExecutionCoordinator {
        let deployment = Arc::new(Deployment::avalanche());
        let oracle = PriceOracle::new(Arc::new(TenDollarFeed), CAI, AVALANCHE_INDEX_HELPER);
        let sizer = TradeSizer::new(oracle.clone(), Arc::new(NoTicks), deployment.clone());
        ExecutionCoordinator::new(
            deployment,
            oracle,
            sizer,
            aggregator,
            GasPolicy::default(),
            SlippagePolicy { live: 0.015, simulated: 0.99 },
            threshold,
        )
    }

    fn pool() -> Pool {
        Deployment::avalanche().pools[0].clone()
    }

    /// NAV $20 with AVAX at $10, so 2.0 AVAX per CAI; the pool holds 1000 CAI
    fn prices(rpc: &MockRpc, avax_reserve: u128) {
        rpc.on_call(CAI_TJ_V1_POOL, IConstantProductPair::token0Call::SELECTOR, words(&[addr_word(CAI)]));
        rpc.on_call(
            CAI_TJ_V1_POOL,
            IConstantProductPair::getReservesCall::SELECTOR,
            words(&[U256::from(1_000 * WAD), U256::from(avax_reserve * WAD), U256::ZERO]),
        );
        rpc.on_call(
            AVALANCHE_INDEX_HELPER,
            IIndexHelper::totalEvaluationCall::SELECTOR,
            words(&[U256::ZERO, U256::from(20_000_000u64)]),
        );
    }

    fn anatomy(rpc: &MockRpc, assets: Vec<Address>, weights: Vec<u8>, inactive: Vec<Address>) {
        let active = <(sol_data::Array<sol_data::Address>, sol_data::Array<sol_data::Uint<8>>)>::abi_encode_params(
            &(assets, weights),
        );
        rpc.on_call(CAI, IIndexToken::anatomyCall::SELECTOR, active.into());
        let inactive = <(sol_data::Array<sol_data::Address>,)>::abi_encode_params(&(inactive,));
        rpc.on_call(CAI, IIndexToken::inactiveAnatomyCall::SELECTOR, inactive.into());
    }

    /// All-wrapped-native index; 2500 AVAX in the pool is a 25% premium
    fn market(rpc: &MockRpc, avax_reserve: u128) {
        prices(rpc, avax_reserve);
        anatomy(rpc, vec![WAVAX], vec![255], vec![]);
    }

    /// 1500 AVAX in the pool is a 25% discount. Burning returns 40 of the
    /// basket asset, 60 wrapped native and nothing of the delisted asset.
    fn discount_market(rpc: &MockRpc) {
        prices(rpc, 1_500);
        anatomy(rpc, vec![BASKET_ASSET, WAVAX], vec![100, 155], vec![DELISTED]);
        let amounts = <(sol_data::Array<sol_data::Uint<256>>,)>::abi_encode_params(&(vec![
            U256::from(40 * WAD),
            U256::from(60 * WAD),
            U256::ZERO,
        ],));
        rpc.on_call(AVALANCHE_INDEX_ROUTER, IIndexRouter::burnTokensAmountCall::SELECTOR, amounts.into());
    }

    /// Fork where the buy yields 120 CAI and burning them yields `burn_output` AVAX
    fn discount_fork(burn_output: U256) -> Arc<MockRpc> {
        let rpc = Arc::new(MockRpc::new());
        discount_market(&rpc);
        rpc.on_call(
            TRADER_JOE_ROUTER,
            ILBRouter::swapExactNATIVEForTokensCall::SELECTOR,
            words(&[U256::from(120 * WAD)]),
        );
        rpc.on_call(AVALANCHE_INDEX_ROUTER, IIndexRouter::burnSwapValueCall::SELECTOR, words(&[burn_output]));
        rpc.set_gas_estimate(200_000);
        rpc
    }

    /// Live chain at the same discount; the account already holds 5 CAI and
    /// the buy delivers 120 more
    fn discount_live() -> Arc<MockRpc> {
        let rpc = Arc::new(MockRpc::new());
        discount_market(&rpc);
        rpc.set_balances(vec![U256::from(1_000 * WAD), U256::from(1_020 * WAD)]);
        rpc.on_call(WAVAX, IWrappedNative::balanceOfCall::SELECTOR, words(&[U256::ZERO]));
        rpc.on_call(CAI, IIndexToken::balanceOfCall::SELECTOR, words(&[U256::from(5 * WAD)]));
        rpc.on_call(CAI, IIndexToken::balanceOfCall::SELECTOR, words(&[U256::from(125 * WAD)]));
        rpc
    }

    /// Fork where minting yields 118 CAI and selling it yields `sell_output` AVAX
    fn fork(sell_output: U256) -> Arc<MockRpc> {
        let rpc = Arc::new(MockRpc::new());
        market(&rpc, 2_500);
        rpc.on_call(
            AVALANCHE_INDEX_ROUTER,
            IIndexRouter::mintSwapValueCall::SELECTOR,
            words(&[U256::from(118 * WAD)]),
        );
        rpc.on_call(
            TRADER_JOE_ROUTER,
            ILBRouter::swapExactTokensForNATIVECall::SELECTOR,
            words(&[sell_output]),
        );
        rpc.set_gas_estimate(200_000);
        rpc
    }

    /// Live chain that sees the same market and mints 118 CAI
    fn live() -> Arc<MockRpc> {
        let rpc = Arc::new(MockRpc::new());
        market(&rpc, 2_500);
        rpc.set_balances(vec![U256::from(1_000 * WAD), U256::from(1_010 * WAD)]);
        rpc.on_call(WAVAX, IWrappedNative::balanceOfCall::SELECTOR, words(&[U256::ZERO]));
        rpc.on_call(CAI, IIndexToken::balanceOfCall::SELECTOR, words(&[U256::ZERO]));
        rpc.on_call(CAI, IIndexToken::balanceOfCall::SELECTOR, words(&[U256::from(118 * WAD)]));
        rpc
    }

    #[tokio::test]
    async fn test_premium_dry_run_estimate() {
        let sim_rpc = fork(U256::from(250 * WAD));
        let sim = test_context(sim_rpc.clone(), ExecutionMode::Simulated);

        let estimate = coordinator(U256::ZERO)
            .dry_run(&sim, &pool(), TradeDirection::Premium)
            .await
            .unwrap()
            .unwrap();

        // 1.1x mint gas + 1.5x swap gas
        assert_eq!(estimate.gas, 220_000 + 300_000);
        assert_eq!(estimate.intermediate, U256::from(118 * WAD));
        assert_eq!(estimate.received, U256::from(250 * WAD));
        let expected = balance_delta(estimate.gas_cost() + estimate.size.amount, estimate.received);
        assert_eq!(estimate.profit, expected);
        assert!(estimate.profit.is_positive());
        assert!(sim_rpc.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unprofitable_dry_run_sends_nothing_live() {
        // selling returns less than the mint cost
        let sim = test_context(fork(U256::from(200 * WAD)), ExecutionMode::Simulated);
        let live_rpc = live();
        let primary = test_context(live_rpc.clone(), ExecutionMode::Live);

        let outcome = coordinator(U256::from(WAD)).run_pool(&primary, &sim, &pool()).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Unprofitable { direction: TradeDirection::Premium, estimate: Some(_) }));
        assert_eq!(outcome.profit(), None);
        assert!(live_rpc.sent().is_empty());
        assert_eq!(live_rpc.estimate_count(), 0);
    }

    #[tokio::test]
    async fn test_profitable_premium_commits_both_legs() {
        let sim = test_context(fork(U256::from(250 * WAD)), ExecutionMode::Simulated);
        let live_rpc = live();
        let primary = test_context(live_rpc.clone(), ExecutionMode::Live);

        let outcome = coordinator(U256::from(WAD)).run_pool(&primary, &sim, &pool()).await.unwrap();

        assert_eq!(outcome.profit(), Some(I256::from_raw(U256::from(10 * WAD))));
        assert_eq!(live_rpc.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_leg_two_revert_reports_no_profit() {
        let sim = test_context(fork(U256::from(250 * WAD)), ExecutionMode::Simulated);
        let live_rpc = live();
        live_rpc.push_receipt(true);
        live_rpc.push_receipt(false);
        let primary = test_context(live_rpc.clone(), ExecutionMode::Live);

        let outcome = coordinator(U256::from(WAD)).run_pool(&primary, &sim, &pool()).await.unwrap();

        match &outcome {
            CycleOutcome::LegFailed { leg, outcome, .. } => {
                assert_eq!(*leg, Leg::Second);
                assert!(!outcome.success);
            }
            other => panic!("expected a leg failure, got {:?}", other),
        }
        assert_eq!(outcome.profit(), None);
        // leg 1 and the reverted leg 2, nothing compensating
        assert_eq!(live_rpc.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_leg_one_revert_stops_before_leg_two() {
        let sim = test_context(fork(U256::from(250 * WAD)), ExecutionMode::Simulated);
        let live_rpc = live();
        live_rpc.push_receipt(false);
        let primary = test_context(live_rpc.clone(), ExecutionMode::Live);

        let outcome = coordinator(U256::from(WAD)).run_pool(&primary, &sim, &pool()).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::LegFailed { leg: Leg::First, .. }));
        assert_eq!(live_rpc.sent().len(), 1);
        // index balance is read before leg 1 only
        assert_eq!(live_rpc.call_count(CAI, IIndexToken::balanceOfCall::SELECTOR), 1);
    }

    #[tokio::test]
    async fn test_profitable_discount_buys_then_burns() {
        let sim = test_context(discount_fork(U256::from(250 * WAD)), ExecutionMode::Simulated);
        let live_rpc = discount_live();
        let primary = test_context(live_rpc.clone(), ExecutionMode::Live);
        let aggregator = Arc::new(HalfPriceQuotes::default());

        let outcome = coordinator_with(U256::from(WAD), aggregator.clone())
            .run_pool(&primary, &sim, &pool())
            .await
            .unwrap();

        let CycleOutcome::Completed { direction, estimate, profit } = &outcome else {
            panic!("expected a completed arbitrage, got {:?}", outcome);
        };
        assert_eq!(*direction, TradeDirection::Discount);
        assert_eq!(estimate.intermediate, U256::from(120 * WAD));
        assert_eq!(estimate.received, U256::from(250 * WAD));
        // 1.5x swap gas + 1.1x burn gas
        assert_eq!(estimate.gas, 300_000 + 220_000);
        let expected = balance_delta(estimate.gas_cost() + estimate.size.amount, estimate.received);
        assert_eq!(estimate.profit, expected);
        assert!(estimate.profit.is_positive());
        assert_eq!(*profit, I256::from_raw(U256::from(20 * WAD)));

        let txs = live_rpc.sent_txs();
        assert_eq!(txs.len(), 2);

        // leg 1 spends the sized native amount buying CAI from the pool
        assert_eq!(txs[0].to, TxKind::Call(TRADER_JOE_ROUTER));
        assert_eq!(txs[0].value, estimate.size.amount);
        let buy = ILBRouter::swapExactNATIVEForTokensCall::abi_decode(&txs[0].input).unwrap();
        assert_eq!(buy.path.tokenPath, vec![WAVAX, CAI]);

        // leg 2 burns exactly the 120 CAI leg 1 delivered, not the whole balance
        assert_eq!(txs[1].to, TxKind::Call(AVALANCHE_INDEX_ROUTER));
        assert_eq!(txs[1].value, U256::ZERO);
        let burn = IIndexRouter::burnSwapValueCall::abi_decode(&txs[1].input).unwrap()._params;
        assert_eq!(burn.amount, U256::from(120 * WAD));
        assert_eq!(burn.outputAsset, WAVAX);

        let asked = live_rpc.call_inputs(AVALANCHE_INDEX_ROUTER, IIndexRouter::burnTokensAmountCall::SELECTOR);
        assert_eq!(asked.len(), 1);
        let asked = IIndexRouter::burnTokensAmountCall::abi_decode(&asked[0]).unwrap();
        assert_eq!(asked._amount, burn.amount);

        // one quote leg per burnTokensAmount entry, in order
        let basket_sell = plans::burn_sell_amount(U256::from(40 * WAD));
        assert_eq!(burn.quotes.len(), 3);
        assert_eq!(burn.quotes[0].swapTarget, QUOTE_TARGET);
        assert_eq!(burn.quotes[0].buyAssetMinAmount, basket_sell / U256::from(2u64));
        // wrapped native needs no swap, the delisted asset has nothing to sell
        assert!(burn.quotes[1].swapTarget.is_zero());
        assert!(burn.quotes[1].assetQuote.is_empty());
        assert!(burn.quotes[2].swapTarget.is_zero());
        assert_eq!(burn.quotes[2].buyAssetMinAmount, U256::ZERO);

        // only the basket asset is ever quoted: once on the fork, once live
        let requests = aggregator.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        for request in requests.iter() {
            assert_eq!(request.sell_token, BASKET_ASSET);
            assert_eq!(request.buy_token, WAVAX);
            assert_eq!(request.sell_amount, basket_sell);
        }
        assert_eq!(requests[1].slippage, 0.015);
    }

    #[tokio::test]
    async fn test_discount_leg_two_revert_reports_no_profit() {
        let sim = test_context(discount_fork(U256::from(250 * WAD)), ExecutionMode::Simulated);
        let live_rpc = discount_live();
        live_rpc.push_receipt(true);
        live_rpc.push_receipt(false);
        let primary = test_context(live_rpc.clone(), ExecutionMode::Live);

        let outcome = coordinator_with(U256::from(WAD), Arc::new(HalfPriceQuotes::default()))
            .run_pool(&primary, &sim, &pool())
            .await
            .unwrap();

        match &outcome {
            CycleOutcome::LegFailed { direction, leg, outcome, .. } => {
                assert_eq!(*direction, TradeDirection::Discount);
                assert_eq!(*leg, Leg::Second);
                assert!(!outcome.success);
            }
            other => panic!("expected a leg failure, got {:?}", other),
        }
        assert_eq!(outcome.profit(), None);
        assert!(outcome.is_committed());

        // the buy and the reverted burn; nothing sells the stranded CAI
        let txs = live_rpc.sent_txs();
        assert_eq!(txs.len(), 2);
        let burn = IIndexRouter::burnSwapValueCall::abi_decode(&txs[1].input).unwrap()._params;
        assert_eq!(burn.amount, U256::from(120 * WAD));
        // native balance is read before leg 1 only
        assert_eq!(live_rpc.call_count(WAVAX, IWrappedNative::balanceOfCall::SELECTOR), 1);
    }

    #[tokio::test]
    async fn test_pool_at_nav_is_a_no_op() {
        let rpc = Arc::new(MockRpc::new());
        // 2.0 AVAX per CAI is exactly NAV
        market(&rpc, 2_000);
        let ctx = test_context(rpc.clone(), ExecutionMode::Live);

        let outcome = coordinator(U256::ZERO).run_pool(&ctx, &ctx, &pool()).await.unwrap();
        assert_eq!(outcome, CycleOutcome::NoDivergence);
        assert!(rpc.sent().is_empty());
    }
}
