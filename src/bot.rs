//! Per-chain bot
//!
//! One `ChainBot` per chain. A cycle forks the chain at the live gas price,
//! funds the fork account, then runs every pool through the coordinator in
//! order. The fork is stopped whether or not the cycle succeeded.

use alloy_primitives::{Address, I256, U256};
use alloy_sol_types::SolCall;
use eyre::{ensure, Result, WrapErr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::chain::{
    load_signer, AlloyRpc, CallKind, ContractCall, ExecutionContext, ForkNode, Rpc,
    TransactionBroker,
};
use crate::config::{ArbLog, Chain, ChainSettings, Config, ExecutionMode, GasPolicy};
use crate::contracts::{IIndexToken, IWrappedNative};
use crate::deployments::Deployment;
use crate::execution::{CycleOutcome, ExecutionCoordinator, SlippagePolicy, ZeroExClient};
use crate::pricing::{CoinGeckoFeed, Pool, PriceOracle};
use crate::sizing::{SubgraphTicks, TradeSizer};
use crate::units::{from_ether, signed_to_ether};

/// Where the Simulated context connects once a fork is up
#[derive(Debug, Clone)]
pub struct ForkEndpoint {
    pub url: String,
    pub private_key: String,
    pub timeout: Duration,
    pub receipt_timeout: Duration,
}

/// Tally of one chain's cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub chain: Chain,
    pub assessed: usize,
    pub failed: usize,
    pub committed: usize,
    /// Sum of realized profit over completed arbitrages
    pub profit: I256,
}

impl CycleReport {
    fn new(chain: Chain) -> Self {
        Self {
            chain,
            assessed: 0,
            failed: 0,
            committed: 0,
            profit: I256::ZERO,
        }
    }
}

pub struct ChainBot {
    settings: ChainSettings,
    coordinator: ExecutionCoordinator,
    gas: GasPolicy,
    upstream: Arc<dyn Rpc>,
    /// Live context; `None` in dev, where the fork is also the primary context
    live: Option<ExecutionContext>,
    fork: Arc<dyn ForkNode>,
    fork_endpoint: ForkEndpoint,
    arb_log: Option<PathBuf>,
}

impl ChainBot {
    /// Wire up RPC, price feed, aggregator and tick indexer for `chain`
    pub fn connect(config: &Config, chain: Chain, fork: Arc<dyn ForkNode>) -> Result<Self> {
        let settings = config.chain(chain);
        let deployment = Arc::new(settings.deployment.clone());

        let upstream: Arc<dyn Rpc> = Arc::new(
            AlloyRpc::connect(&settings.network.rpc_url, config.rpc_timeout(), config.receipt_timeout())
                .wrap_err_with(|| format!("connecting to {}", chain))?,
        );

        let live = match config.profile.primary_mode() {
            ExecutionMode::Live => {
                let key = config
                    .live_private_key
                    .as_deref()
                    .ok_or_else(|| eyre::eyre!("live profile without PROD_ACCOUNT_PK"))?;
                Some(ExecutionContext::new(
                    Arc::new(settings.network.clone()),
                    ExecutionMode::Live,
                    upstream.clone(),
                    load_signer(key)?,
                ))
            }
            ExecutionMode::Simulated => None,
        };

        let feed = Arc::new(CoinGeckoFeed::new(&config.price_feed_url, config.rpc_timeout())?);
        let oracle = PriceOracle::new(feed, deployment.index, deployment.index_helper);
        let ticks = Arc::new(SubgraphTicks::new(&config.tick_indexer_url, config.rpc_timeout())?);
        let sizer = TradeSizer::new(oracle.clone(), ticks, deployment.clone());
        let quotes = Arc::new(ZeroExClient::new(
            &settings.quote_url,
            config.quote_api_key.as_deref().unwrap_or_default(),
            config.quote_pause(),
            config.rpc_timeout(),
        )?);

        let coordinator = ExecutionCoordinator::new(
            deployment,
            oracle,
            sizer,
            quotes,
            config.gas,
            SlippagePolicy {
                live: config.slippage_threshold,
                simulated: config.simulated_slippage,
            },
            from_ether(settings.profit_threshold),
        );

        Ok(Self {
            settings,
            coordinator,
            gas: config.gas,
            upstream,
            live,
            fork,
            fork_endpoint: ForkEndpoint {
                url: config.fork_rpc_url.clone(),
                private_key: config.fork_private_key.clone(),
                timeout: config.rpc_timeout(),
                receipt_timeout: config.receipt_timeout(),
            },
            arb_log: config.arb_log.then(|| PathBuf::from(&config.arb_log_path)),
        })
    }

    pub fn chain(&self) -> Chain {
        self.settings.chain
    }

    fn deployment(&self) -> &Deployment {
        self.coordinator.deployment()
    }

    /// Fork, fund, assess every pool, stop the fork
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let network = &self.settings.network;
        let gas_price = self.upstream.gas_price().await?;
        let instance = self
            .fork
            .start(&network.rpc_url, gas_price, network.chain_id)
            .await?;

        let result = self.run_on_fork().await;

        if let Err(e) = self.fork.stop(&instance).await {
            warn!("⚠️  Failed to stop fork {}: {:?}", instance.id, e);
        }
        result
    }

    async fn run_on_fork(&self) -> Result<CycleReport> {
        let sim = self.fork_context()?;
        self.preflight(&sim).await?;

        let primary = self.live.as_ref().unwrap_or(&sim);
        Ok(self.assess_pools(primary, &sim).await)
    }

    fn fork_context(&self) -> Result<ExecutionContext> {
        let endpoint = &self.fork_endpoint;
        let rpc = AlloyRpc::connect(&endpoint.url, endpoint.timeout, endpoint.receipt_timeout)?;
        let mut network = self.settings.network.clone();
        network.rpc_url = endpoint.url.clone();

        Ok(ExecutionContext::new(
            Arc::new(network),
            ExecutionMode::Simulated,
            Arc::new(rpc),
            load_signer(&endpoint.private_key)?,
        ))
    }

    /// Give the fork account allowances, an index balance and wrapped native
    pub async fn preflight(&self, sim: &ExecutionContext) -> Result<()> {
        ensure!(sim.is_simulated(), "preflight only runs on the fork");
        let deployment = self.deployment();
        let broker = TransactionBroker::new(sim, self.gas);

        self.approve_all(sim).await?;

        let mint = self
            .coordinator
            .mint_call(sim, from_ether(self.settings.preflight_mint))
            .await?;
        let outcome = broker.execute(&mint).await?;
        ensure!(outcome.success, "preflight mint reverted on the fork");

        let wrap = ContractCall::new(
            deployment.wrapped_native,
            IWrappedNative::depositCall {}.abi_encode(),
            CallKind::Wrap,
        )
        .with_value(from_ether(self.settings.preflight_wrap));
        let outcome = broker.execute(&wrap).await?;
        ensure!(outcome.success, "preflight wrap reverted on the fork");

        info!(
            "🧰 Fork funded: {} {} minted into {}, {} wrapped",
            self.settings.preflight_mint,
            sim.network.native_symbol,
            deployment.index_symbol,
            self.settings.preflight_wrap
        );
        Ok(())
    }

    /// One-off index approvals on the live account
    pub async fn grant_allowances(&self) -> Result<()> {
        let live = self
            .live
            .as_ref()
            .ok_or_else(|| eyre::eyre!("allowances are only granted with a live account"))?;
        self.approve_all(live).await
    }

    async fn approve_all(&self, ctx: &ExecutionContext) -> Result<()> {
        let deployment = self.deployment();
        let broker = TransactionBroker::new(ctx, self.gas);

        let mut spenders = vec![deployment.index_router];
        spenders.extend(deployment.swap_routers());
        for spender in spenders {
            let outcome = broker.execute(&approve_index_call(deployment.index, spender)).await?;
            ensure!(outcome.success, "approving {:?} reverted", spender);
            info!("🔓 [{}] {} approved for {:?}", ctx.mode, deployment.index_symbol, spender);
        }
        Ok(())
    }

    /// Run every pool in order; a failing pool is logged and skipped
    pub async fn assess_pools(&self, primary: &ExecutionContext, sim: &ExecutionContext) -> CycleReport {
        let mut report = CycleReport::new(self.settings.chain);

        for pool in &self.deployment().pools {
            report.assessed += 1;
            let outcome = match self.coordinator.run_pool(primary, sim, pool).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        "❌ chain {} pool {} ({:?}) failed: {:?}",
                        primary.network.chain_id, pool.label, pool.address, e
                    );
                    continue;
                }
            };

            if outcome.is_committed() {
                report.committed += 1;
                self.record(primary, pool, &outcome);
            }
            if let Some(profit) = outcome.profit() {
                report.profit += profit;
            }
        }

        report
    }

    fn record(&self, ctx: &ExecutionContext, pool: &Pool, outcome: &CycleOutcome) {
        let Some(path) = &self.arb_log else { return };
        let Some(entry) = arb_log_entry(ctx, pool, outcome) else { return };
        if let Err(e) = entry.append(path) {
            warn!("⚠️  Failed to write arb log {}: {:?}", path.display(), e);
        }
    }
}

/// Approve `spender` to move `index` without limit
pub fn approve_index_call(index: Address, spender: Address) -> ContractCall {
    let input = IIndexToken::approveCall { spender, amount: U256::MAX }.abi_encode();
    ContractCall::new(index, input, CallKind::Approve)
}

/// Arb log line for a committed outcome
pub fn arb_log_entry(ctx: &ExecutionContext, pool: &Pool, outcome: &CycleOutcome) -> Option<ArbLog> {
    let (direction, estimate, realized, label) = match outcome {
        CycleOutcome::Completed { direction, estimate, profit } => {
            (direction, estimate, Some(profit.to_string()), "completed".to_string())
        }
        CycleOutcome::LegFailed { direction, leg, estimate, .. } => {
            (direction, estimate, None, format!("{} failed", leg))
        }
        _ => return None,
    };

    Some(ArbLog {
        timestamp: chrono::Utc::now(),
        chain_id: ctx.network.chain_id,
        pool: pool.label.clone(),
        direction: direction.to_string(),
        mode: ctx.mode,
        trade_size_wei: estimate.size.amount.to_string(),
        estimated_profit_wei: estimate.profit.to_string(),
        realized_profit_wei: realized,
        outcome: label,
    })
}

/// End-of-cycle line for the console
pub fn describe(report: &CycleReport) -> String {
    format!(
        "{}: {} pools, {} failed, {} committed, profit {:+.6}",
        report.chain,
        report.assessed,
        report.failed,
        report.committed,
        signed_to_ether(report.profit)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::{addr_word, test_context, words, MockRpc, TEST_KEY};
    use crate::chain::ForkInstance;
    use crate::contracts::{IIndexHelper, ILBPair};
    use crate::deployments::{AVALANCHE_INDEX_HELPER, CAI, CAI_TJ_V2_POOL};
    use crate::execution::{DryRunEstimate, QuoteAggregator, SwapQuote};
    use crate::execution::quotes::QuoteRequest;
    use crate::pricing::UsdPriceFeed;
    use crate::sizing::{InitializedTick, TickIndexer, TradeDirection, TradeSize};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

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

    struct NoQuotes;

    #[async_trait]
    impl QuoteAggregator for NoQuotes {
        async fn quote(&self, _request: &QuoteRequest) -> Result<SwapQuote> {
            Err(eyre::eyre!("unexpected quote request"))
        }
    }

    #[derive(Default)]
    struct CountingFork {
        started: AtomicUsize,
        stopped: AtomicUsize,
    }

    #[async_trait]
    impl ForkNode for CountingFork {
        async fn start(&self, _upstream_url: &str, _gas_price: u128, _chain_id: u64) -> Result<ForkInstance> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(ForkInstance { id: "fork-1".to_string() })
        }

        async fn stop(&self, _instance: &ForkInstance) -> Result<()> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn bot(upstream: Arc<MockRpc>, fork: Arc<CountingFork>, arb_log: Option<PathBuf>) -> ChainBot {
        let config = Config::default();
        let settings = config.chain(Chain::Avalanche);
        let deployment = Arc::new(settings.deployment.clone());
        let oracle = PriceOracle::new(Arc::new(TenDollarFeed), CAI, AVALANCHE_INDEX_HELPER);
        let sizer = TradeSizer::new(oracle.clone(), Arc::new(NoTicks), deployment.clone());
        let coordinator = ExecutionCoordinator::new(
            deployment,
            oracle,
            sizer,
            Arc::new(NoQuotes),
            GasPolicy::default(),
            SlippagePolicy { live: 0.015, simulated: 0.99 },
            from_ether(1.0),
        );

        ChainBot {
            settings,
            coordinator,
            gas: GasPolicy::default(),
            upstream,
            live: None,
            fork,
            fork_endpoint: ForkEndpoint {
                url: "http://127.0.0.1:1".to_string(),
                private_key: TEST_KEY.to_string(),
                timeout: Duration::from_secs(2),
                receipt_timeout: Duration::from_secs(2),
            },
            arb_log,
        }
    }

    #[tokio::test]
    async fn test_failing_pool_does_not_stop_the_cycle() {
        // the V1 pair has no responses at all; the V2.1 pair trades at NAV
        let rpc = Arc::new(MockRpc::new());
        rpc.on_call(CAI_TJ_V2_POOL, ILBPair::getTokenXCall::SELECTOR, words(&[addr_word(CAI)]));
        rpc.on_call(CAI_TJ_V2_POOL, ILBPair::getActiveIdCall::SELECTOR, words(&[U256::from(8_388_608u64)]));
        rpc.on_call(CAI_TJ_V2_POOL, ILBPair::getPriceFromIdCall::SELECTOR, words(&[U256::from(2u64) << 128]));
        rpc.on_call(
            AVALANCHE_INDEX_HELPER,
            IIndexHelper::totalEvaluationCall::SELECTOR,
            words(&[U256::ZERO, U256::from(20_000_000u64)]),
        );
        let ctx = test_context(rpc.clone(), ExecutionMode::Simulated);
        let bot = bot(Arc::new(MockRpc::new()), Arc::new(CountingFork::default()), None);

        let report = bot.assess_pools(&ctx, &ctx).await;

        assert_eq!(report.assessed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.committed, 0);
        assert_eq!(report.profit, I256::ZERO);
        assert!(rpc.sent().is_empty());
    }

    #[tokio::test]
    async fn test_fork_is_stopped_when_the_cycle_fails() {
        let fork = Arc::new(CountingFork::default());
        // nothing listens on the fork endpoint, so preflight fails
        let bot = bot(Arc::new(MockRpc::new()), fork.clone(), None);

        assert_err!(bot.run_cycle().await);
        assert_eq!(fork.started.load(Ordering::SeqCst), 1);
        assert_eq!(fork.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_preflight_approves_mints_and_wraps() {
        let rpc = Arc::new(MockRpc::new());
        let anatomy = <(
            alloy_sol_types::sol_data::Array<alloy_sol_types::sol_data::Address>,
            alloy_sol_types::sol_data::Array<alloy_sol_types::sol_data::Uint<8>>,
        ) as alloy_sol_types::SolType>::abi_encode_params(&(vec![crate::deployments::WAVAX], vec![255u8]));
        rpc.on_call(CAI, IIndexToken::anatomyCall::SELECTOR, anatomy.into());
        let inactive = <(alloy_sol_types::sol_data::Array<alloy_sol_types::sol_data::Address>,) as alloy_sol_types::SolType>::abi_encode_params(
            &(Vec::<Address>::new(),),
        );
        rpc.on_call(CAI, IIndexToken::inactiveAnatomyCall::SELECTOR, inactive.into());
        let ctx = test_context(rpc.clone(), ExecutionMode::Simulated);
        let bot = bot(Arc::new(MockRpc::new()), Arc::new(CountingFork::default()), None);

        assert_ok!(bot.preflight(&ctx).await);

        // index router + Trader Joe router approvals, mint, wrap
        let routers = bot.deployment().swap_routers().len();
        assert_eq!(rpc.sent().len(), 1 + routers + 2);
    }

    #[tokio::test]
    async fn test_preflight_refuses_live_context() {
        let rpc = Arc::new(MockRpc::new());
        let ctx = test_context(rpc.clone(), ExecutionMode::Live);
        let bot = bot(Arc::new(MockRpc::new()), Arc::new(CountingFork::default()), None);

        assert_err!(bot.preflight(&ctx).await);
        assert!(rpc.sent().is_empty());
    }

    #[test]
    fn test_arb_log_only_for_committed_outcomes() {
        let ctx = test_context(Arc::new(MockRpc::new()), ExecutionMode::Live);
        let pool = Deployment::avalanche().pools[0].clone();
        let estimate = DryRunEstimate {
            size: TradeSize::exact(U256::from(5u64)),
            intermediate: U256::from(2u64),
            received: U256::from(9u64),
            gas: 1,
            gas_price: 1,
            profit: I256::from_raw(U256::from(3u64)),
        };

        let completed = CycleOutcome::Completed {
            direction: TradeDirection::Premium,
            estimate,
            profit: I256::from_raw(U256::from(2u64)),
        };
        let entry = arb_log_entry(&ctx, &pool, &completed).unwrap();
        assert_eq!(entry.chain_id, 43114);
        assert_eq!(entry.direction, "premium");
        assert_eq!(entry.trade_size_wei, "5");
        assert_eq!(entry.realized_profit_wei.as_deref(), Some("2"));

        let skipped = CycleOutcome::Unprofitable { direction: TradeDirection::Discount, estimate: Some(estimate) };
        assert!(arb_log_entry(&ctx, &pool, &skipped).is_none());
        assert!(arb_log_entry(&ctx, &pool, &CycleOutcome::NoDivergence).is_none());
    }

    #[test]
    fn test_approve_call_is_unlimited() {
        let spender = Address::repeat_byte(0x42);
        let call = approve_index_call(CAI, spender);
        assert_eq!(call.to, CAI);
        assert_eq!(call.kind, CallKind::Approve);
        let decoded = IIndexToken::approveCall::abi_decode(&call.input).unwrap();
        assert_eq!(decoded.spender, spender);
        assert_eq!(decoded.amount, U256::MAX);
    }
}
