//! Configuration for the NAV arbitrage bot
//!
//! Settings come from environment variables (with `.env` support) or a TOML
//! file. The run profile (`dev` / `prod`) picks the primary execution mode
//! and the default profit thresholds.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::chain::Network;
use crate::deployments::{Deployment, AVALANCHE_CHAIN_ID, ETHEREUM_CHAIN_ID, WAVAX, WETH};

// ============================================
// EXECUTION MODE
// ============================================

/// Which chain state a context talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Disposable fork of the chain - nothing here costs real funds
    Simulated,

    /// The real network
    /// CAUTION: This uses real funds!
    Live,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Simulated => write!(f, "SIMULATED"),
            ExecutionMode::Live => write!(f, "LIVE"),
        }
    }
}

// ============================================
// RUN PROFILE
// ============================================

/// Process-level profile selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum RunProfile {
    /// Trade against the fork only, with low profit thresholds
    Dev,
    /// Trade on the live network with production thresholds
    Prod,
}

impl RunProfile {
    /// Mode of the context that commits trades
    pub fn primary_mode(&self) -> ExecutionMode {
        match self {
            RunProfile::Dev => ExecutionMode::Simulated,
            RunProfile::Prod => ExecutionMode::Live,
        }
    }
}

impl Default for RunProfile {
    fn default() -> Self {
        RunProfile::Dev
    }
}

impl std::fmt::Display for RunProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunProfile::Dev => write!(f, "dev"),
            RunProfile::Prod => write!(f, "prod"),
        }
    }
}

// ============================================
// CHAINS
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Chain {
    Ethereum,
    Avalanche,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Ethereum, Chain::Avalanche];
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Chain::Ethereum => write!(f, "Ethereum"),
            Chain::Avalanche => write!(f, "Avalanche"),
        }
    }
}

// ============================================
// GAS POLICY
// ============================================

/// Fixed gas markups; none of these are computed at runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasPolicy {
    /// Markup on gas estimates for index mint/burn calls
    pub index_gas_markup: f64,

    /// Markup on gas estimates for pool swaps and simple calls
    pub swap_gas_markup: f64,

    /// `maxFeePerGas` headroom over gas price for everything but burns
    #[serde(default = "default_fee_markup")]
    pub fee_markup: f64,

    /// Burn `maxFeePerGas` as a multiple of gas price on the fork
    pub simulated_burn_fee_multiple: f64,

    /// Burn `maxFeePerGas` markup on the live network
    pub live_burn_fee_markup: f64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            index_gas_markup: 1.1,
            swap_gas_markup: 1.5,
            fee_markup: default_fee_markup(),
            simulated_burn_fee_multiple: 10.0,
            live_burn_fee_markup: 1.1,
        }
    }
}

fn default_fee_markup() -> f64 {
    1.25
}

// ============================================
// MAIN CONFIGURATION
// ============================================

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Selected run profile
    pub profile: RunProfile,

    // ========== Network Settings ==========
    /// Ethereum mainnet RPC URL
    pub ethereum_rpc_url: String,

    /// Avalanche C-chain RPC URL
    pub avalanche_rpc_url: String,

    /// Endpoint of the local fork node
    pub fork_rpc_url: String,

    /// Port the fork node listens on (must match `fork_rpc_url`)
    pub fork_port: u16,

    /// Hard timeout for a single RPC / HTTP request
    pub rpc_timeout_secs: u64,

    /// How long to wait for a receipt after broadcast
    pub receipt_timeout_secs: u64,

    // ========== Keys ==========
    /// Key for the live account (KEEP SECRET!)
    pub live_private_key: Option<String>,

    /// Key for the fork account (deterministic fork wallet by default)
    pub fork_private_key: String,

    // ========== External Services ==========
    /// Swap-quote aggregator endpoint on Ethereum
    pub ethereum_quote_url: String,

    /// Swap-quote aggregator endpoint on Avalanche
    pub avalanche_quote_url: String,

    /// API key header value for the aggregator
    pub quote_api_key: Option<String>,

    /// Pause between successive aggregator calls (milliseconds)
    pub quote_pause_ms: u64,

    /// USD price feed base URL
    pub price_feed_url: String,

    /// Tick indexer (subgraph) URL for concentrated-liquidity pools
    pub tick_indexer_url: String,

    // ========== Trading ==========
    /// Slippage tolerance for live aggregator quotes (0.015 = 1.5%)
    pub slippage_threshold: f64,

    /// Slippage tolerance on the fork, where minimum outputs are zeroed
    pub simulated_slippage: f64,

    /// Minimum dry-run profit on Ethereum, in ETH
    pub ethereum_profit_threshold: f64,

    /// Minimum dry-run profit on Avalanche, in AVAX
    pub avalanche_profit_threshold: f64,

    /// Gas markups
    pub gas: GasPolicy,

    // ========== Scheduling ==========
    /// Seconds between cycles
    pub cycle_interval_secs: u64,

    // ========== Logging ==========
    /// Append completed/failed arbitrages to a JSON-lines file
    pub arb_log: bool,

    /// Path of the arb log
    pub arb_log_path: String,
}

/// Default deterministic fork account #0
const DEFAULT_FORK_KEY: &str = "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d";

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env(profile: RunProfile) -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::for_profile(profile);

        Ok(Self {
            profile,

            // Network
            ethereum_rpc_url: env_string("ETHEREUM_RPC_URL", &defaults.ethereum_rpc_url),
            avalanche_rpc_url: env_string("AVALANCHE_RPC_URL", &defaults.avalanche_rpc_url),
            fork_rpc_url: env_string("FORK_RPC_URL", &defaults.fork_rpc_url),
            fork_port: env_or("FORK_PORT", defaults.fork_port),
            rpc_timeout_secs: env_or("RPC_TIMEOUT_SECS", defaults.rpc_timeout_secs),
            receipt_timeout_secs: env_or("RECEIPT_TIMEOUT_SECS", defaults.receipt_timeout_secs),

            // Keys
            live_private_key: env::var("PROD_ACCOUNT_PK").ok(),
            fork_private_key: env_string("FORK_ACCOUNT_PK", &defaults.fork_private_key),

            // External services
            ethereum_quote_url: env_string("ETHEREUM_QUOTE_URL", &defaults.ethereum_quote_url),
            avalanche_quote_url: env_string("AVALANCHE_QUOTE_URL", &defaults.avalanche_quote_url),
            quote_api_key: env::var("ZERO_X_API_KEY").ok(),
            quote_pause_ms: env_or("QUOTE_PAUSE_MS", defaults.quote_pause_ms),
            price_feed_url: env_string("PRICE_FEED_URL", &defaults.price_feed_url),
            tick_indexer_url: env_string("TICK_INDEXER_URL", &defaults.tick_indexer_url),

            // Trading
            slippage_threshold: env_or("SLIPPAGE_THRESHOLD", defaults.slippage_threshold),
            simulated_slippage: env_or("SIMULATED_SLIPPAGE", defaults.simulated_slippage),
            ethereum_profit_threshold: env_or(
                "ETHEREUM_PROFIT_THRESHOLD",
                defaults.ethereum_profit_threshold,
            ),
            avalanche_profit_threshold: env_or(
                "AVALANCHE_PROFIT_THRESHOLD",
                defaults.avalanche_profit_threshold,
            ),
            gas: GasPolicy {
                index_gas_markup: env_or("INDEX_GAS_MARKUP", defaults.gas.index_gas_markup),
                swap_gas_markup: env_or("SWAP_GAS_MARKUP", defaults.gas.swap_gas_markup),
                fee_markup: env_or("FEE_MARKUP", defaults.gas.fee_markup),
                simulated_burn_fee_multiple: env_or(
                    "SIMULATED_BURN_FEE_MULTIPLE",
                    defaults.gas.simulated_burn_fee_multiple,
                ),
                live_burn_fee_markup: env_or("LIVE_BURN_FEE_MARKUP", defaults.gas.live_burn_fee_markup),
            },

            // Scheduling
            cycle_interval_secs: env_or("CYCLE_INTERVAL_SECS", defaults.cycle_interval_secs),

            // Logging
            arb_log: env_or("ARB_LOG", defaults.arb_log),
            arb_log_path: env_string("ARB_LOG_PATH", &defaults.arb_log_path),
        })
    }

    /// Defaults for a profile, without reading the environment
    pub fn for_profile(profile: RunProfile) -> Self {
        let (ethereum_profit_threshold, avalanche_profit_threshold) = match profile {
            RunProfile::Dev => (0.02, 1.0),
            RunProfile::Prod => (0.02, 0.5),
        };

        Self {
            profile,
            ethereum_rpc_url: "https://eth.llamarpc.com".to_string(),
            avalanche_rpc_url: "https://api.avax.network/ext/bc/C/rpc".to_string(),
            fork_rpc_url: "http://127.0.0.1:8545".to_string(),
            fork_port: 8545,
            rpc_timeout_secs: 60,
            receipt_timeout_secs: 120,
            live_private_key: None,
            fork_private_key: DEFAULT_FORK_KEY.to_string(),
            ethereum_quote_url: "https://api.0x.org/swap/v1/quote".to_string(),
            avalanche_quote_url: "https://avalanche.api.0x.org/swap/v1/quote".to_string(),
            quote_api_key: None,
            quote_pause_ms: 1000,
            price_feed_url: "https://api.coingecko.com/api/v3".to_string(),
            tick_indexer_url: "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v3".to_string(),
            slippage_threshold: 0.015,
            simulated_slippage: 0.99,
            ethereum_profit_threshold,
            avalanche_profit_threshold,
            gas: GasPolicy::default(),
            cycle_interval_secs: 3600,
            arb_log: true,
            arb_log_path: "./logs/arbitrages.log".to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Per-chain settings derived from this config
    pub fn chain(&self, chain: Chain) -> ChainSettings {
        match chain {
            Chain::Ethereum => ChainSettings {
                chain,
                network: Network {
                    chain_id: ETHEREUM_CHAIN_ID,
                    native_symbol: "ETH".to_string(),
                    native_price_id: "ethereum".to_string(),
                    rpc_url: self.ethereum_rpc_url.clone(),
                    wrapped_native: WETH,
                },
                deployment: Deployment::ethereum(),
                quote_url: self.ethereum_quote_url.clone(),
                profit_threshold: self.ethereum_profit_threshold,
                preflight_mint: 10.0,
                preflight_wrap: 25.0,
            },
            Chain::Avalanche => ChainSettings {
                chain,
                network: Network {
                    chain_id: AVALANCHE_CHAIN_ID,
                    native_symbol: "AVAX".to_string(),
                    native_price_id: "avalanche-2".to_string(),
                    rpc_url: self.avalanche_rpc_url.clone(),
                    wrapped_native: WAVAX,
                },
                deployment: Deployment::avalanche(),
                quote_url: self.avalanche_quote_url.clone(),
                profit_threshold: self.avalanche_profit_threshold,
                preflight_mint: 20000.0,
                preflight_wrap: 3000.0,
            },
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn quote_pause(&self) -> Duration {
        Duration::from_millis(self.quote_pause_ms)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    /// Validate configuration for the selected profile
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("ETHEREUM_RPC_URL", &self.ethereum_rpc_url),
            ("AVALANCHE_RPC_URL", &self.avalanche_rpc_url),
            ("FORK_RPC_URL", &self.fork_rpc_url),
        ] {
            if url.is_empty() || url.contains("YOUR_API_KEY") {
                return Err(eyre::eyre!("Invalid {} - please set a valid RPC URL", name));
            }
        }

        if !is_private_key(&self.fork_private_key) {
            return Err(eyre::eyre!("FORK_ACCOUNT_PK is not a 32-byte hex key"));
        }

        if self.profile == RunProfile::Prod {
            match &self.live_private_key {
                None => return Err(eyre::eyre!("Production profile requires PROD_ACCOUNT_PK")),
                Some(key) if !is_private_key(key) => {
                    return Err(eyre::eyre!("PROD_ACCOUNT_PK is not a 32-byte hex key"))
                }
                Some(_) => {}
            }
        }

        if self.quote_api_key.is_none() {
            return Err(eyre::eyre!("ZERO_X_API_KEY is required for mint/burn quotes"));
        }

        if self.ethereum_profit_threshold < 0.0 || self.avalanche_profit_threshold < 0.0 {
            return Err(eyre::eyre!("Profit thresholds must not be negative"));
        }

        if !(0.0..1.0).contains(&self.slippage_threshold)
            || !(0.0..1.0).contains(&self.simulated_slippage)
        {
            return Err(eyre::eyre!("Slippage must be in [0, 1)"));
        }

        let gas = &self.gas;
        if gas.index_gas_markup < 1.0
            || gas.swap_gas_markup < 1.0
            || gas.fee_markup < 1.0
            || gas.simulated_burn_fee_multiple < 1.0
            || gas.live_burn_fee_markup < 1.0
        {
            return Err(eyre::eyre!("Gas markups must be >= 1.0"));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              NAV ARB - CONFIGURATION                       ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Profile:           {:^40} ║", self.profile);
        println!("║ Commit Mode:       {:^40} ║", self.profile.primary_mode());
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ PROFIT THRESHOLDS                                          ║");
        println!("║ • Ethereum:        {:<36.4} ETH ║", self.ethereum_profit_threshold);
        println!("║ • Avalanche:       {:<35.4} AVAX ║", self.avalanche_profit_threshold);
        println!("║ • Live Slippage:   {:>38.2}% ║", self.slippage_threshold * 100.0);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ GAS                                                        ║");
        println!("║ • Index Markup:    {:^40.2} ║", self.gas.index_gas_markup);
        println!("║ • Swap Markup:     {:^40.2} ║", self.gas.swap_gas_markup);
        println!("║ • Max Fee Markup:  {:^40.2} ║", self.gas.fee_markup);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ KEYS                                                       ║");
        println!("║ • Live Account:    {:^40} ║",
            if self.live_private_key.is_some() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!("║ • Quote API Key:   {:^40} ║",
            if self.quote_api_key.is_some() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ SCHEDULE                                                   ║");
        println!("║ • Cycle Interval:  {:>38}s ║", self.cycle_interval_secs);
        println!("║ • Arb Log:         {:^40} ║",
            if self.arb_log { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::for_profile(RunProfile::Dev)
    }
}

fn is_private_key(key: &str) -> bool {
    hex::decode(key.trim_start_matches("0x"))
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}

/// Everything one chain's bot needs from the config
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub chain: Chain,
    pub network: Network,
    pub deployment: Deployment,
    pub quote_url: String,
    /// Minimum dry-run profit, in native units
    pub profit_threshold: f64,
    /// Native amount minted into index on the fork before each cycle
    pub preflight_mint: f64,
    /// Native amount wrapped on the fork before each cycle
    pub preflight_wrap: f64,
}

// ============================================
// ARB LOGGER
// ============================================

/// One committed (or partially committed) arbitrage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbLog {
    pub timestamp: DateTime<Utc>,
    pub chain_id: u64,
    pub pool: String,
    pub direction: String,
    pub mode: ExecutionMode,
    pub trade_size_wei: String,
    pub estimated_profit_wei: String,
    /// Realized balance change; omitted when a leg failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_profit_wei: Option<String>,
    pub outcome: String,
}

impl ArbLog {
    /// One JSON object terminated by a newline
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Append to the arb log at `path`, creating it on first use
    pub fn append(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).wrap_err_with(|| format!("creating {}", dir.display()))?;
        }

        let line = self.to_line()?;
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .wrap_err_with(|| format!("appending to arb log {}", path.display()))
    }
}

// ============================================
// TESTS
// ============================================
