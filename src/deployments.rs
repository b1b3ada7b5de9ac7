//! Deployment address book for the two supported chains.
//!
//! Ethereum mainnet trades PDI against its Uniswap V3 PDI/WETH pool.
//! Avalanche C-chain trades CAI against two Trader Joe pools: a V1
//! constant-product pair and a V2.1 liquidity-book pair.

use alloy_primitives::{address, Address};

use crate::pricing::{Pool, PoolKind};

// ============================================
// ETHEREUM MAINNET
// ============================================

pub const ETHEREUM_CHAIN_ID: u64 = 1;

/// PDI index token
pub const PDI: Address = address!("632806BF5c8f062932Dd121244c9fbe7becb8B48");

/// Index router on Ethereum
pub const ETHEREUM_INDEX_ROUTER: Address = address!("1985426d77c431fc95E5Ca51547BcB9b793E8482");

/// Index helper used for NAV (`totalEvaluation`)
pub const ETHEREUM_INDEX_HELPER: Address = address!("76Dd4189d73f07e7B11350CfFc9B503627fc7a3b");

pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

/// PDI/WETH Uniswap V3 pool
pub const PDI_WETH_POOL: Address = address!("F5FE7ea8537CBd9E5e7b81A93828F48037D220c2");

/// Uniswap V3 SwapRouter
pub const UNISWAP_SWAP_ROUTER: Address = address!("E592427A0AEce92De3Edee1F18E0157C05861564");

/// Uniswap V3 QuoterV2
pub const UNISWAP_QUOTER: Address = address!("61fFE014bA17989E743c5F6cB21bF9697530B21e");

// ============================================
// AVALANCHE C-CHAIN
// ============================================

pub const AVALANCHE_CHAIN_ID: u64 = 43114;

/// CAI index token
pub const CAI: Address = address!("48f88A3fE843ccb0b5003e70B4192c1d7448bEf0");

/// Index router on Avalanche
pub const AVALANCHE_INDEX_ROUTER: Address = address!("D6dd95610fC3A3579a2C32fe06158d8bfB8F4eE9");

/// Index helper on Avalanche
pub const AVALANCHE_INDEX_HELPER: Address = address!("aCef72ef3AFEb044845f0869586445e5C6c2504a");

pub const WAVAX: Address = address!("B31f66AA3C1e785363F0875A1B74E27b85FD66c7");

/// CAI/AVAX Trader Joe V1 pair
pub const CAI_TJ_V1_POOL: Address = address!("E5e9d67e93aD363a50cABCB9E931279251bBEFd0");

/// CAI/AVAX Trader Joe V2.1 liquidity-book pair
pub const CAI_TJ_V2_POOL: Address = address!("2219bc1C06e303172d35deEB9C637D074BA4F277");

/// Trader Joe LB router (routes both V1 pairs and LB pairs)
pub const TRADER_JOE_ROUTER: Address = address!("b4315e873dBcf96Ffd0acd8EA43f689D8c20fB30");

// ============================================
// TYPES
// ============================================

/// Contracts an arbitrage bot talks to on one chain.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub index: Address,
    pub index_symbol: &'static str,
    pub index_router: Address,
    pub index_helper: Address,
    pub wrapped_native: Address,
    /// Router used for ConstantProduct and DiscretizedBins pools
    pub joe_router: Address,
    /// Router used for ConcentratedLiquidity pools
    pub uniswap_router: Address,
    pub uniswap_quoter: Address,
    pub pools: Vec<Pool>,
}

impl Deployment {
    pub fn ethereum() -> Self {
        Self {
            index: PDI,
            index_symbol: "PDI",
            index_router: ETHEREUM_INDEX_ROUTER,
            index_helper: ETHEREUM_INDEX_HELPER,
            wrapped_native: WETH,
            joe_router: Address::ZERO,
            uniswap_router: UNISWAP_SWAP_ROUTER,
            uniswap_quoter: UNISWAP_QUOTER,
            pools: vec![Pool::new(
                PDI_WETH_POOL,
                PoolKind::ConcentratedLiquidity,
                "ethereum",
                "PDI/WETH UniV3",
            )],
        }
    }

    pub fn avalanche() -> Self {
        Self {
            index: CAI,
            index_symbol: "CAI",
            index_router: AVALANCHE_INDEX_ROUTER,
            index_helper: AVALANCHE_INDEX_HELPER,
            wrapped_native: WAVAX,
            joe_router: TRADER_JOE_ROUTER,
            uniswap_router: Address::ZERO,
            uniswap_quoter: Address::ZERO,
            pools: vec![
                Pool::new(CAI_TJ_V1_POOL, PoolKind::ConstantProduct, "avalanche-2", "CAI/AVAX TJ V1"),
                Pool::new(CAI_TJ_V2_POOL, PoolKind::DiscretizedBins, "avalanche-2", "CAI/AVAX TJ V2.1"),
            ],
        }
    }

    /// Router the pool's swaps go through
    pub fn swap_router(&self, kind: PoolKind) -> Address {
        match kind {
            PoolKind::ConstantProduct | PoolKind::DiscretizedBins => self.joe_router,
            PoolKind::ConcentratedLiquidity => self.uniswap_router,
        }
    }

    /// Distinct swap routers used by this deployment's pools
    pub fn swap_routers(&self) -> Vec<Address> {
        let mut routers: Vec<Address> = Vec::new();
        for pool in &self.pools {
            let router = self.swap_router(pool.kind);
            if router != Address::ZERO && !routers.contains(&router) {
                routers.push(router);
            }
        }
        routers
    }
}
