//! Pricing Module - NAV vs. pool spot price
//!
//! This module provides:
//! - Pool identity and AMM kind
//! - USD price feed (CoinGecko-style `simple/price`)
//! - PriceOracle: NAV, spot price per pool kind, signed premium/discount

pub mod feed;
pub mod oracle;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

pub use feed::{CoinGeckoFeed, UsdPriceFeed};
pub use oracle::PriceOracle;

/// AMM design a pool implements; every per-pool operation matches on this
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolKind {
    /// `x * y = k` pair (Trader Joe V1)
    ConstantProduct,
    /// Fixed-width liquidity bins (Trader Joe V2.1 liquidity book)
    DiscretizedBins,
    /// Tick-range liquidity (Uniswap V3)
    ConcentratedLiquidity,
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolKind::ConstantProduct => write!(f, "ConstantProduct"),
            PoolKind::DiscretizedBins => write!(f, "DiscretizedBins"),
            PoolKind::ConcentratedLiquidity => write!(f, "ConcentratedLiquidity"),
        }
    }
}

/// A pool pairing the index token (base) with the wrapped native asset (quote).
///
/// Only identity lives here; reserves and liquidity are read fresh on every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub address: Address,
    pub kind: PoolKind,
    /// Price-feed id of the quote currency, e.g. `"ethereum"`
    pub quote_asset: String,
    pub label: String,
}

impl Pool {
    pub fn new(address: Address, kind: PoolKind, quote_asset: &str, label: &str) -> Self {
        Self {
            address,
            kind,
            quote_asset: quote_asset.to_string(),
            label: label.to_string(),
        }
    }
}

impl std::fmt::Display for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.label, self.address)
    }
}
