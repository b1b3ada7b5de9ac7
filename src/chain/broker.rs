//! Transaction Broker
//!
//! Builds, signs and broadcasts transactions for one execution context:
//! - Nonce from `pending` transaction count
//! - Gas estimate with a fixed markup per call kind
//! - `maxFeePerGas` carries headroom over the gas price; burns get their own
//!   multiple (large on the fork, small live)
//! - Receipt status decides success; nothing is retried

use alloy_consensus::TxEip1559;
use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_rpc_types::TransactionRequest;
use eyre::{Result, WrapErr};
use tracing::{debug, info, warn};

use super::signer::sign_eip1559;
use super::{ExecutionContext, ReceiptSummary};
use crate::config::{ExecutionMode, GasPolicy};

/// Tip ceiling; the actual tip is `min(maxFee, this)`
const PRIORITY_FEE_CAP: u128 = 1_000_000_000;

/// What a contract call does, for gas policy and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Mint,
    Burn,
    Swap,
    Approve,
    Wrap,
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallKind::Mint => write!(f, "mint"),
            CallKind::Burn => write!(f, "burn"),
            CallKind::Swap => write!(f, "swap"),
            CallKind::Approve => write!(f, "approve"),
            CallKind::Wrap => write!(f, "wrap"),
        }
    }
}

/// An encoded contract call not yet bound to a nonce or fees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    pub kind: CallKind,
}

impl ContractCall {
    pub fn new(to: Address, input: Vec<u8>, kind: CallKind) -> Self {
        Self {
            to,
            input: Bytes::from(input),
            value: U256::ZERO,
            kind,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Terminal result of one submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub success: bool,
    pub receipt: ReceiptSummary,
}

pub struct TransactionBroker<'a> {
    ctx: &'a ExecutionContext,
    gas: GasPolicy,
}

impl<'a> TransactionBroker<'a> {
    pub fn new(ctx: &'a ExecutionContext, gas: GasPolicy) -> Self {
        Self { ctx, gas }
    }

    fn request(&self, call: &ContractCall) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.ctx.address())
            .to(call.to)
            .value(call.value)
            .input(call.input.clone().into())
    }

    fn markup(&self, kind: CallKind) -> f64 {
        match kind {
            CallKind::Mint | CallKind::Burn => self.gas.index_gas_markup,
            CallKind::Swap | CallKind::Approve | CallKind::Wrap => self.gas.swap_gas_markup,
        }
    }

    /// Marked-up gas limit for a call
    pub async fn estimate_gas(&self, call: &ContractCall) -> Result<u64> {
        let raw = self
            .ctx
            .rpc()
            .estimate_gas(self.request(call))
            .await
            .wrap_err_with(|| format!("estimating gas for {}", call.kind))?;
        Ok((raw as f64 * self.markup(call.kind)) as u64)
    }

    /// Static call plus marked-up gas estimate; nothing is sent
    pub async fn simulate(&self, call: &ContractCall) -> Result<(Bytes, u64)> {
        let output = self
            .ctx
            .rpc()
            .call(self.request(call))
            .await
            .wrap_err_with(|| format!("static {} call", call.kind))?;
        let gas = self.estimate_gas(call).await?;
        Ok((output, gas))
    }

    /// Bind a call to nonce, gas limit and fees
    pub async fn build(&self, call: &ContractCall) -> Result<TxEip1559> {
        let nonce = self.ctx.rpc().pending_nonce(self.ctx.address()).await?;
        let gas_limit = self.estimate_gas(call).await?;
        let gas_price = self.ctx.gas_price().await?;

        let max_fee_per_gas = max_fee(gas_price, call.kind, self.ctx.mode, &self.gas);

        Ok(TxEip1559 {
            chain_id: self.ctx.network.chain_id,
            nonce,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas: max_fee_per_gas.min(PRIORITY_FEE_CAP),
            to: TxKind::Call(call.to),
            value: call.value,
            input: call.input.clone(),
            access_list: Default::default(),
        })
    }

    /// Sign, broadcast and wait for the receipt
    pub async fn submit(&self, tx: TxEip1559) -> Result<TransactionOutcome> {
        let nonce = tx.nonce;
        let raw = sign_eip1559(self.ctx.signer(), tx).await?;
        let receipt = self.ctx.rpc().send_raw_and_wait(raw).await?;

        if receipt.success {
            info!(
                "✅ [{}] tx {:?} mined (nonce {}, gas used {})",
                self.ctx.mode, receipt.tx_hash, nonce, receipt.gas_used
            );
        } else {
            warn!(
                "❌ [{}] tx {:?} reverted (nonce {}, gas used {})",
                self.ctx.mode, receipt.tx_hash, nonce, receipt.gas_used
            );
        }

        Ok(TransactionOutcome {
            success: receipt.success,
            receipt,
        })
    }

    /// Build then submit
    pub async fn execute(&self, call: &ContractCall) -> Result<TransactionOutcome> {
        let tx = self.build(call).await?;
        debug!("Submitting {} to {:?} (value {})", call.kind, call.to, call.value);
        self.submit(tx).await
    }
}

fn max_fee(gas_price: u128, kind: CallKind, mode: ExecutionMode, gas: &GasPolicy) -> u128 {
    let factor = match (kind, mode) {
        (CallKind::Burn, ExecutionMode::Simulated) => gas.simulated_burn_fee_multiple,
        (CallKind::Burn, ExecutionMode::Live) => gas.live_burn_fee_markup,
        _ => gas.fee_markup,
    };
    // never below the quoted price
    ((gas_price as f64 * factor) as u128).max(gas_price)
}
