//! Chain Module - network access scoped to an execution context
//!
//! This module provides:
//! - `Rpc`: the transport seam (alloy HTTP provider in production, fakes in tests)
//! - `ExecutionContext`: one network + one mode + one signer, passed explicitly
//! - `TransactionBroker`: nonce, gas markup, signing, broadcast, receipt status
//! - `ForkNode`: lifecycle of the disposable fork the Simulated context points at

pub mod broker;
pub mod fork;
pub mod rpc;
pub mod signer;

#[cfg(test)]
pub mod testing;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ExecutionMode;
use crate::contracts::IWrappedNative;

pub use broker::{CallKind, ContractCall, TransactionBroker, TransactionOutcome};
pub use fork::{ForkInstance, ForkNode, GanacheFork};
pub use rpc::AlloyRpc;
pub use signer::load_signer;

/// Immutable description of one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub chain_id: u64,
    pub native_symbol: String,
    /// Price-feed id of the native asset
    pub native_price_id: String,
    /// Upstream (live) RPC endpoint
    pub rpc_url: String,
    pub wrapped_native: Address,
}

/// What a mined transaction reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub tx_hash: B256,
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

/// Raw chain access used by everything above it
#[async_trait]
pub trait Rpc: Send + Sync {
    /// `eth_call` against latest state
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes>;

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64>;

    async fn gas_price(&self) -> Result<u128>;

    async fn balance(&self, address: Address) -> Result<U256>;

    /// Transaction count including pending transactions
    async fn pending_nonce(&self, address: Address) -> Result<u64>;

    /// Timestamp of the latest block
    async fn latest_timestamp(&self) -> Result<u64>;

    /// Broadcast a signed transaction and block until its receipt
    async fn send_raw_and_wait(&self, raw: Bytes) -> Result<ReceiptSummary>;
}

/// One network, one mode, one signer.
///
/// Cheap to clone; a sizing dry run borrows the Simulated context while the
/// caller keeps its own, so nothing has to be restored afterwards.
#[derive(Clone)]
pub struct ExecutionContext {
    pub network: Arc<Network>,
    pub mode: ExecutionMode,
    rpc: Arc<dyn Rpc>,
    signer: PrivateKeySigner,
}

impl ExecutionContext {
    pub fn new(
        network: Arc<Network>,
        mode: ExecutionMode,
        rpc: Arc<dyn Rpc>,
        signer: PrivateKeySigner,
    ) -> Self {
        let signer = signer.with_chain_id(Some(network.chain_id));
        Self { network, mode, rpc, signer }
    }

    /// Account this context signs for
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn rpc(&self) -> &dyn Rpc {
        self.rpc.as_ref()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    pub fn is_simulated(&self) -> bool {
        self.mode == ExecutionMode::Simulated
    }

    /// Read-only contract call, decoded into the call's return type
    pub async fn read<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let tx = TransactionRequest::default()
            .from(self.address())
            .to(to)
            .input(Bytes::from(call.abi_encode()).into());

        let data = self
            .rpc
            .call(tx)
            .await
            .wrap_err_with(|| format!("{} on {:?}", C::SIGNATURE, to))?;

        C::abi_decode_returns(&data).wrap_err_with(|| format!("decoding {}", C::SIGNATURE))
    }

    pub async fn native_balance(&self) -> Result<U256> {
        self.rpc.balance(self.address()).await
    }

    /// ERC-20 balance of this context's account
    pub async fn token_balance(&self, token: Address) -> Result<U256> {
        self.read(token, IWrappedNative::balanceOfCall { account: self.address() })
            .await
    }

    /// Native plus wrapped-native balance
    pub async fn total_native_balance(&self) -> Result<U256> {
        let native = self.native_balance().await?;
        let wrapped = self.token_balance(self.network.wrapped_native).await?;
        Ok(native + wrapped)
    }

    pub async fn gas_price(&self) -> Result<u128> {
        self.rpc.gas_price().await
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("chain_id", &self.network.chain_id)
            .field("mode", &self.mode)
            .field("address", &self.address())
            .finish()
    }
}
