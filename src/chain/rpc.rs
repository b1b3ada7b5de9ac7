//! HTTP JSON-RPC transport backed by an alloy `RootProvider`.
//!
//! Every request is bounded by the configured socket timeout; a receipt wait
//! has its own, longer bound.

use alloy_eips::BlockNumberOrTag;
use alloy_network::Ethereum;
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::{ReceiptSummary, Rpc};

pub struct AlloyRpc {
    provider: RootProvider<Ethereum>,
    url: String,
    timeout: Duration,
    receipt_timeout: Duration,
}

impl AlloyRpc {
    pub fn connect(url: &str, timeout: Duration, receipt_timeout: Duration) -> Result<Self> {
        let parsed = url
            .parse()
            .wrap_err_with(|| format!("invalid RPC URL {}", url))?;
        let provider = RootProvider::<Ethereum>::new_http(parsed);

        Ok(Self {
            provider,
            url: url.to_string(),
            timeout,
            receipt_timeout,
        })
    }

    async fn bounded<T, E, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.wrap_err_with(|| format!("{} failed ({})", what, self.url)),
            Err(_) => Err(eyre!("{} timed out after {:?} ({})", what, self.timeout, self.url)),
        }
    }
}

#[async_trait]
impl Rpc for AlloyRpc {
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        self.bounded("eth_call", async { self.provider.call(tx).await })
            .await
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        self.bounded("eth_estimateGas", async { self.provider.estimate_gas(tx).await })
            .await
    }

    async fn gas_price(&self) -> Result<u128> {
        self.bounded("eth_gasPrice", async { self.provider.get_gas_price().await })
            .await
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.bounded("eth_getBalance", async { self.provider.get_balance(address).await })
            .await
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64> {
        self.bounded("eth_getTransactionCount", async {
            self.provider.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn latest_timestamp(&self) -> Result<u64> {
        let block = self
            .bounded("eth_getBlockByNumber", async {
                self.provider.get_block_by_number(BlockNumberOrTag::Latest).await
            })
            .await?
            .ok_or_else(|| eyre!("latest block not available ({})", self.url))?;

        Ok(block.header.timestamp)
    }

    async fn send_raw_and_wait(&self, raw: Bytes) -> Result<ReceiptSummary> {
        let pending = self
            .bounded("eth_sendRawTransaction", async {
                self.provider.send_raw_transaction(&raw).await
            })
            .await?;

        let tx_hash = *pending.tx_hash();
        debug!("📤 Broadcast {:?}, waiting for receipt", tx_hash);

        let receipt = pending
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await
            .wrap_err_with(|| format!("waiting for receipt of {:?}", tx_hash))?;

        Ok(ReceiptSummary {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
        })
    }
}
