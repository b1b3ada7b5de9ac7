//! In-memory `Rpc` for unit tests.
//!
//! Contract reads are keyed on `(address, selector)`. Each key holds a queue of
//! responses; the last one repeats once the queue is down to one entry.

use alloy_consensus::{TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::signer::load_signer;
use super::{ExecutionContext, Network, ReceiptSummary, Rpc};
use crate::config::ExecutionMode;
use crate::deployments::{AVALANCHE_CHAIN_ID, WAVAX};

pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Default)]
struct MockState {
    calls: HashMap<(Address, [u8; 4]), VecDeque<Bytes>>,
    call_log: Vec<((Address, [u8; 4]), Bytes)>,
    gas_estimate: u64,
    gas_price: u128,
    nonce: u64,
    timestamp: u64,
    balances: VecDeque<U256>,
    receipts: VecDeque<bool>,
    sent: Vec<Bytes>,
    estimates: usize,
}

pub struct MockRpc {
    state: Mutex<MockState>,
}

fn next_sticky<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn route(tx: &TransactionRequest) -> Result<((Address, [u8; 4]), Bytes)> {
    let to = match tx.to {
        Some(TxKind::Call(to)) => to,
        _ => return Err(eyre!("mock call without a target")),
    };
    let input = tx.input.input().cloned().unwrap_or_default();
    if input.len() < 4 {
        return Err(eyre!("mock call without a selector"));
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&input[..4]);
    Ok(((to, selector), input))
}

impl MockRpc {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                gas_estimate: 100_000,
                gas_price: 25_000_000_000,
                timestamp: 1_700_000_000,
                ..Default::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Queue a response for a contract read
    pub fn on_call(&self, to: Address, selector: [u8; 4], data: Bytes) {
        self.with(|s| s.calls.entry((to, selector)).or_default().push_back(data));
    }

    pub fn set_gas_estimate(&self, gas: u64) {
        self.with(|s| s.gas_estimate = gas);
    }

    pub fn set_gas_price(&self, price: u128) {
        self.with(|s| s.gas_price = price);
    }

    pub fn set_nonce(&self, nonce: u64) {
        self.with(|s| s.nonce = nonce);
    }

    /// Successive native balances returned by `balance`
    pub fn set_balances(&self, balances: Vec<U256>) {
        self.with(|s| s.balances = balances.into());
    }

    /// Queue the status of the next mined transaction (default: success)
    pub fn push_receipt(&self, success: bool) {
        self.with(|s| s.receipts.push_back(success));
    }

    /// Raw transactions broadcast so far
    pub fn sent(&self) -> Vec<Bytes> {
        self.with(|s| s.sent.clone())
    }

    pub fn estimate_count(&self) -> usize {
        self.with(|s| s.estimates)
    }

    pub fn call_count(&self, to: Address, selector: [u8; 4]) -> usize {
        self.call_inputs(to, selector).len()
    }

    /// Calldata of every read sent to `(to, selector)`, oldest first
    pub fn call_inputs(&self, to: Address, selector: [u8; 4]) -> Vec<Bytes> {
        self.with(|s| {
            s.call_log
                .iter()
                .filter(|(key, _)| *key == (to, selector))
                .map(|(_, input)| input.clone())
                .collect()
        })
    }

    /// Broadcast transactions decoded back into their unsigned fields
    pub fn sent_txs(&self) -> Vec<TxEip1559> {
        self.sent()
            .iter()
            .map(|raw| {
                let mut buf: &[u8] = &raw[..];
                let envelope = TxEnvelope::decode_2718(&mut buf).unwrap();
                envelope.as_eip1559().unwrap().tx().clone()
            })
            .collect()
    }
}

#[async_trait]
impl Rpc for MockRpc {
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        let (key, input) = route(&tx)?;
        self.with(|s| {
            s.call_log.push((key, input));
            s.calls
                .get_mut(&key)
                .and_then(|queue| next_sticky(queue))
                .ok_or_else(|| eyre!("no mock response for {:?} 0x{}", key.0, hex::encode(key.1)))
        })
    }

    async fn estimate_gas(&self, _tx: TransactionRequest) -> Result<u64> {
        Ok(self.with(|s| {
            s.estimates += 1;
            s.gas_estimate
        }))
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(self.with(|s| s.gas_price))
    }

    async fn balance(&self, _address: Address) -> Result<U256> {
        Ok(self.with(|s| next_sticky(&mut s.balances).unwrap_or_default()))
    }

    async fn pending_nonce(&self, _address: Address) -> Result<u64> {
        Ok(self.with(|s| s.nonce))
    }

    async fn latest_timestamp(&self) -> Result<u64> {
        Ok(self.with(|s| s.timestamp))
    }

    async fn send_raw_and_wait(&self, raw: Bytes) -> Result<ReceiptSummary> {
        Ok(self.with(|s| {
            s.sent.push(raw);
            s.nonce += 1;
            let success = s.receipts.pop_front().unwrap_or(true);
            ReceiptSummary {
                tx_hash: B256::with_last_byte(s.sent.len() as u8),
                success,
                gas_used: 21_000,
                block_number: Some(1),
            }
        }))
    }
}

/// ABI words for static return values
pub fn words(values: &[U256]) -> Bytes {
    let mut out = Vec::with_capacity(values.len() * 32);
    for value in values {
        out.extend_from_slice(&value.to_be_bytes::<32>());
    }
    Bytes::from(out)
}

pub fn addr_word(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

pub fn test_network() -> Network {
    Network {
        chain_id: AVALANCHE_CHAIN_ID,
        native_symbol: "AVAX".to_string(),
        native_price_id: "avalanche-2".to_string(),
        rpc_url: "http://127.0.0.1:9650".to_string(),
        wrapped_native: WAVAX,
    }
}

pub fn test_context(rpc: Arc<MockRpc>, mode: ExecutionMode) -> ExecutionContext {
    let signer = load_signer(TEST_KEY).unwrap();
    ExecutionContext::new(Arc::new(test_network()), mode, rpc, signer)
}
