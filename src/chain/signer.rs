//! Key loading and EIP-1559 signing
//!
//! ⚠️  Keys are never logged; only the derived address is.

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::Bytes;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use eyre::{eyre, Result};
use std::str::FromStr;
use tracing::debug;

/// Parse a hex private key, with or without `0x`
pub fn load_signer(key: &str) -> Result<PrivateKeySigner> {
    PrivateKeySigner::from_str(key.trim_start_matches("0x"))
        .map_err(|e| eyre!("Failed to parse private key: {}", e))
}

/// Sign and return the EIP-2718 encoding accepted by `eth_sendRawTransaction`
pub async fn sign_eip1559(signer: &PrivateKeySigner, tx: TxEip1559) -> Result<Bytes> {
    let sig_hash = tx.signature_hash();
    let signature = signer
        .sign_hash(&sig_hash)
        .await
        .map_err(|e| eyre!("Failed to sign transaction: {}", e))?;

    debug!(
        "Signed EIP-1559 transaction: to={:?}, nonce={}, gas_limit={}, max_fee={}",
        tx.to, tx.nonce, tx.gas_limit, tx.max_fee_per_gas
    );

    let envelope = TxEnvelope::from(tx.into_signed(signature));
    Ok(Bytes::from(envelope.encoded_2718()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, TxKind, U256};

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_load_signer_with_and_without_prefix() {
        let a = load_signer(TEST_KEY).unwrap();
        let b = load_signer(TEST_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(a.address(), b.address());
        assert_eq!(a.address(), address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
    }

    #[test]
    fn test_load_signer_rejects_garbage() {
        assert!(load_signer("0xnothex").is_err());
    }

    #[tokio::test]
    async fn test_signed_bytes_are_typed_envelope() {
        let signer = load_signer(TEST_KEY).unwrap();
        let tx = TxEip1559 {
            chain_id: 43114,
            nonce: 3,
            gas_limit: 21_000,
            max_fee_per_gas: 30_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
            to: TxKind::Call(address!("B31f66AA3C1e785363F0875A1B74E27b85FD66c7")),
            value: U256::from(1u64),
            input: Bytes::new(),
            access_list: Default::default(),
        };

        let raw = sign_eip1559(&signer, tx).await.unwrap();
        // EIP-1559 type byte
        assert_eq!(raw[0], 0x02);
    }
}
