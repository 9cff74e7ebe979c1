//! Encrypted bundle read from the contract.

use alloy_primitives::{keccak256, Address, B256};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The five per-user ciphertext handles held by the contract. Fetched per
/// request and never cached: any new transaction may replace them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidentialBundle {
    pub spins: B256,
    pub gm: B256,
    pub pending_wei: B256,
    pub last_slot: B256,
    pub score: B256,
}

impl ConfidentialBundle {
    /// Field-tagged handles, in declaration order.
    pub fn handles(&self) -> [(BundleField, B256); 5] {
        [
            (BundleField::Spins, self.spins),
            (BundleField::Gm, self.gm),
            (BundleField::PendingWei, self.pending_wei),
            (BundleField::LastSlot, self.last_slot),
            (BundleField::Score, self.score),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleField {
    Spins,
    Gm,
    PendingWei,
    LastSlot,
    Score,
}

impl BundleField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleField::Spins => "spins",
            BundleField::Gm => "gm",
            BundleField::PendingWei => "pendingWei",
            BundleField::LastSlot => "lastSlot",
            BundleField::Score => "score",
        }
    }
}

#[derive(Debug, Error)]
pub enum BundleError {
    /// The whole-bundle read failed. Fatal for the confidential path only;
    /// the ledger path stays authoritative.
    #[error("confidential bundle read failed: {0}")]
    Unavailable(String),
    /// The supplied signer does not own the account. No partial decryption
    /// is attempted with an unauthorized signer.
    #[error("signer {signer} does not match account {account}")]
    SignerMismatch { signer: Address, account: Address },
}

/// Read-only access to the contract's encrypted user bundle.
#[async_trait]
pub trait BundleReader: Send + Sync + fmt::Debug {
    async fn read_bundle(
        &self,
        contract: Address,
        account: Address,
    ) -> Result<ConfidentialBundle, BundleError>;
}

/// Bundle reader issuing `eth_call getEncryptedUserBundle(address)` against a
/// JSON-RPC node.
#[derive(Debug, Clone)]
pub struct RpcBundleReader {
    client: Client,
    rpc_url: String,
}

impl RpcBundleReader {
    pub fn new(rpc_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, rpc_url }
    }

    fn call_data(account: Address) -> String {
        let selector = &keccak256(b"getEncryptedUserBundle(address)")[..4];
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(selector);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(account.as_slice());
        format!("0x{}", hex::encode(data))
    }
}

#[async_trait]
impl BundleReader for RpcBundleReader {
    async fn read_bundle(
        &self,
        contract: Address,
        account: Address,
    ) -> Result<ConfidentialBundle, BundleError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": contract.to_string(), "data": Self::call_data(account) },
                "latest"
            ]
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| BundleError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BundleError::Unavailable(format!(
                "RPC returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| BundleError::Unavailable(e.to_string()))?;

        if let Some(error) = body.get("error") {
            return Err(BundleError::Unavailable(error.to_string()));
        }

        let result = body
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BundleError::Unavailable("missing result".to_string()))?;

        decode_bundle_words(result)
    }
}

/// Decode the ABI-encoded five-word return value.
fn decode_bundle_words(result: &str) -> Result<ConfidentialBundle, BundleError> {
    let digits = result.strip_prefix("0x").unwrap_or(result);
    let bytes = hex::decode(digits)
        .map_err(|e| BundleError::Unavailable(format!("invalid return data: {}", e)))?;
    if bytes.len() < 32 * 5 {
        return Err(BundleError::Unavailable(format!(
            "return data too short: {} bytes",
            bytes.len()
        )));
    }

    let word = |i: usize| B256::from_slice(&bytes[32 * i..32 * (i + 1)]);
    Ok(ConfidentialBundle {
        spins: word(0),
        gm: word(1),
        pending_wei: word(2),
        last_slot: word(3),
        score: word(4),
    })
}
