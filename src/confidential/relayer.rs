//! Confidential-compute relayer client.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RelayerError {
    #[error("relayer network error: {0}")]
    Network(String),
    #[error("relayer returned HTTP {status}")]
    Http { status: u16 },
    #[error("relayer response invalid: {0}")]
    Parse(String),
}

#[derive(Debug, Serialize)]
struct UserDecryptRequest<'a> {
    ciphertext: String,
    contract: String,
    user: String,
    signature: &'a str,
    #[serde(rename = "verifyingContract", skip_serializing_if = "Option::is_none")]
    verifying_contract: Option<String>,
}

/// One authorized decrypt call against confidential-compute infrastructure.
/// Each call resolves a single ciphertext handle; failures degrade that
/// field only.
#[async_trait]
pub trait DecryptRelayer: Send + Sync + fmt::Debug {
    async fn user_decrypt(
        &self,
        ciphertext: B256,
        contract: Address,
        account: Address,
        signature: &str,
        verifying_contract: Option<Address>,
    ) -> Result<U256, RelayerError>;
}

/// Relayer backed by the HTTP `/v1/user-decrypt` endpoint.
#[derive(Debug, Clone)]
pub struct RelayerClient {
    client: Client,
    base_url: String,
}

impl RelayerClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }
}

#[async_trait]
impl DecryptRelayer for RelayerClient {
    async fn user_decrypt(
        &self,
        ciphertext: B256,
        contract: Address,
        account: Address,
        signature: &str,
        verifying_contract: Option<Address>,
    ) -> Result<U256, RelayerError> {
        let url = format!("{}/v1/user-decrypt", self.base_url);
        let request = UserDecryptRequest {
            ciphertext: ciphertext.to_string(),
            contract: contract.to_string(),
            user: account.to_string(),
            signature,
            verifying_contract: verifying_contract.map(|a| a.to_string()),
        };

        debug!(%ciphertext, %account, "requesting user decrypt");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayerError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| RelayerError::Parse(e.to_string()))?;

        parse_plaintext_value(body.get("value"))
    }
}

/// The relayer encodes the plaintext as a base-10 or hex string, or a bare
/// JSON number. Values never fit assumptions about width, so parse into U256.
fn parse_plaintext_value(value: Option<&serde_json::Value>) -> Result<U256, RelayerError> {
    match value {
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            let parsed = if let Some(hex_digits) = s.strip_prefix("0x") {
                U256::from_str_radix(hex_digits, 16)
            } else {
                U256::from_str_radix(s, 10)
            };
            parsed.map_err(|e| RelayerError::Parse(format!("invalid value {:?}: {}", s, e)))
        }
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| RelayerError::Parse(format!("non-integer value: {}", n))),
        other => Err(RelayerError::Parse(format!("missing value field: {:?}", other))),
    }
}
