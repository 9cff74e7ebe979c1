//! Oracle attestation for reward claims.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::parse_account;
use super::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    pub user: Option<String>,
    pub contract_address: Option<String>,
    pub amount_wei: Option<serde_json::Value>,
    pub nonce: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct AttestationResponse {
    pub signature: String,
}

/// POST /claim-attestation
///
/// Signs the claim digest `keccak256(contract ++ user ++ amountWei ++ nonce)`
/// (packed encoding) with the configured oracle key, using the standard
/// signed-message envelope the claim contract verifies against.
pub async fn post_claim_attestation(
    State(state): State<AppState>,
    Json(body): Json<AttestationRequest>,
) -> Result<Json<AttestationResponse>, AppError> {
    let (Some(user), Some(contract), Some(amount_wei), Some(nonce)) = (
        body.user.as_deref(),
        body.contract_address.as_deref(),
        body.amount_wei.as_ref(),
        body.nonce.as_ref(),
    ) else {
        return Err(AppError::BadRequest(
            "Missing required parameters".to_string(),
        ));
    };

    let user = parse_account(user)?;
    let contract = contract
        .to_lowercase()
        .parse::<Address>()
        .map_err(|_| AppError::BadRequest("Invalid contract address".to_string()))?;
    let amount_wei = parse_u256(amount_wei, "amountWei")?;
    let nonce = parse_u256(nonce, "nonce")?;

    let signer = oracle_signer(&state)?;
    let digest = attestation_digest(contract, user, amount_wei, nonce);
    let signature = signer
        .sign_message_sync(digest.as_slice())
        .map_err(|e| AppError::Internal(format!("attestation signing failed: {}", e)))?;

    info!(%user, %amount_wei, %nonce, "oracle attestation created");

    Ok(Json(AttestationResponse {
        signature: format!("0x{}", hex::encode(signature.as_bytes())),
    }))
}

fn oracle_signer(state: &AppState) -> Result<PrivateKeySigner, AppError> {
    let key = state
        .config
        .oracle_signer_key
        .as_deref()
        .ok_or_else(|| AppError::Config("Oracle signer not configured".to_string()))?;
    key.parse::<PrivateKeySigner>()
        .map_err(|_| AppError::Config("Oracle signer key invalid".to_string()))
}

/// Packed claim digest matching the contract's verification:
/// 20-byte contract, 20-byte user, then two 32-byte big-endian words.
fn attestation_digest(contract: Address, user: Address, amount_wei: U256, nonce: U256) -> B256 {
    let mut packed = Vec::with_capacity(20 + 20 + 32 + 32);
    packed.extend_from_slice(contract.as_slice());
    packed.extend_from_slice(user.as_slice());
    packed.extend_from_slice(&amount_wei.to_be_bytes::<32>());
    packed.extend_from_slice(&nonce.to_be_bytes::<32>());
    keccak256(&packed)
}

/// Amounts arrive as base-10 strings, hex strings, or bare JSON numbers.
fn parse_u256(value: &serde_json::Value, field: &'static str) -> Result<U256, AppError> {
    let parsed = match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            if let Some(hex_digits) = s.strip_prefix("0x") {
                U256::from_str_radix(hex_digits, 16).ok()
            } else {
                U256::from_str_radix(s, 10).ok()
            }
        }
        serde_json::Value::Number(n) => n.as_u64().map(U256::from),
        _ => None,
    };
    parsed.ok_or_else(|| AppError::BadRequest(format!("Invalid {}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn contract() -> Address {
        address!("2222222222222222222222222222222222222222")
    }

    fn user() -> Address {
        address!("1111111111111111111111111111111111111111")
    }

    #[test]
    fn test_digest_matches_packed_keccak() {
        let amount = U256::from(1_000u64);
        let nonce = U256::from(7u64);
        let mut packed = Vec::new();
        packed.extend_from_slice(contract().as_slice());
        packed.extend_from_slice(user().as_slice());
        packed.extend_from_slice(&amount.to_be_bytes::<32>());
        packed.extend_from_slice(&nonce.to_be_bytes::<32>());
        assert_eq!(
            attestation_digest(contract(), user(), amount, nonce),
            keccak256(&packed)
        );
        assert_eq!(packed.len(), 104);
    }

    #[test]
    fn test_digest_is_nonce_sensitive() {
        let amount = U256::from(1_000u64);
        let a = attestation_digest(contract(), user(), amount, U256::from(1u64));
        let b = attestation_digest(contract(), user(), amount, U256::from(2u64));
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_u256_accepts_all_wire_encodings() {
        assert_eq!(
            parse_u256(&serde_json::json!("1000"), "amountWei").unwrap(),
            U256::from(1_000u64)
        );
        assert_eq!(
            parse_u256(&serde_json::json!("0xff"), "amountWei").unwrap(),
            U256::from(255u64)
        );
        assert_eq!(
            parse_u256(&serde_json::json!(7), "nonce").unwrap(),
            U256::from(7u64)
        );
        assert!(parse_u256(&serde_json::json!("wei"), "amountWei").is_err());
        assert!(parse_u256(&serde_json::json!(-1), "nonce").is_err());
    }
}
