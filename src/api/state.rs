use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::AppState;
use crate::confidential::{Authorization, DecryptedBundle, FieldSignatures};
use crate::domain::LedgerEntry;
use crate::error::AppError;
use crate::ledger::{aggregate, DerivedAggregates};
use crate::reconcile::{reconcile, ReconciledState, StateSource};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateQuery {
    pub contract: Option<String>,
    pub use_confidential: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBody {
    pub contract: Option<String>,
    #[serde(default)]
    pub signatures: FieldSignatures,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub params: ParamsDto,
    pub ledger: Vec<LedgerEntryDto>,
    pub aggregates_from_ledger: AggregatesDto,
    pub confidential: ConfidentialDto,
    pub merged: MergedDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamsDto {
    pub user: String,
    pub contract: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDto {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub block_number: u64,
    pub tx_index: u64,
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gm_delta: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_wei: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatesDto {
    pub available_spins: u64,
    pub estimated_gm: u64,
    pub pending_reward_wei: String,
    pub last_slot: Option<u64>,
    pub spins_bought: u64,
    pub spins_done: u64,
    pub checkins: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidentialDto {
    pub spins: Option<u64>,
    pub gm: Option<u64>,
    pub pending_wei: Option<String>,
    pub last_slot: Option<u64>,
    pub score: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedDto {
    pub spins: u64,
    pub gm: u64,
    pub pending_reward_wei: String,
    pub last_slot: Option<u64>,
    pub score: Option<u64>,
    pub source: StateSource,
    pub timestamp_ms: i64,
}

/// GET /user/:address/state?contract=&useConfidential=
///
/// Builds the ledger-derived state and, when requested and a report signer
/// is configured, decrypts the confidential bundle with the server-held key.
pub async fn get_user_state(
    Path(address): Path<String>,
    Query(params): Query<StateQuery>,
    State(state): State<AppState>,
) -> Result<Json<StateResponse>, AppError> {
    let account = parse_account(&address)?;
    let contract = resolve_contract(params.contract.as_deref(), &state)?;

    let use_confidential = matches!(
        params.use_confidential.as_deref(),
        Some("1") | Some("true")
    );

    let (authorization, note) = if !use_confidential {
        (None, Some("decryption not requested".to_string()))
    } else {
        match &state.config.report_signer_key {
            None => (None, Some("report signer not configured".to_string())),
            Some(key) => match key.parse::<PrivateKeySigner>() {
                Ok(signer) => (Some(Authorization::Signer(Box::new(signer))), None),
                Err(e) => {
                    warn!("report signer key invalid: {}", e);
                    (None, Some("report signer key invalid".to_string()))
                }
            },
        }
    };

    build_state(&state, contract, account, authorization, note).await
}

/// POST /user/:address/state
///
/// Accepts per-field pre-computed authorization signatures from a
/// caller-held wallet; the server forwards them to the relayer and never
/// signs.
pub async fn post_user_state(
    Path(address): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<StateBody>,
) -> Result<Json<StateResponse>, AppError> {
    let account = parse_account(&address)?;
    let contract = resolve_contract(body.contract.as_deref(), &state)?;
    let authorization = Some(Authorization::Presigned(body.signatures));

    build_state(&state, contract, account, authorization, None).await
}

/// Shared pipeline: ledger (authoritative, failures propagate), confidential
/// (opportunistic, failures degrade), reconcile.
async fn build_state(
    state: &AppState,
    contract: Address,
    account: Address,
    authorization: Option<Authorization>,
    note: Option<String>,
) -> Result<Json<StateResponse>, AppError> {
    let ledger = state.ledger.build(contract, account).await?;
    let aggregates = aggregate(&ledger);

    let (bundle, note) = match authorization {
        // Decryption is opt-in; without authorization the bundle is not read.
        None => (DecryptedBundle::unavailable(), note),
        Some(authorization) => match state
            .decryptor
            .resolve_bundle(contract, account, Some(authorization))
            .await
        {
            Ok(bundle) => (bundle, note),
            Err(e) => {
                warn!(%account, "confidential path degraded: {}", e);
                (DecryptedBundle::unavailable(), Some(e.to_string()))
            }
        },
    };

    let merged = reconcile(&aggregates, &bundle);

    Ok(Json(StateResponse {
        params: ParamsDto {
            user: account.to_string(),
            contract: contract.to_string(),
        },
        ledger: ledger.iter().map(entry_dto).collect(),
        aggregates_from_ledger: aggregates_dto(&aggregates),
        confidential: confidential_dto(&bundle, note),
        merged: merged_dto(&merged),
    }))
}

fn entry_dto(entry: &LedgerEntry) -> LedgerEntryDto {
    let meta = entry.meta();
    let mut dto = LedgerEntryDto {
        kind: entry.kind_str(),
        block_number: meta.block_number,
        tx_index: meta.transaction_index,
        tx_hash: meta.transaction_hash.to_string(),
        count: None,
        slot: None,
        gm_delta: None,
        prize_wei: None,
        amount: None,
    };
    match entry {
        LedgerEntry::Checkin { .. } | LedgerEntry::BuyGmConfidential { .. } => {}
        LedgerEntry::BuySpins { count, .. } => dto.count = Some(*count),
        LedgerEntry::Spin {
            slot,
            gm_delta,
            prize_wei,
            ..
        } => {
            dto.slot = Some(*slot);
            dto.gm_delta = Some(*gm_delta);
            dto.prize_wei = Some(prize_wei.to_string());
        }
        LedgerEntry::BuyGmPublic { amount, .. } => dto.amount = Some(*amount),
    }
    dto
}

fn aggregates_dto(aggregates: &DerivedAggregates) -> AggregatesDto {
    AggregatesDto {
        available_spins: aggregates.available_spins,
        estimated_gm: aggregates.estimated_gm,
        pending_reward_wei: aggregates.pending_reward_wei.to_string(),
        last_slot: aggregates.last_slot,
        spins_bought: aggregates.spins_bought,
        spins_done: aggregates.spins_done,
        checkins: aggregates.checkins,
    }
}

fn confidential_dto(bundle: &DecryptedBundle, note: Option<String>) -> ConfidentialDto {
    ConfidentialDto {
        spins: bundle.spins,
        gm: bundle.gm,
        pending_wei: bundle.pending_wei.map(|v| v.to_string()),
        last_slot: bundle.last_slot,
        score: bundle.score,
        note,
    }
}

fn merged_dto(state: &ReconciledState) -> MergedDto {
    MergedDto {
        spins: state.spins,
        gm: state.gm,
        pending_reward_wei: state.pending_reward_wei.to_string(),
        last_slot: state.last_slot,
        score: state.score,
        source: state.source,
        timestamp_ms: state.timestamp_ms,
    }
}

pub(crate) fn parse_account(input: &str) -> Result<Address, AppError> {
    let hex_part = input
        .strip_prefix("0x")
        .ok_or_else(|| AppError::BadRequest("Invalid user address".to_string()))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::BadRequest("Invalid user address".to_string()));
    }
    input
        .to_lowercase()
        .parse::<Address>()
        .map_err(|_| AppError::BadRequest("Invalid user address".to_string()))
}

fn resolve_contract(requested: Option<&str>, state: &AppState) -> Result<Address, AppError> {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .to_lowercase()
            .parse::<Address>()
            .map_err(|_| AppError::BadRequest("Invalid contract address".to_string())),
        None => state
            .config
            .contract_address
            .ok_or_else(|| AppError::BadRequest("Contract address missing".to_string())),
    }
}
