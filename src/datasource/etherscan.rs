//! Etherscan-style log-query API client.

use super::{LogSource, LogSourceError};
use crate::domain::{account_topic, EventKind, RawLog};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Log source backed by the `module=logs&action=getLogs` explorer endpoint.
///
/// Queries the full historical range; cross-query ordering is not guaranteed
/// by the API and is restored downstream by the ledger builder.
#[derive(Debug, Clone)]
pub struct EtherscanLogSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl EtherscanLogSource {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn get_logs_envelope(
        &self,
        contract: Address,
        topic0: B256,
        topic1: B256,
    ) -> Result<serde_json::Value, LogSourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LogSourceError::MissingApiKey)?;

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("module", "logs"),
                    ("action", "getLogs"),
                    ("fromBlock", "0"),
                    ("toBlock", "latest"),
                    ("address", &contract.to_string()),
                    ("topic0", &topic0.to_string()),
                    ("topic1", &topic1.to_string()),
                    ("topic0_1_opr", "and"),
                    ("apikey", api_key),
                ])
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(LogSourceError::Network(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(LogSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(LogSourceError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(LogSourceError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(LogSourceError::Parse(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl LogSource for EtherscanLogSource {
    async fn fetch_logs(
        &self,
        contract: Address,
        kind: EventKind,
        account: Address,
    ) -> Result<Vec<RawLog>, LogSourceError> {
        debug!(%contract, %account, event = %kind, "fetching logs");

        let envelope = self
            .get_logs_envelope(contract, kind.topic0(), account_topic(account))
            .await?;

        let status = envelope.get("status").and_then(|v| v.as_str()).unwrap_or("");
        let message = envelope.get("message").and_then(|v| v.as_str()).unwrap_or("");

        if status != "1" {
            // The API reports an empty result set as a failure envelope with a
            // documented message. Only that case is a valid empty ledger.
            if message.contains("No records") {
                return Ok(Vec::new());
            }
            let result_hint = envelope
                .get("result")
                .and_then(|v| v.as_str())
                .unwrap_or(message);
            return Err(LogSourceError::Api(result_hint.to_string()));
        }

        let logs_json = envelope
            .get("result")
            .and_then(|v| v.as_array())
            .ok_or_else(|| LogSourceError::Parse("Expected array result".to_string()))?;

        let mut logs = Vec::with_capacity(logs_json.len());
        for log_json in logs_json {
            match parse_raw_log(log_json) {
                Ok(log) => logs.push(log),
                Err(e) => {
                    warn!(event = %kind, "failed to parse log: {}", e);
                }
            }
        }

        Ok(logs)
    }
}

fn parse_raw_log(log_json: &serde_json::Value) -> Result<RawLog, LogSourceError> {
    let address = log_json
        .get("address")
        .and_then(|v| v.as_str())
        .ok_or_else(|| LogSourceError::Parse("Missing address field".to_string()))?
        .parse::<Address>()
        .map_err(|e| LogSourceError::Parse(format!("Invalid address: {}", e)))?;

    let topics_json = log_json
        .get("topics")
        .and_then(|v| v.as_array())
        .ok_or_else(|| LogSourceError::Parse("Missing topics field".to_string()))?;
    let mut topics = Vec::with_capacity(topics_json.len());
    for topic in topics_json {
        let topic = topic
            .as_str()
            .ok_or_else(|| LogSourceError::Parse("Non-string topic".to_string()))?
            .parse::<B256>()
            .map_err(|e| LogSourceError::Parse(format!("Invalid topic: {}", e)))?;
        topics.push(topic);
    }

    let data = log_json
        .get("data")
        .and_then(|v| v.as_str())
        .unwrap_or("0x")
        .parse::<Bytes>()
        .map_err(|e| LogSourceError::Parse(format!("Invalid data: {}", e)))?;

    let block_number = parse_hex_quantity(log_json, "blockNumber")?;
    let transaction_index = parse_hex_quantity(log_json, "transactionIndex")?;

    let transaction_hash = log_json
        .get("transactionHash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| LogSourceError::Parse("Missing transactionHash field".to_string()))?
        .parse::<B256>()
        .map_err(|e| LogSourceError::Parse(format!("Invalid transactionHash: {}", e)))?;

    Ok(RawLog {
        address,
        topics,
        data,
        block_number,
        transaction_index,
        transaction_hash,
    })
}

/// Parse a hex quantity field ("0x1a4"). The API encodes zero as "0x".
fn parse_hex_quantity(log_json: &serde_json::Value, field: &str) -> Result<u64, LogSourceError> {
    let raw = log_json
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| LogSourceError::Parse(format!("Missing {} field", field)))?;
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| LogSourceError::Parse(format!("Invalid {}: {}", field, e)))
}
