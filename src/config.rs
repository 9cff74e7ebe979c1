use alloy_primitives::Address;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub etherscan_api_url: String,
    pub etherscan_api_key: Option<String>,
    pub rpc_url: String,
    pub contract_address: Option<Address>,
    pub relayer_url: Option<String>,
    pub chain_id: u64,
    pub decryption_verifier: Option<Address>,
    pub report_signer_key: Option<String>,
    pub oracle_signer_key: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("4009")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let etherscan_api_url = env_map
            .get("ETHERSCAN_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api-sepolia.etherscan.io/api".to_string());

        // Absence surfaces per request as a configuration-category error on
        // the log source, matching the original's query-time check.
        let etherscan_api_key = env_map.get("ETHERSCAN_API_KEY").cloned();

        let rpc_url = env_map
            .get("RPC_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("RPC_URL".to_string()))?;

        let contract_address = parse_optional_address(&env_map, "CONTRACT_ADDRESS")?;
        let decryption_verifier = parse_optional_address(&env_map, "DECRYPTION_VERIFIER_ADDRESS")?;

        let relayer_url = env_map.get("RELAYER_URL").cloned();

        let chain_id = env_map
            .get("CHAIN_ID")
            .map(|s| s.as_str())
            .unwrap_or("11155111")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("CHAIN_ID".to_string(), "must be a valid u64".to_string())
            })?;

        let report_signer_key = env_map.get("REPORT_USER_PRIVATE_KEY").cloned();

        // No built-in default key: an unset oracle disables attestations.
        let oracle_signer_key = env_map.get("ORACLE_PRIVATE_KEY").cloned();

        let request_timeout_ms = env_map
            .get("REQUEST_TIMEOUT_MS")
            .map(|s| s.as_str())
            .unwrap_or("30000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "REQUEST_TIMEOUT_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            port,
            etherscan_api_url,
            etherscan_api_key,
            rpc_url,
            contract_address,
            relayer_url,
            chain_id,
            decryption_verifier,
            report_signer_key,
            oracle_signer_key,
            request_timeout_ms,
        })
    }
}

fn parse_optional_address(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Option<Address>, ConfigError> {
    match env_map.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .to_lowercase()
            .parse::<Address>()
            .map(Some)
            .map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "must be a hex address".to_string())
            }),
    }
}
