//! Log source abstraction over the explorer's log-query API.

use crate::domain::{EventKind, RawLog};
use alloy_primitives::Address;
use async_trait::async_trait;
use std::fmt;

pub mod etherscan;
pub mod mock;

pub use etherscan::EtherscanLogSource;
pub use mock::MockLogSource;

/// Source of historical contract logs filtered by event signature and
/// indexed account.
///
/// Implementations must query the full ledger history and handle retry and
/// rate limiting; a well-formed empty result set is a valid outcome, not an
/// error.
#[async_trait]
pub trait LogSource: Send + Sync + fmt::Debug {
    /// Fetch all logs for `contract` matching `(topic0 = kind, topic1 = account)`.
    async fn fetch_logs(
        &self,
        contract: Address,
        kind: EventKind,
        account: Address,
    ) -> Result<Vec<RawLog>, LogSourceError>;
}

/// Error type for log source operations.
#[derive(Debug, Clone)]
pub enum LogSourceError {
    /// Required access credential is absent. Configuration category, no retry.
    MissingApiKey,
    /// Network error (connection failure, timeout).
    Network(String),
    /// Non-success HTTP status.
    Http { status: u16, message: String },
    /// Non-success API envelope.
    Api(String),
    /// Invalid JSON or malformed response body.
    Parse(String),
    /// Rate limit exceeded.
    RateLimited,
}

impl fmt::Display for LogSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSourceError::MissingApiKey => write!(f, "Explorer API key missing"),
            LogSourceError::Network(msg) => write!(f, "Network error: {}", msg),
            LogSourceError::Http { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            LogSourceError::Api(msg) => write!(f, "API error: {}", msg),
            LogSourceError::Parse(msg) => write!(f, "Parse error: {}", msg),
            LogSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for LogSourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_source_error_display() {
        let err = LogSourceError::Network("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = LogSourceError::Http {
            status: 502,
            message: "Bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 502: Bad gateway");

        let err = LogSourceError::Api("NOTOK".to_string());
        assert_eq!(err.to_string(), "API error: NOTOK");

        let err = LogSourceError::MissingApiKey;
        assert_eq!(err.to_string(), "Explorer API key missing");
    }
}
