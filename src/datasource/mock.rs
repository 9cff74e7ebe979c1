//! Mock log source for testing without network calls.

use super::{LogSource, LogSourceError};
use crate::domain::{EventKind, RawLog};
use alloy_primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;

/// Mock log source returning predefined per-event-kind result sets.
#[derive(Debug, Clone, Default)]
pub struct MockLogSource {
    logs: HashMap<EventKind, Vec<RawLog>>,
    failures: HashMap<EventKind, LogSourceError>,
}

impl MockLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a log returned for the given event kind.
    pub fn with_log(mut self, kind: EventKind, log: RawLog) -> Self {
        self.logs.entry(kind).or_default().push(log);
        self
    }

    /// Add multiple logs for the given event kind.
    pub fn with_logs(mut self, kind: EventKind, logs: Vec<RawLog>) -> Self {
        self.logs.entry(kind).or_default().extend(logs);
        self
    }

    /// Make fetches for the given event kind fail.
    pub fn with_failure(mut self, kind: EventKind, error: LogSourceError) -> Self {
        self.failures.insert(kind, error);
        self
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn fetch_logs(
        &self,
        _contract: Address,
        kind: EventKind,
        _account: Address,
    ) -> Result<Vec<RawLog>, LogSourceError> {
        if let Some(error) = self.failures.get(&kind) {
            return Err(error.clone());
        }
        Ok(self.logs.get(&kind).cloned().unwrap_or_default())
    }
}
