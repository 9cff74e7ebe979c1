//! Builds the canonical per-account activity ledger.

use crate::datasource::{LogSource, LogSourceError};
use crate::domain::{decode_entry, sort_entries_canonical, EventKind, LedgerEntry, RawLog};
use alloy_primitives::Address;
use std::sync::Arc;
use tracing::debug;

/// Fetches every tracked event stream concurrently and merges them into one
/// canonically ordered ledger.
#[derive(Debug, Clone)]
pub struct LedgerBuilder {
    source: Arc<dyn LogSource>,
}

impl LedgerBuilder {
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self { source }
    }

    /// Build the full activity ledger for one account.
    ///
    /// The five per-signature fetches run concurrently and join fail-fast: a
    /// partial ledger silently understates activity and must never be
    /// presented as authoritative. Malformed logs are skipped by the decoder;
    /// everything else is sorted by `(block_number, transaction_index)`.
    pub async fn build(
        &self,
        contract: Address,
        account: Address,
    ) -> Result<Vec<LedgerEntry>, LogSourceError> {
        let (checkins, buy_spins, spins, gm_public, gm_confidential) = tokio::try_join!(
            self.source.fetch_logs(contract, EventKind::Checkin, account),
            self.source.fetch_logs(contract, EventKind::BuySpins, account),
            self.source.fetch_logs(contract, EventKind::SpinOutcome, account),
            self.source.fetch_logs(contract, EventKind::BuyGmPublic, account),
            self.source
                .fetch_logs(contract, EventKind::BuyGmConfidential, account),
        )?;

        let mut entries = Vec::new();
        decode_all(&mut entries, EventKind::Checkin, &checkins);
        decode_all(&mut entries, EventKind::BuySpins, &buy_spins);
        decode_all(&mut entries, EventKind::SpinOutcome, &spins);
        decode_all(&mut entries, EventKind::BuyGmPublic, &gm_public);
        decode_all(&mut entries, EventKind::BuyGmConfidential, &gm_confidential);

        sort_entries_canonical(&mut entries);

        debug!(%account, entries = entries.len(), "ledger built");
        Ok(entries)
    }
}

fn decode_all(entries: &mut Vec<LedgerEntry>, kind: EventKind, logs: &[RawLog]) {
    entries.extend(logs.iter().filter_map(|log| decode_entry(kind, log)));
}
