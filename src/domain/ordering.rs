//! Canonical entry ordering for deterministic aggregation.

use super::entry::LedgerEntry;

/// Stable ordering key for ledger entries.
///
/// `(block_number, transaction_index)` is the externally-assigned total order
/// of the source chain. Per-signature result sets complete in arbitrary order,
/// so the concatenated ledger must be explicitly sorted before folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryOrderingKey {
    pub block_number: u64,
    pub transaction_index: u64,
}

impl EntryOrderingKey {
    pub fn from_entry(entry: &LedgerEntry) -> Self {
        let meta = entry.meta();
        EntryOrderingKey {
            block_number: meta.block_number,
            transaction_index: meta.transaction_index,
        }
    }
}

/// Sort entries into canonical emission order.
pub fn sort_entries_canonical(entries: &mut [LedgerEntry]) {
    entries.sort_by_key(EntryOrderingKey::from_entry);
}
