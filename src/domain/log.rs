//! Raw log shape as returned by the explorer's log-query API.

use alloy_primitives::{Address, Bytes, B256};

/// One undecoded contract log. Produced by a [`crate::datasource::LogSource`],
/// consumed by the event decoder, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed fields, 32-byte aligned.
    pub data: Bytes,
    pub block_number: u64,
    pub transaction_index: u64,
    pub transaction_hash: B256,
}
