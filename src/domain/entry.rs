//! Typed ledger entries and per-signature log decoding.

use alloy_primitives::{B256, U256};
use tracing::warn;

use super::log::RawLog;
use super::signature::EventKind;

/// Ordering and audit fields shared by every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub block_number: u64,
    pub transaction_index: u64,
    pub transaction_hash: B256,
}

impl EntryMeta {
    fn from_log(log: &RawLog) -> Self {
        Self {
            block_number: log.block_number,
            transaction_index: log.transaction_index,
            transaction_hash: log.transaction_hash,
        }
    }
}

/// One decoded on-chain event affecting a user's game state. Created once by
/// the decoder, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntry {
    Checkin {
        meta: EntryMeta,
    },
    BuySpins {
        meta: EntryMeta,
        count: u64,
    },
    Spin {
        meta: EntryMeta,
        slot: u64,
        gm_delta: u64,
        prize_wei: U256,
    },
    BuyGmPublic {
        meta: EntryMeta,
        amount: u64,
    },
    BuyGmConfidential {
        meta: EntryMeta,
    },
}

impl LedgerEntry {
    pub fn meta(&self) -> &EntryMeta {
        match self {
            LedgerEntry::Checkin { meta }
            | LedgerEntry::BuySpins { meta, .. }
            | LedgerEntry::Spin { meta, .. }
            | LedgerEntry::BuyGmPublic { meta, .. }
            | LedgerEntry::BuyGmConfidential { meta } => meta,
        }
    }

    /// Wire-stable entry tag, used in diagnostic payloads.
    pub fn kind_str(&self) -> &'static str {
        match self {
            LedgerEntry::Checkin { .. } => "checkin",
            LedgerEntry::BuySpins { .. } => "buy_spins",
            LedgerEntry::Spin { .. } => "spin",
            LedgerEntry::BuyGmPublic { .. } => "buy_gm_public",
            LedgerEntry::BuyGmConfidential { .. } => "buy_gm_confidential",
        }
    }
}

/// Decode one raw log for the given event kind.
///
/// Returns `None` when the data section is shorter than the signature's
/// minimum: logs from unrelated or future contract versions must not abort
/// the pipeline.
pub fn decode_entry(kind: EventKind, log: &RawLog) -> Option<LedgerEntry> {
    if log.data.len() < 32 * kind.min_data_words() {
        warn!(
            kind = %kind,
            data_len = log.data.len(),
            tx = %log.transaction_hash,
            "log data shorter than required, skipping"
        );
        return None;
    }

    let meta = EntryMeta::from_log(log);
    let entry = match kind {
        EventKind::Checkin => LedgerEntry::Checkin { meta },
        EventKind::BuySpins => LedgerEntry::BuySpins {
            meta,
            count: narrow_u64(data_word(log, 0), "count"),
        },
        EventKind::SpinOutcome => LedgerEntry::Spin {
            meta,
            slot: narrow_u64(data_word(log, 0), "slot"),
            prize_wei: data_word(log, 1),
            gm_delta: narrow_u64(data_word(log, 2), "gm_delta"),
        },
        EventKind::BuyGmPublic => LedgerEntry::BuyGmPublic {
            meta,
            amount: narrow_u64(data_word(log, 0), "amount"),
        },
        EventKind::BuyGmConfidential => LedgerEntry::BuyGmConfidential { meta },
    };
    Some(entry)
}

/// Read the i-th 32-byte data word as a big-endian unsigned integer.
/// Callers must have checked the minimum length first.
fn data_word(log: &RawLog, index: usize) -> U256 {
    let start = 32 * index;
    U256::from_be_slice(&log.data[start..start + 32])
}

/// Narrow a word to u64, saturating and flagging instead of wrapping.
/// Production amounts can exceed safe narrow ranges and must never alias.
fn narrow_u64(value: U256, field: &'static str) -> u64 {
    if value > U256::from(u64::MAX) {
        warn!(field, %value, "value exceeds u64 range, saturating");
        return u64::MAX;
    }
    value.to::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, Bytes};

    fn word_bytes(value: U256) -> [u8; 32] {
        value.to_be_bytes::<32>()
    }

    fn raw_log(kind: EventKind, data: Vec<u8>) -> RawLog {
        RawLog {
            address: address!("2222222222222222222222222222222222222222"),
            topics: vec![kind.topic0()],
            data: Bytes::from(data),
            block_number: 100,
            transaction_index: 3,
            transaction_hash: B256::repeat_byte(0xab),
        }
    }

    #[test]
    fn test_decode_buy_spins() {
        let mut data = Vec::new();
        data.extend_from_slice(&word_bytes(U256::from(5u64)));
        let entry = decode_entry(EventKind::BuySpins, &raw_log(EventKind::BuySpins, data)).unwrap();
        match entry {
            LedgerEntry::BuySpins { meta, count } => {
                assert_eq!(count, 5);
                assert_eq!(meta.block_number, 100);
                assert_eq!(meta.transaction_index, 3);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_decode_spin_outcome_fields() {
        let prize = U256::from(10_000_000_000_000_000u64); // 0.01 ETH
        let mut data = Vec::new();
        data.extend_from_slice(&word_bytes(U256::from(1u64)));
        data.extend_from_slice(&word_bytes(prize));
        data.extend_from_slice(&word_bytes(U256::from(25u64)));
        let entry =
            decode_entry(EventKind::SpinOutcome, &raw_log(EventKind::SpinOutcome, data)).unwrap();
        match entry {
            LedgerEntry::Spin {
                slot,
                gm_delta,
                prize_wei,
                ..
            } => {
                assert_eq!(slot, 1);
                assert_eq!(gm_delta, 25);
                assert_eq!(prize_wei, prize);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_short_data_is_skipped_not_fatal() {
        // Two words where SpinOutcome requires three.
        let mut data = Vec::new();
        data.extend_from_slice(&word_bytes(U256::from(1u64)));
        data.extend_from_slice(&word_bytes(U256::from(2u64)));
        assert!(decode_entry(EventKind::SpinOutcome, &raw_log(EventKind::SpinOutcome, data)).is_none());
    }

    #[test]
    fn test_checkin_decodes_with_empty_data() {
        let entry = decode_entry(EventKind::Checkin, &raw_log(EventKind::Checkin, vec![])).unwrap();
        assert!(matches!(entry, LedgerEntry::Checkin { .. }));
    }

    #[test]
    fn test_oversized_count_saturates() {
        let mut data = Vec::new();
        data.extend_from_slice(&word_bytes(U256::MAX));
        let entry = decode_entry(EventKind::BuySpins, &raw_log(EventKind::BuySpins, data)).unwrap();
        match entry {
            LedgerEntry::BuySpins { count, .. } => assert_eq!(count, u64::MAX),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_extra_trailing_data_is_ignored() {
        let mut data = Vec::new();
        data.extend_from_slice(&word_bytes(U256::from(7u64)));
        data.extend_from_slice(&word_bytes(U256::from(99u64)));
        let entry = decode_entry(EventKind::BuyGmPublic, &raw_log(EventKind::BuyGmPublic, data)).unwrap();
        match entry {
            LedgerEntry::BuyGmPublic { amount, .. } => assert_eq!(amount, 7),
            other => panic!("unexpected entry: {other:?}"),
        }
    }
}
