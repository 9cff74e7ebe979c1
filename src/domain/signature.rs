//! Tracked event signatures and topic encoding.

use alloy_primitives::{keccak256, Address, B256};

/// The event kinds the ledger is built from, one per contract event that
/// affects user state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `CheckInCompleted(address,uint256)` — daily check-in, grants one spin.
    Checkin,
    /// `SpinBoughtWithGm(address,uint64)` — batch spin purchase.
    BuySpins,
    /// `SpinOutcome(address,uint8,uint256,uint64)` — slot, prize wei, GM delta.
    SpinOutcome,
    /// `GmTokensBought(address,uint256)` — public GM purchase.
    BuyGmPublic,
    /// `GmTokensBoughtFHE(address)` — confidential GM purchase, amount hidden.
    BuyGmConfidential,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Checkin,
        EventKind::BuySpins,
        EventKind::SpinOutcome,
        EventKind::BuyGmPublic,
        EventKind::BuyGmConfidential,
    ];

    /// Canonical Solidity signature string.
    pub fn signature(&self) -> &'static str {
        match self {
            EventKind::Checkin => "CheckInCompleted(address,uint256)",
            EventKind::BuySpins => "SpinBoughtWithGm(address,uint64)",
            EventKind::SpinOutcome => "SpinOutcome(address,uint8,uint256,uint64)",
            EventKind::BuyGmPublic => "GmTokensBought(address,uint256)",
            EventKind::BuyGmConfidential => "GmTokensBoughtFHE(address)",
        }
    }

    /// Event signature hash, used as `topic0` in log queries.
    pub fn topic0(&self) -> B256 {
        keccak256(self.signature().as_bytes())
    }

    /// Minimum number of 32-byte data words a well-formed log must carry.
    /// Shorter data marks the log malformed and it is skipped.
    pub fn min_data_words(&self) -> usize {
        match self {
            // The check-in timestamp word is not read, so no minimum applies.
            EventKind::Checkin => 0,
            EventKind::BuySpins => 1,
            EventKind::SpinOutcome => 3,
            EventKind::BuyGmPublic => 1,
            EventKind::BuyGmConfidential => 0,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.signature())
    }
}

/// Left-pad an account address into the 32-byte indexed-topic form.
pub fn account_topic(account: Address) -> B256 {
    let mut buf = [0u8; 32];
    buf[12..].copy_from_slice(account.as_slice());
    B256::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_topic0_matches_keccak_of_signature() {
        let expected = keccak256(b"SpinOutcome(address,uint8,uint256,uint64)");
        assert_eq!(EventKind::SpinOutcome.topic0(), expected);
    }

    #[test]
    fn test_all_kinds_have_distinct_topics() {
        let topics: Vec<B256> = EventKind::ALL.iter().map(|k| k.topic0()).collect();
        for (i, a) in topics.iter().enumerate() {
            for b in &topics[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_account_topic_is_left_padded() {
        let account = address!("1111111111111111111111111111111111111111");
        let topic = account_topic(account);
        assert_eq!(&topic[..12], &[0u8; 12]);
        assert_eq!(&topic[12..], account.as_slice());
    }
}
