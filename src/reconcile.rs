//! Per-field merge of ledger aggregates with decrypted confidential state.

use alloy_primitives::U256;
use chrono::Utc;
use serde::Serialize;

use crate::confidential::DecryptedBundle;
use crate::ledger::DerivedAggregates;

/// Which source won the precedence check for the spins field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateSource {
    Confidential,
    Ledger,
}

/// The merged, final user state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledState {
    pub spins: u64,
    pub gm: u64,
    pub pending_reward_wei: U256,
    pub last_slot: Option<u64>,
    pub score: Option<u64>,
    pub source: StateSource,
    pub timestamp_ms: i64,
}

/// Merge the two sources under the fixed precedence rule.
///
/// A confidential value wins only when available and strictly positive: a
/// confidential zero is indistinguishable from "not yet synchronized" in the
/// source system, so the ledger figure is preferred in that ambiguous case.
/// `last_slot` is the exception: any available confidential value wins,
/// including slot 0. `score` has no ledger analogue and passes through.
pub fn reconcile(aggregates: &DerivedAggregates, bundle: &DecryptedBundle) -> ReconciledState {
    let spins_from_confidential = matches!(bundle.spins, Some(v) if v > 0);

    ReconciledState {
        spins: match bundle.spins {
            Some(v) if v > 0 => v,
            _ => aggregates.available_spins,
        },
        gm: match bundle.gm {
            Some(v) if v > 0 => v,
            _ => aggregates.estimated_gm,
        },
        pending_reward_wei: match bundle.pending_wei {
            Some(v) if v > U256::ZERO => v,
            _ => aggregates.pending_reward_wei,
        },
        last_slot: bundle.last_slot.or(aggregates.last_slot),
        score: bundle.score,
        source: if spins_from_confidential {
            StateSource::Confidential
        } else {
            StateSource::Ledger
        },
        timestamp_ms: Utc::now().timestamp_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregates() -> DerivedAggregates {
        DerivedAggregates {
            available_spins: 7,
            estimated_gm: 400,
            pending_reward_wei: U256::from(100u64),
            last_slot: Some(3),
            spins_bought: 8,
            spins_done: 2,
            checkins: 1,
        }
    }

    #[test]
    fn test_confidential_zero_loses_to_ledger() {
        let bundle = DecryptedBundle {
            spins: Some(0),
            ..Default::default()
        };
        let state = reconcile(&aggregates(), &bundle);
        assert_eq!(state.spins, 7);
        assert_eq!(state.source, StateSource::Ledger);
    }

    #[test]
    fn test_confidential_positive_wins() {
        let bundle = DecryptedBundle {
            spins: Some(12),
            ..Default::default()
        };
        let state = reconcile(&aggregates(), &bundle);
        assert_eq!(state.spins, 12);
        assert_eq!(state.source, StateSource::Confidential);
    }

    #[test]
    fn test_all_unavailable_falls_back_to_ledger() {
        let state = reconcile(&aggregates(), &DecryptedBundle::unavailable());
        assert_eq!(state.spins, 7);
        assert_eq!(state.gm, 400);
        assert_eq!(state.pending_reward_wei, U256::from(100u64));
        assert_eq!(state.last_slot, Some(3));
        assert_eq!(state.score, None);
        assert_eq!(state.source, StateSource::Ledger);
    }

    #[test]
    fn test_fields_merge_independently() {
        // Only gm is confidential-positive; spins still decide the source.
        let bundle = DecryptedBundle {
            gm: Some(900),
            ..Default::default()
        };
        let state = reconcile(&aggregates(), &bundle);
        assert_eq!(state.gm, 900);
        assert_eq!(state.spins, 7);
        assert_eq!(state.source, StateSource::Ledger);
    }

    #[test]
    fn test_last_slot_accepts_confidential_zero() {
        let bundle = DecryptedBundle {
            last_slot: Some(0),
            ..Default::default()
        };
        let state = reconcile(&aggregates(), &bundle);
        assert_eq!(state.last_slot, Some(0));
    }

    #[test]
    fn test_score_passes_through_when_available() {
        let bundle = DecryptedBundle {
            score: Some(55),
            ..Default::default()
        };
        let state = reconcile(&aggregates(), &bundle);
        assert_eq!(state.score, Some(55));
    }
}
