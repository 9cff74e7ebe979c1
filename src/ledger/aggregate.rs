//! Deterministic single-pass fold over an ordered ledger.

use crate::domain::LedgerEntry;
use alloy_primitives::U256;
use tracing::warn;

/// Fixed reward for slot 0, in wei (0.1 ETH).
pub const SLOT0_REWARD_WEI: u128 = 100_000_000_000_000_000;
/// Fixed reward for slot 1, in wei (0.01 ETH).
pub const SLOT1_REWARD_WEI: u128 = 10_000_000_000_000_000;
/// GM token cost charged per purchased spin, regardless of outcome.
pub const GM_COST_PER_SPIN: u64 = 10;

/// Totals derived from a ledger. A pure function of the entry sequence,
/// computed per request and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DerivedAggregates {
    pub available_spins: u64,
    pub estimated_gm: u64,
    pub pending_reward_wei: U256,
    pub last_slot: Option<u64>,
    pub spins_bought: u64,
    pub spins_done: u64,
    pub checkins: u64,
}

/// Fold an ordered ledger into derived totals.
///
/// Single pass, no lookahead. Intermediate sums are signed and may go
/// negative (tokens spent before more are earned); only the final reported
/// values are clamped to zero.
pub fn aggregate(entries: &[LedgerEntry]) -> DerivedAggregates {
    let mut spins_bought: u64 = 0;
    let mut checkins: u64 = 0;
    let mut spins_done: u64 = 0;
    let mut gm_from_prizes: i128 = 0;
    let mut pending_reward_wei = U256::ZERO;
    let mut last_slot: Option<u64> = None;

    for entry in entries {
        match entry {
            LedgerEntry::Checkin { .. } => checkins += 1,
            LedgerEntry::BuySpins { count, .. } => {
                spins_bought = spins_bought.saturating_add(*count);
            }
            LedgerEntry::Spin {
                slot,
                gm_delta,
                prize_wei,
                ..
            } => {
                spins_done += 1;
                last_slot = Some(*slot);
                match slot {
                    0 => {
                        pending_reward_wei =
                            pending_reward_wei.saturating_add(U256::from(SLOT0_REWARD_WEI));
                    }
                    1 => {
                        pending_reward_wei =
                            pending_reward_wei.saturating_add(U256::from(SLOT1_REWARD_WEI));
                    }
                    _ => {}
                }
                gm_from_prizes += i128::from(*gm_delta);
                if *prize_wei > U256::ZERO {
                    pending_reward_wei = pending_reward_wei.saturating_add(*prize_wei);
                }
            }
            LedgerEntry::BuyGmPublic { amount, .. } => {
                gm_from_prizes += i128::from(*amount);
            }
            // Amount is confidential; contributes nothing to the estimate.
            LedgerEntry::BuyGmConfidential { .. } => {}
        }
    }

    let available_spins = clamp_u64(
        i128::from(spins_bought) + i128::from(checkins) - i128::from(spins_done),
        "available_spins",
    );
    let estimated_gm = clamp_u64(
        gm_from_prizes - i128::from(GM_COST_PER_SPIN) * i128::from(spins_bought),
        "estimated_gm",
    );

    DerivedAggregates {
        available_spins,
        estimated_gm,
        pending_reward_wei,
        last_slot,
        spins_bought,
        spins_done,
        checkins,
    }
}

/// Clamp a signed running sum into the reported u64 range. Negative totals
/// report zero; totals past u64 saturate and flag instead of truncating.
fn clamp_u64(value: i128, field: &'static str) -> u64 {
    if value <= 0 {
        return 0;
    }
    u64::try_from(value).unwrap_or_else(|_| {
        warn!(field, value, "aggregate exceeds u64 range, saturating");
        u64::MAX
    })
}
