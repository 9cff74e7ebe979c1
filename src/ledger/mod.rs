//! Ledger construction and deterministic aggregation.

pub mod aggregate;
pub mod builder;

pub use aggregate::{aggregate, DerivedAggregates, GM_COST_PER_SPIN, SLOT0_REWARD_WEI, SLOT1_REWARD_WEI};
pub use builder::LedgerBuilder;
