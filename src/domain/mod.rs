pub mod entry;
pub mod log;
pub mod ordering;
pub mod signature;

pub use entry::{decode_entry, EntryMeta, LedgerEntry};
pub use log::RawLog;
pub use ordering::sort_entries_canonical;
pub use signature::{account_topic, EventKind};
