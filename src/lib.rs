pub mod api;
pub mod config;
pub mod confidential;
pub mod datasource;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod reconcile;

pub use config::Config;
pub use confidential::{
    Authorization, BundleDecryptor, BundleError, ConfidentialBundle, DecryptRelayer,
    DecryptedBundle, FieldSignatures, RelayerClient, RpcBundleReader,
};
pub use datasource::{EtherscanLogSource, LogSource, LogSourceError, MockLogSource};
pub use domain::{EntryMeta, EventKind, LedgerEntry, RawLog};
pub use error::AppError;
pub use ledger::{aggregate, DerivedAggregates, LedgerBuilder};
pub use reconcile::{reconcile, ReconciledState, StateSource};
