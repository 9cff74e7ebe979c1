//! Confidential bundle read and authorized decryption.

pub mod bundle;
pub mod decryptor;
pub mod mock;
pub mod relayer;

pub use bundle::{BundleError, BundleField, BundleReader, ConfidentialBundle, RpcBundleReader};
pub use mock::{MockBundleReader, MockDelegatedDecryptor, MockRelayer};
pub use decryptor::{
    Authorization, BundleDecryptor, DecryptedBundle, DelegatedDecryptor, FieldSignatures,
};
pub use relayer::{DecryptRelayer, RelayerClient, RelayerError};
