//! Mock bundle reader and delegated decryptor for tests.

use super::bundle::{BundleError, BundleReader, ConfidentialBundle};
use super::decryptor::DelegatedDecryptor;
use super::relayer::{DecryptRelayer, RelayerError};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Bundle reader returning a predefined bundle, or `Unavailable` when none
/// is configured.
#[derive(Debug, Clone, Default)]
pub struct MockBundleReader {
    bundle: Option<ConfidentialBundle>,
}

impl MockBundleReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(mut self, bundle: ConfidentialBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }
}

#[async_trait]
impl BundleReader for MockBundleReader {
    async fn read_bundle(
        &self,
        _contract: Address,
        _account: Address,
    ) -> Result<ConfidentialBundle, BundleError> {
        self.bundle
            .ok_or_else(|| BundleError::Unavailable("no bundle configured".to_string()))
    }
}

/// Delegated decryptor resolving handles from an in-memory map; unknown
/// handles fail like a relayer error.
#[derive(Debug, Clone, Default)]
pub struct MockDelegatedDecryptor {
    values: HashMap<B256, U256>,
}

impl MockDelegatedDecryptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, handle: B256, value: U256) -> Self {
        self.values.insert(handle, value);
        self
    }
}

#[async_trait]
impl DelegatedDecryptor for MockDelegatedDecryptor {
    async fn user_decrypt(&self, handle: B256) -> Result<U256, RelayerError> {
        self.values
            .get(&handle)
            .copied()
            .ok_or(RelayerError::Http { status: 500 })
    }
}

/// Relayer resolving handles from an in-memory map and recording every
/// authorization signature it is handed; handles marked as failing (and
/// unknown handles) error like a relayer outage.
#[derive(Debug, Default)]
pub struct MockRelayer {
    values: HashMap<B256, U256>,
    failing: Vec<B256>,
    seen_signatures: Mutex<Vec<String>>,
}

impl MockRelayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, handle: B256, value: U256) -> Self {
        self.values.insert(handle, value);
        self
    }

    pub fn with_failure(mut self, handle: B256) -> Self {
        self.failing.push(handle);
        self
    }

    /// Signatures received so far, in call order.
    pub fn seen_signatures(&self) -> Vec<String> {
        self.seen_signatures.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DecryptRelayer for MockRelayer {
    async fn user_decrypt(
        &self,
        ciphertext: B256,
        _contract: Address,
        _account: Address,
        signature: &str,
        _verifying_contract: Option<Address>,
    ) -> Result<U256, RelayerError> {
        if let Ok(mut seen) = self.seen_signatures.lock() {
            seen.push(signature.to_string());
        }
        if self.failing.contains(&ciphertext) {
            return Err(RelayerError::Http { status: 503 });
        }
        self.values
            .get(&ciphertext)
            .copied()
            .ok_or(RelayerError::Http { status: 500 })
    }
}
