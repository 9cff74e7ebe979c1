//! Per-field bundle decryption under an explicit authorization capability.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::bundle::{BundleError, BundleField, BundleReader, ConfidentialBundle};
use super::relayer::{DecryptRelayer, RelayerError};
use crate::domain::account_topic;

const DOMAIN_NAME: &str = "FHE Relayer";
const DOMAIN_VERSION: &str = "1";
const DOMAIN_TYPEHASH: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const MESSAGE_TYPEHASH: &[u8] =
    b"UserDecryptRequestVerification(bytes32 ciphertext,address contract,address user)";

/// Plaintext resolution of a [`ConfidentialBundle`]. `None` marks a field
/// unavailable: decryption failed, authorization was missing, or the handle
/// was empty. The pending amount stays arbitrary precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecryptedBundle {
    pub spins: Option<u64>,
    pub gm: Option<u64>,
    pub pending_wei: Option<U256>,
    pub last_slot: Option<u64>,
    pub score: Option<u64>,
}

impl DecryptedBundle {
    /// A bundle with every field unavailable; the graceful-degradation value.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// A delegated confidential-compute client that performs the authorization
/// handshake and decryption internally. Preferred over manual signing when
/// available.
#[async_trait]
pub trait DelegatedDecryptor: Send + Sync + fmt::Debug {
    async fn user_decrypt(&self, handle: B256) -> Result<U256, RelayerError>;
}

/// Per-field authorization signatures supplied by a caller-held wallet, used
/// when the server must not hold the account's signing key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSignatures {
    pub spins: Option<String>,
    pub gm: Option<String>,
    pub pending_wei: Option<String>,
    pub last_slot: Option<String>,
    pub score: Option<String>,
}

impl FieldSignatures {
    fn get(&self, field: BundleField) -> Option<&str> {
        match field {
            BundleField::Spins => self.spins.as_deref(),
            BundleField::Gm => self.gm.as_deref(),
            BundleField::PendingWei => self.pending_wei.as_deref(),
            BundleField::LastSlot => self.last_slot.as_deref(),
            BundleField::Score => self.score.as_deref(),
        }
    }
}

/// How the caller proves the account's right to decrypt. Selected by what is
/// available, not by exception-driven fallback.
#[derive(Clone)]
pub enum Authorization {
    /// Delegated client capability; handshake handled internally.
    Delegated(Arc<dyn DelegatedDecryptor>),
    /// Server-held signer; signs a typed per-field authorization message.
    Signer(Box<PrivateKeySigner>),
    /// Pre-computed per-field signatures from a caller-held wallet.
    Presigned(FieldSignatures),
}

/// Resolves the contract's encrypted bundle into plaintext fields.
#[derive(Debug, Clone)]
pub struct BundleDecryptor {
    reader: Arc<dyn BundleReader>,
    relayer: Option<Arc<dyn DecryptRelayer>>,
    chain_id: u64,
    decryption_verifier: Option<Address>,
}

impl BundleDecryptor {
    pub fn new(
        reader: Arc<dyn BundleReader>,
        relayer: Option<Arc<dyn DecryptRelayer>>,
        chain_id: u64,
        decryption_verifier: Option<Address>,
    ) -> Self {
        Self {
            reader,
            relayer,
            chain_id,
            decryption_verifier,
        }
    }

    /// Read the encrypted bundle and resolve each field.
    ///
    /// Decryption is strictly opt-in: with no authorization every field is
    /// unavailable and no error is raised. A per-field failure degrades that
    /// field only; a failed bundle read fails the whole confidential path.
    pub async fn resolve_bundle(
        &self,
        contract: Address,
        account: Address,
        authorization: Option<Authorization>,
    ) -> Result<DecryptedBundle, BundleError> {
        let bundle = self.reader.read_bundle(contract, account).await?;

        let Some(authorization) = authorization else {
            return Ok(DecryptedBundle::unavailable());
        };

        let values = match authorization {
            Authorization::Delegated(client) => self.resolve_delegated(&bundle, &client).await,
            Authorization::Signer(signer) => {
                self.resolve_with_signer(&bundle, contract, account, &signer)
                    .await?
            }
            Authorization::Presigned(signatures) => {
                self.resolve_presigned(&bundle, contract, account, &signatures)
                    .await
            }
        };

        Ok(assemble(values))
    }

    async fn resolve_delegated(
        &self,
        bundle: &ConfidentialBundle,
        client: &Arc<dyn DelegatedDecryptor>,
    ) -> [(BundleField, Option<U256>); 5] {
        let mut values = bundle.handles().map(|(field, _)| (field, None));
        for (i, (field, handle)) in bundle.handles().into_iter().enumerate() {
            if handle.is_zero() {
                continue;
            }
            match client.user_decrypt(handle).await {
                Ok(value) => values[i] = (field, Some(value)),
                Err(e) => warn!(field = field.as_str(), "delegated decrypt failed: {}", e),
            }
        }
        values
    }

    async fn resolve_with_signer(
        &self,
        bundle: &ConfidentialBundle,
        contract: Address,
        account: Address,
        signer: &PrivateKeySigner,
    ) -> Result<[(BundleField, Option<U256>); 5], BundleError> {
        let mut values = bundle.handles().map(|(field, _)| (field, None));

        let (Some(relayer), Some(verifier)) = (&self.relayer, self.decryption_verifier) else {
            // Relayer config absent: decryption silently skipped.
            return Ok(values);
        };

        if signer.address() != account {
            return Err(BundleError::SignerMismatch {
                signer: signer.address(),
                account,
            });
        }

        for (i, (field, handle)) in bundle.handles().into_iter().enumerate() {
            if handle.is_zero() {
                continue;
            }
            let digest = self.eip712_digest(verifier, handle, contract, account);
            let signature = match signer.sign_hash_sync(&digest) {
                Ok(s) => format!("0x{}", hex::encode(s.as_bytes())),
                Err(e) => {
                    warn!(field = field.as_str(), "signing failed: {}", e);
                    continue;
                }
            };
            match relayer
                .user_decrypt(handle, contract, account, &signature, Some(verifier))
                .await
            {
                Ok(value) => values[i] = (field, Some(value)),
                Err(e) => warn!(field = field.as_str(), "relayer decrypt failed: {}", e),
            }
        }

        Ok(values)
    }

    async fn resolve_presigned(
        &self,
        bundle: &ConfidentialBundle,
        contract: Address,
        account: Address,
        signatures: &FieldSignatures,
    ) -> [(BundleField, Option<U256>); 5] {
        let mut values = bundle.handles().map(|(field, _)| (field, None));

        let Some(relayer) = &self.relayer else {
            return values;
        };

        for (i, (field, handle)) in bundle.handles().into_iter().enumerate() {
            if handle.is_zero() {
                continue;
            }
            let Some(signature) = signatures.get(field) else {
                continue;
            };
            match relayer
                .user_decrypt(handle, contract, account, signature, self.decryption_verifier)
                .await
            {
                Ok(value) => values[i] = (field, Some(value)),
                Err(e) => warn!(field = field.as_str(), "relayer decrypt failed: {}", e),
            }
        }

        values
    }

    /// EIP-712 digest of `UserDecryptRequestVerification(bytes32 ciphertext,
    /// address contract,address user)` under the relayer's domain.
    fn eip712_digest(
        &self,
        verifier: Address,
        ciphertext: B256,
        contract: Address,
        account: Address,
    ) -> B256 {
        let mut domain = Vec::with_capacity(32 * 5);
        domain.extend_from_slice(keccak256(DOMAIN_TYPEHASH).as_slice());
        domain.extend_from_slice(keccak256(DOMAIN_NAME.as_bytes()).as_slice());
        domain.extend_from_slice(keccak256(DOMAIN_VERSION.as_bytes()).as_slice());
        domain.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        domain.extend_from_slice(account_topic(verifier).as_slice());
        let domain_separator = keccak256(&domain);

        let mut message = Vec::with_capacity(32 * 4);
        message.extend_from_slice(keccak256(MESSAGE_TYPEHASH).as_slice());
        message.extend_from_slice(ciphertext.as_slice());
        message.extend_from_slice(account_topic(contract).as_slice());
        message.extend_from_slice(account_topic(account).as_slice());
        let struct_hash = keccak256(&message);

        let mut preimage = Vec::with_capacity(2 + 32 * 2);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(domain_separator.as_slice());
        preimage.extend_from_slice(struct_hash.as_slice());
        keccak256(&preimage)
    }
}

/// Assemble resolved words into the typed bundle, saturating narrow fields.
fn assemble(values: [(BundleField, Option<U256>); 5]) -> DecryptedBundle {
    let mut bundle = DecryptedBundle::unavailable();
    for (field, value) in values {
        match field {
            BundleField::Spins => bundle.spins = value.map(|v| narrow_u64(v, field)),
            BundleField::Gm => bundle.gm = value.map(|v| narrow_u64(v, field)),
            BundleField::PendingWei => bundle.pending_wei = value,
            BundleField::LastSlot => bundle.last_slot = value.map(|v| narrow_u64(v, field)),
            BundleField::Score => bundle.score = value.map(|v| narrow_u64(v, field)),
        }
    }
    bundle
}

fn narrow_u64(value: U256, field: BundleField) -> u64 {
    if value > U256::from(u64::MAX) {
        warn!(field = field.as_str(), %value, "decrypted value exceeds u64 range, saturating");
        return u64::MAX;
    }
    value.to::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidential::mock::{MockBundleReader, MockDelegatedDecryptor, MockRelayer};
    use alloy_primitives::address;

    fn contract() -> Address {
        address!("2222222222222222222222222222222222222222")
    }

    fn bundle() -> ConfidentialBundle {
        ConfidentialBundle {
            spins: B256::repeat_byte(1),
            gm: B256::repeat_byte(2),
            pending_wei: B256::repeat_byte(3),
            last_slot: B256::repeat_byte(4),
            score: B256::repeat_byte(5),
        }
    }

    fn decryptor(reader: MockBundleReader) -> BundleDecryptor {
        BundleDecryptor::new(Arc::new(reader), None, 11155111, None)
    }

    #[tokio::test]
    async fn test_no_authorization_returns_all_unavailable() {
        let decryptor = decryptor(MockBundleReader::new().with_bundle(bundle()));
        let resolved = decryptor
            .resolve_bundle(contract(), Address::ZERO, None)
            .await
            .unwrap();
        assert_eq!(resolved, DecryptedBundle::unavailable());
    }

    #[tokio::test]
    async fn test_bundle_read_failure_is_unavailable_error() {
        let decryptor = decryptor(MockBundleReader::new());
        let result = decryptor
            .resolve_bundle(contract(), Address::ZERO, None)
            .await;
        assert!(matches!(result, Err(BundleError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_delegated_resolves_each_field_independently() {
        let b = bundle();
        let delegated = MockDelegatedDecryptor::new()
            .with_value(b.spins, U256::from(12u64))
            .with_value(b.pending_wei, U256::from(1_000u64));
        // gm, last_slot, score have no mock values and degrade to None.
        let decryptor = decryptor(MockBundleReader::new().with_bundle(b));
        let resolved = decryptor
            .resolve_bundle(
                contract(),
                Address::ZERO,
                Some(Authorization::Delegated(Arc::new(delegated))),
            )
            .await
            .unwrap();
        assert_eq!(resolved.spins, Some(12));
        assert_eq!(resolved.pending_wei, Some(U256::from(1_000u64)));
        assert_eq!(resolved.gm, None);
        assert_eq!(resolved.score, None);
    }

    #[tokio::test]
    async fn test_delegated_skips_zero_handles() {
        let mut b = bundle();
        b.spins = B256::ZERO;
        let delegated = MockDelegatedDecryptor::new().with_value(b.gm, U256::from(3u64));
        let decryptor = decryptor(MockBundleReader::new().with_bundle(b));
        let resolved = decryptor
            .resolve_bundle(
                contract(),
                Address::ZERO,
                Some(Authorization::Delegated(Arc::new(delegated))),
            )
            .await
            .unwrap();
        assert_eq!(resolved.spins, None);
        assert_eq!(resolved.gm, Some(3));
    }

    #[tokio::test]
    async fn test_signer_mismatch_is_fatal_for_path() {
        let signer = PrivateKeySigner::random();
        let account = address!("1111111111111111111111111111111111111111");
        assert_ne!(signer.address(), account);

        let decryptor = BundleDecryptor::new(
            Arc::new(MockBundleReader::new().with_bundle(bundle())),
            Some(Arc::new(MockRelayer::new())),
            11155111,
            Some(contract()),
        );
        let result = decryptor
            .resolve_bundle(
                contract(),
                account,
                Some(Authorization::Signer(Box::new(signer))),
            )
            .await;
        assert!(matches!(result, Err(BundleError::SignerMismatch { .. })));
    }

    #[tokio::test]
    async fn test_signer_without_relayer_config_degrades_silently() {
        let signer = PrivateKeySigner::random();
        let decryptor = decryptor(MockBundleReader::new().with_bundle(bundle()));
        let resolved = decryptor
            .resolve_bundle(
                contract(),
                signer.address(),
                Some(Authorization::Signer(Box::new(signer))),
            )
            .await
            .unwrap();
        assert_eq!(resolved, DecryptedBundle::unavailable());
    }

    #[tokio::test]
    async fn test_signer_path_decrypts_fields_and_isolates_failures() {
        let signer = PrivateKeySigner::random();
        let account = signer.address();
        let b = bundle();
        // pending_wei fails at the relayer; gm and last_slot have no value
        // configured, so they also error. spins and score resolve.
        let relayer = Arc::new(
            MockRelayer::new()
                .with_value(b.spins, U256::from(9u64))
                .with_value(b.score, U256::from(77u64))
                .with_value(b.gm, U256::from(1u64))
                .with_value(b.last_slot, U256::from(1u64))
                .with_failure(b.pending_wei),
        );
        let decryptor = BundleDecryptor::new(
            Arc::new(MockBundleReader::new().with_bundle(b)),
            Some(relayer.clone()),
            11155111,
            Some(address!("3333333333333333333333333333333333333333")),
        );

        let resolved = decryptor
            .resolve_bundle(
                contract(),
                account,
                Some(Authorization::Signer(Box::new(signer))),
            )
            .await
            .unwrap();

        assert_eq!(resolved.spins, Some(9));
        assert_eq!(resolved.gm, Some(1));
        assert_eq!(resolved.pending_wei, None);
        assert_eq!(resolved.last_slot, Some(1));
        assert_eq!(resolved.score, Some(77));

        // Every handle got its own 65-byte authorization signature.
        let signatures = relayer.seen_signatures();
        assert_eq!(signatures.len(), 5);
        for signature in &signatures {
            assert!(signature.starts_with("0x"));
            assert_eq!(signature.len(), 2 + 65 * 2);
        }
        // Signatures are per-ciphertext, so no two may coincide.
        for (i, a) in signatures.iter().enumerate() {
            for b in &signatures[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[tokio::test]
    async fn test_presigned_path_forwards_only_supplied_signatures() {
        let b = bundle();
        let relayer = Arc::new(
            MockRelayer::new()
                .with_value(b.spins, U256::from(4u64))
                .with_value(b.gm, U256::from(8u64)),
        );
        let decryptor = BundleDecryptor::new(
            Arc::new(MockBundleReader::new().with_bundle(b)),
            Some(relayer.clone()),
            11155111,
            None,
        );
        let signatures = FieldSignatures {
            spins: Some("0xaaaa".to_string()),
            ..Default::default()
        };

        let resolved = decryptor
            .resolve_bundle(
                contract(),
                Address::ZERO,
                Some(Authorization::Presigned(signatures)),
            )
            .await
            .unwrap();

        // Only the signed field was attempted; gm has a value at the relayer
        // but no signature, so it stays unavailable.
        assert_eq!(resolved.spins, Some(4));
        assert_eq!(resolved.gm, None);
        assert_eq!(relayer.seen_signatures(), vec!["0xaaaa".to_string()]);
    }

    #[tokio::test]
    async fn test_presigned_without_relayer_degrades_silently() {
        let decryptor = decryptor(MockBundleReader::new().with_bundle(bundle()));
        let signatures = FieldSignatures {
            spins: Some("0xsig".to_string()),
            ..Default::default()
        };
        let resolved = decryptor
            .resolve_bundle(
                contract(),
                Address::ZERO,
                Some(Authorization::Presigned(signatures)),
            )
            .await
            .unwrap();
        assert_eq!(resolved, DecryptedBundle::unavailable());
    }

    #[test]
    fn test_assemble_saturates_narrow_fields() {
        let values = [
            (BundleField::Spins, Some(U256::MAX)),
            (BundleField::Gm, None),
            (BundleField::PendingWei, Some(U256::MAX)),
            (BundleField::LastSlot, Some(U256::from(2u64))),
            (BundleField::Score, None),
        ];
        let bundle = assemble(values);
        assert_eq!(bundle.spins, Some(u64::MAX));
        assert_eq!(bundle.pending_wei, Some(U256::MAX));
        assert_eq!(bundle.last_slot, Some(2));
        assert_eq!(bundle.gm, None);
    }

    #[test]
    fn test_eip712_digest_is_deterministic_and_field_sensitive() {
        let decryptor = decryptor(MockBundleReader::new());
        let verifier = address!("3333333333333333333333333333333333333333");
        let account = address!("1111111111111111111111111111111111111111");
        let a = decryptor.eip712_digest(verifier, B256::repeat_byte(1), contract(), account);
        let b = decryptor.eip712_digest(verifier, B256::repeat_byte(1), contract(), account);
        let c = decryptor.eip712_digest(verifier, B256::repeat_byte(2), contract(), account);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
