//! # Wallet
//!
//! Keys, DIDs and envelopes on top of a store.
//!
//! ## Operations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           WALLET SURFACE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Keys        create_signing_key / get_signing_key                      │
//! │              replace_signing_key_metadata                              │
//! │                                                                         │
//! │  DIDs        create_local_did / get_local_did(s)                       │
//! │              get_local_did_for_verkey / replace_local_did_metadata     │
//! │              set_did_endpoint                                          │
//! │                                                                         │
//! │  Rotation    rotate_did_keypair_start ──► rotate_did_keypair_apply     │
//! │                                                                         │
//! │  Messages    sign_message / verify_message                             │
//! │              pack_message / unpack_message                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation runs in its own store session and commits before it
//! returns. Pack work happens after the sender key has been read, outside
//! any session.

mod rotation;

pub use rotation::RotationState;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crypto::{self, verifying_key, KeyType, LocalKey, Signature, StoreKey};
use crate::envelope::{self, Unpacked};
use crate::error::{Error, Result};
use crate::identity::{
    sov_did_from_public_key, DidInfo, DidKey, DidMethod, KeyInfo, Metadata, ENDPOINT,
};
use crate::storage::{self, Entry, StorageConfig, Store, StoreSession, TagFilter, Tags};

/// Record category holding DIDs
pub const CATEGORY_DID: &str = "did";

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Wallet configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Storage backend
    #[serde(default)]
    pub storage: StorageConfig,
    /// Base58 32-byte key encrypting secret keys at rest
    #[serde(default)]
    pub store_key: Option<String>,
}

impl WalletConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// WALLET
// ============================================================================

/// A wallet bound to one store
#[derive(Clone)]
pub struct Wallet {
    store: Arc<dyn Store>,
}

impl Wallet {
    /// Open the store described by `config`
    pub fn open(config: &WalletConfig) -> Result<Self> {
        let store_key = config
            .store_key
            .as_deref()
            .map(StoreKey::from_base58)
            .transpose()?;
        let encrypted = store_key.is_some();
        let store = storage::open(&config.storage, store_key)?;
        info!(encrypted, "Wallet opened");
        Ok(Self { store })
    }

    /// Use an existing store
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// A wallet backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(storage::MemoryStore::default()))
    }

    fn session(&self) -> Result<Box<dyn StoreSession + '_>> {
        self.store.session()
    }

    // ========================================================================
    // SIGNING KEYS
    // ========================================================================

    /// Create and store a new signing keypair
    ///
    /// `DuplicateKey` if the resulting verkey is already in the wallet.
    pub fn create_signing_key(
        &self,
        key_type: KeyType,
        seed: Option<&str>,
        metadata: Option<Metadata>,
    ) -> Result<KeyInfo> {
        let metadata = metadata.unwrap_or_default();
        let key = LocalKey::generate(key_type, seed)?;
        let verkey = key.verkey();

        let mut session = self.session()?;
        session
            .insert_key(&verkey, &key, Some(&metadata_json(&metadata)?), &Tags::new())
            .map_err(|e| {
                if e.is_duplicate() {
                    Error::DuplicateKey("Verification key already present in wallet".into())
                } else {
                    e
                }
            })?;
        session.commit()?;

        debug!(%verkey, "Created signing key");
        Ok(KeyInfo {
            verkey,
            metadata,
            key_type,
        })
    }

    /// Look up a signing keypair by verkey
    pub fn get_signing_key(&self, verkey: &str) -> Result<KeyInfo> {
        if verkey.is_empty() {
            return Err(Error::NotFound("No key identifier provided".into()));
        }
        let mut session = self.session()?;
        let entry = session
            .fetch_key(verkey, false)?
            .ok_or_else(|| Error::NotFound(format!("Unknown key: {}", verkey)))?;

        Ok(KeyInfo {
            verkey: verkey.to_string(),
            metadata: parse_metadata(entry.metadata.as_deref())?,
            key_type: entry.key.key_type(),
        })
    }

    /// Replace the metadata of a signing keypair
    pub fn replace_signing_key_metadata(&self, verkey: &str, metadata: Metadata) -> Result<()> {
        if verkey.is_empty() {
            return Err(Error::NotFound("No key identifier provided".into()));
        }
        let mut session = self.session()?;
        let entry = session
            .fetch_key(verkey, true)?
            .ok_or_else(|| Error::NotFound("Keypair not found".into()))?;
        session.update_key(verkey, Some(&metadata_json(&metadata)?), &entry.tags)?;
        session.commit()
    }

    // ========================================================================
    // LOCAL DIDS
    // ========================================================================

    /// Create and store a new local DID
    ///
    /// The DID is derived from the key unless given. Creating a DID that
    /// already exists with the same verkey is not an error; its metadata is
    /// replaced if it differs.
    pub fn create_local_did(
        &self,
        method: DidMethod,
        key_type: KeyType,
        seed: Option<&str>,
        did: Option<&str>,
        metadata: Option<Metadata>,
    ) -> Result<DidInfo> {
        if !method.supports_key_type(key_type) {
            return Err(Error::UnsupportedKeyType(format!(
                "Invalid key type {} for DID method {}",
                key_type, method
            )));
        }
        let did = did.filter(|d| !d.is_empty());
        if method == DidMethod::Key && did.is_some() {
            return Err(Error::InvalidInput(
                "Not allowed to set DID for DID method 'key'".into(),
            ));
        }
        let metadata = metadata.unwrap_or_default();

        let key = LocalKey::generate(key_type, seed)?;
        let verkey = key.verkey();
        let public_key = key.public_bytes();

        let mut session = self.session()?;
        match session.insert_key(&verkey, &key, Some(&metadata_json(&metadata)?), &Tags::new()) {
            Err(e) if e.is_duplicate() => {
                debug!(%verkey, "Key for new DID already present");
            }
            other => other?,
        }

        let did = match (method, did) {
            (DidMethod::Key, _) => DidKey::from_public_key(&public_key, key_type)?.into_string(),
            (DidMethod::Sov, Some(did)) => did.to_string(),
            (DidMethod::Sov, None) => sov_did_from_public_key(&public_key),
        };

        let info = match session.fetch(CATEGORY_DID, &did, true)? {
            Some(entry) => {
                let mut existing = load_did(&entry)?;
                if existing.verkey != verkey {
                    return Err(Error::DuplicateDid(did));
                }
                if existing.metadata != metadata {
                    existing.metadata = metadata;
                    write_did(session.as_mut(), &existing, &entry.tags)?;
                }
                existing
            }
            None => {
                let info = DidInfo {
                    did,
                    method,
                    verkey,
                    key_type,
                    metadata,
                };
                session.insert(
                    CATEGORY_DID,
                    &info.did,
                    &serde_json::to_vec(&info)?,
                    &did_tags(&info),
                )?;
                info!(did = %info.did, method = %method, "Created local DID");
                info
            }
        };
        session.commit()?;
        Ok(info)
    }

    /// All local DIDs, in creation order
    pub fn get_local_dids(&self) -> Result<Vec<DidInfo>> {
        let mut session = self.session()?;
        session
            .fetch_all(CATEGORY_DID, None, None)?
            .iter()
            .map(load_did)
            .collect()
    }

    /// Look up a local DID
    pub fn get_local_did(&self, did: &str) -> Result<DidInfo> {
        if did.is_empty() {
            return Err(Error::NotFound("No identifier provided".into()));
        }
        let mut session = self.session()?;
        let entry = session
            .fetch(CATEGORY_DID, did, false)?
            .ok_or_else(|| Error::NotFound(format!("Unknown DID: {}", did)))?;
        load_did(&entry)
    }

    /// Find the local DID currently bound to `verkey`
    pub fn get_local_did_for_verkey(&self, verkey: &str) -> Result<DidInfo> {
        let filter = TagFilter::new().tag("verkey", verkey);
        let mut session = self.session()?;
        let entries = session.fetch_all(CATEGORY_DID, Some(&filter), Some(1))?;
        match entries.first() {
            Some(entry) => load_did(entry),
            None => Err(Error::NotFound(format!(
                "No DID defined for verkey: {}",
                verkey
            ))),
        }
    }

    /// Replace the metadata of a local DID
    pub fn replace_local_did_metadata(&self, did: &str, metadata: Metadata) -> Result<()> {
        let mut session = self.session()?;
        let (entry, mut info) = fetch_did_for_update(session.as_mut(), did)?;
        if info.metadata != metadata {
            info.metadata = metadata;
            write_did(session.as_mut(), &info, &entry.tags)?;
        }
        session.commit()
    }

    /// Record a service endpoint for a sov DID, or clear it with `None`
    ///
    /// Only the local record changes.
    pub fn set_did_endpoint(&self, did: &str, endpoint: Option<&str>) -> Result<DidInfo> {
        let mut session = self.session()?;
        let (entry, mut info) = fetch_did_for_update(session.as_mut(), did)?;
        if info.method != DidMethod::Sov {
            return Err(Error::UnsupportedDidMethod(
                "Setting DID endpoint is only allowed for did:sov DIDs".into(),
            ));
        }

        match endpoint {
            Some(endpoint) => {
                info.metadata
                    .insert(ENDPOINT.to_string(), endpoint.to_string().into());
            }
            None => {
                info.metadata.remove(ENDPOINT);
            }
        }
        write_did(session.as_mut(), &info, &entry.tags)?;
        session.commit()?;

        debug!(%did, "Updated DID endpoint");
        Ok(info)
    }

    // ========================================================================
    // SIGNATURES
    // ========================================================================

    /// Sign `message` with the key named by `from_verkey`
    pub fn sign_message(&self, message: &[u8], from_verkey: &str) -> Result<Signature> {
        if message.is_empty() {
            return Err(Error::InvalidInput("Message not provided".into()));
        }
        if from_verkey.is_empty() {
            return Err(Error::InvalidInput("Verkey not provided".into()));
        }
        let key = self.fetch_local_key(from_verkey, "Missing key for sign operation")?;
        Ok(crypto::sign(&key, message))
    }

    /// Check a signature against a verkey
    ///
    /// `Ok(false)` for a well-formed signature that does not match.
    pub fn verify_message(
        &self,
        message: &[u8],
        signature: &[u8],
        from_verkey: &str,
        key_type: KeyType,
    ) -> Result<bool> {
        if from_verkey.is_empty() {
            return Err(Error::InvalidInput("Verkey not provided".into()));
        }
        if signature.is_empty() {
            return Err(Error::InvalidInput("Signature not provided".into()));
        }
        if message.is_empty() {
            return Err(Error::InvalidInput("Message not provided".into()));
        }
        if key_type != KeyType::Ed25519 {
            return Err(Error::UnsupportedKeyType(key_type.to_string()));
        }

        verifying_key(from_verkey)?;
        let signature = match Signature::from_slice(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        match crypto::verify(from_verkey, message, &signature) {
            Ok(()) => Ok(true),
            Err(Error::VerificationFailed) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // ENVELOPES
    // ========================================================================

    /// Pack a message for `to_verkeys`, authenticated if `from_verkey` is set
    pub fn pack_message<S: AsRef<str>>(
        &self,
        message: &[u8],
        to_verkeys: &[S],
        from_verkey: Option<&str>,
    ) -> Result<Vec<u8>> {
        let sender = match from_verkey.filter(|vk| !vk.is_empty()) {
            Some(verkey) => Some(self.fetch_local_key(verkey, "Missing key for pack operation")?),
            None => None,
        };
        envelope::pack(message, to_verkeys, sender.as_ref())
    }

    /// Open an envelope addressed to one of this wallet's keys
    pub fn unpack_message(&self, packed: &[u8]) -> Result<Unpacked> {
        if packed.is_empty() {
            return Err(Error::InvalidInput("Message not provided".into()));
        }
        let mut session = self.session()?;
        let unpacked = envelope::unpack(packed, |kid| {
            Ok(session.fetch_key(kid, false)?.map(|entry| entry.key))
        })?;
        debug!(recipient = %unpacked.recipient_verkey, "Unpacked message");
        Ok(unpacked)
    }

    fn fetch_local_key(&self, verkey: &str, missing: &str) -> Result<LocalKey> {
        let mut session = self.session()?;
        session
            .fetch_key(verkey, false)?
            .map(|entry| entry.key)
            .ok_or_else(|| Error::NotFound(missing.to_string()))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").finish_non_exhaustive()
    }
}

// ============================================================================
// RECORD HELPERS
// ============================================================================

fn metadata_json(metadata: &Metadata) -> Result<String> {
    Ok(serde_json::to_string(metadata)?)
}

fn parse_metadata(stored: Option<&str>) -> Result<Metadata> {
    match stored {
        Some(text) if !text.is_empty() => Ok(serde_json::from_str(text)?),
        _ => Ok(Metadata::new()),
    }
}

fn load_did(entry: &Entry) -> Result<DidInfo> {
    entry.value_json()
}

/// Tags for a DID record; `verkey` always mirrors the record's verkey
fn did_tags(info: &DidInfo) -> Tags {
    let mut tags = Tags::new();
    tags.insert("method".into(), info.method.method_name().into());
    tags.insert("verkey".into(), info.verkey.clone());
    tags.insert("verkey_type".into(), info.key_type.as_str().into());
    tags
}

fn fetch_did_for_update(session: &mut dyn StoreSession, did: &str) -> Result<(Entry, DidInfo)> {
    if did.is_empty() {
        return Err(Error::NotFound("No identifier provided".into()));
    }
    let entry = session
        .fetch(CATEGORY_DID, did, true)?
        .ok_or_else(|| Error::NotFound(format!("Unknown DID: {}", did)))?;
    let info = load_did(&entry)?;
    Ok((entry, info))
}

/// Write a DID record back, keeping unrelated tags and refreshing ours
fn write_did(session: &mut dyn StoreSession, info: &DidInfo, existing: &Tags) -> Result<()> {
    let mut tags = existing.clone();
    tags.extend(did_tags(info));
    session.replace(CATEGORY_DID, &info.did, &serde_json::to_vec(info)?, &tags)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SEED: &str = "testseed000000000000000000000001";

    fn metadata(value: serde_json::Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    fn sqlite_wallet(dir: &tempfile::TempDir) -> Wallet {
        Wallet::open(&WalletConfig {
            storage: StorageConfig::Sqlite {
                path: dir.path().join("wallet.db"),
            },
            store_key: Some(StoreKey::generate_base58()),
        })
        .unwrap()
    }

    #[test]
    fn test_config_from_json() {
        let config = WalletConfig::from_json(
            r#"{"storage":{"backend":"sqlite","path":"w.db"},"store_key":null}"#,
        )
        .unwrap();
        assert_eq!(config.storage, StorageConfig::Sqlite { path: "w.db".into() });
        assert_eq!(WalletConfig::from_json("{}").unwrap(), WalletConfig::default());
    }

    #[test]
    fn test_open_rejects_bad_store_key() {
        let config = WalletConfig {
            storage: StorageConfig::Memory,
            store_key: Some("short".into()),
        };
        assert!(matches!(Wallet::open(&config), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_signing_key_crud() {
        let wallet = Wallet::in_memory();
        let info = wallet
            .create_signing_key(KeyType::Ed25519, Some(SEED), Some(metadata(json!({"a": 1}))))
            .unwrap();

        let fetched = wallet.get_signing_key(&info.verkey).unwrap();
        assert_eq!(fetched, info);

        wallet
            .replace_signing_key_metadata(&info.verkey, metadata(json!({"b": 2})))
            .unwrap();
        assert_eq!(
            wallet.get_signing_key(&info.verkey).unwrap().metadata,
            metadata(json!({"b": 2}))
        );

        assert!(matches!(
            wallet.create_signing_key(KeyType::Ed25519, Some(SEED), None),
            Err(Error::DuplicateKey(_))
        ));
        assert!(matches!(wallet.get_signing_key(""), Err(Error::NotFound(_))));
        assert!(matches!(
            wallet.get_signing_key("unknown"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            wallet.replace_signing_key_metadata("unknown", Metadata::new()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_bls_key_generation_unsupported() {
        let wallet = Wallet::in_memory();
        assert!(matches!(
            wallet.create_signing_key(KeyType::Bls12381G2, None, None),
            Err(Error::UnsupportedKeyType(_))
        ));
    }

    #[test]
    fn test_create_sov_did() {
        let wallet = Wallet::in_memory();
        let info = wallet
            .create_local_did(DidMethod::Sov, KeyType::Ed25519, Some(SEED), None, None)
            .unwrap();

        let verkey_bytes = crypto::verkey_to_bytes(&info.verkey).unwrap();
        assert_eq!(info.did, bs58::encode(&verkey_bytes[..16]).into_string());
        assert_eq!(info.method, DidMethod::Sov);
        assert_eq!(wallet.get_local_did(&info.did).unwrap(), info);
        assert_eq!(wallet.get_local_did_for_verkey(&info.verkey).unwrap(), info);
        assert!(wallet.get_signing_key(&info.verkey).is_ok());
    }

    #[test]
    fn test_create_sov_did_with_explicit_did() {
        let wallet = Wallet::in_memory();
        let info = wallet
            .create_local_did(DidMethod::Sov, KeyType::Ed25519, None, Some("CustomDid12345"), None)
            .unwrap();
        assert_eq!(info.did, "CustomDid12345");
    }

    #[test]
    fn test_create_key_did() {
        let wallet = Wallet::in_memory();
        let info = wallet
            .create_local_did(DidMethod::Key, KeyType::Ed25519, None, None, None)
            .unwrap();
        assert!(info.did.starts_with("did:key:z6Mk"));
        let did_key = DidKey::parse(&info.did).unwrap();
        assert_eq!(
            crypto::bytes_to_verkey(&did_key.public_key().unwrap()),
            info.verkey
        );

        assert!(matches!(
            wallet.create_local_did(DidMethod::Key, KeyType::Ed25519, None, Some("did:key:zabc"), None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_create_did_rejects_unsupported_key_type() {
        let wallet = Wallet::in_memory();
        assert!(matches!(
            wallet.create_local_did(DidMethod::Sov, KeyType::Bls12381G2, None, None, None),
            Err(Error::UnsupportedKeyType(_))
        ));
    }

    #[test]
    fn test_create_did_twice_same_seed() {
        let wallet = Wallet::in_memory();
        let first = wallet
            .create_local_did(DidMethod::Sov, KeyType::Ed25519, Some(SEED), None, None)
            .unwrap();
        let second = wallet
            .create_local_did(
                DidMethod::Sov,
                KeyType::Ed25519,
                Some(SEED),
                None,
                Some(metadata(json!({"label": "again"}))),
            )
            .unwrap();

        assert_eq!(first.did, second.did);
        assert_eq!(first.verkey, second.verkey);
        assert_eq!(
            wallet.get_local_did(&first.did).unwrap().metadata,
            metadata(json!({"label": "again"}))
        );
        assert_eq!(wallet.get_local_dids().unwrap().len(), 1);
    }

    #[test]
    fn test_create_did_conflicting_verkey() {
        let wallet = Wallet::in_memory();
        wallet
            .create_local_did(DidMethod::Sov, KeyType::Ed25519, None, Some("SharedDid"), None)
            .unwrap();
        assert!(matches!(
            wallet.create_local_did(DidMethod::Sov, KeyType::Ed25519, None, Some("SharedDid"), None),
            Err(Error::DuplicateDid(_))
        ));
    }

    #[test]
    fn test_did_lookups() {
        let wallet = Wallet::in_memory();
        let a = wallet
            .create_local_did(DidMethod::Sov, KeyType::Ed25519, None, None, None)
            .unwrap();
        let b = wallet
            .create_local_did(DidMethod::Key, KeyType::Ed25519, None, None, None)
            .unwrap();

        let dids: Vec<_> = wallet
            .get_local_dids()
            .unwrap()
            .into_iter()
            .map(|info| info.did)
            .collect();
        assert_eq!(dids, vec![a.did.clone(), b.did.clone()]);

        assert_eq!(wallet.get_local_did_for_verkey(&b.verkey).unwrap().did, b.did);
        assert!(matches!(
            wallet.get_local_did_for_verkey("nobody"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(wallet.get_local_did(""), Err(Error::NotFound(_))));
        assert!(matches!(
            wallet.get_local_did("missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_replace_local_did_metadata() {
        let wallet = Wallet::in_memory();
        let info = wallet
            .create_local_did(DidMethod::Sov, KeyType::Ed25519, None, None, None)
            .unwrap();
        wallet
            .replace_local_did_metadata(&info.did, metadata(json!({"public": true})))
            .unwrap();
        let updated = wallet.get_local_did(&info.did).unwrap();
        assert_eq!(updated.metadata, metadata(json!({"public": true})));
        assert_eq!(updated.verkey, info.verkey);

        assert!(matches!(
            wallet.replace_local_did_metadata("missing", Metadata::new()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_set_did_endpoint() {
        let wallet = Wallet::in_memory();
        let sov = wallet
            .create_local_did(DidMethod::Sov, KeyType::Ed25519, None, None, None)
            .unwrap();

        let updated = wallet
            .set_did_endpoint(&sov.did, Some("https://agent.example/endpoint"))
            .unwrap();
        assert_eq!(updated.endpoint(), Some("https://agent.example/endpoint"));
        assert_eq!(
            wallet.get_local_did(&sov.did).unwrap().endpoint(),
            Some("https://agent.example/endpoint")
        );

        let cleared = wallet.set_did_endpoint(&sov.did, None).unwrap();
        assert_eq!(cleared.endpoint(), None);

        let key_did = wallet
            .create_local_did(DidMethod::Key, KeyType::Ed25519, None, None, None)
            .unwrap();
        assert!(matches!(
            wallet.set_did_endpoint(&key_did.did, Some("https://x")),
            Err(Error::UnsupportedDidMethod(_))
        ));
    }

    #[test]
    fn test_sign_and_verify() {
        let wallet = Wallet::in_memory();
        let info = wallet.create_signing_key(KeyType::Ed25519, None, None).unwrap();

        let signature = wallet.sign_message(b"message", &info.verkey).unwrap();
        assert!(wallet
            .verify_message(b"message", signature.as_ref(), &info.verkey, KeyType::Ed25519)
            .unwrap());
        assert!(!wallet
            .verify_message(b"other", signature.as_ref(), &info.verkey, KeyType::Ed25519)
            .unwrap());
        assert!(!wallet
            .verify_message(b"message", &[0u8; 10], &info.verkey, KeyType::Ed25519)
            .unwrap());

        assert!(matches!(
            wallet.sign_message(b"", &info.verkey),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            wallet.sign_message(b"message", "unknown"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            wallet.verify_message(b"message", signature.as_ref(), "", KeyType::Ed25519),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            wallet.verify_message(b"message", signature.as_ref(), "bad!", KeyType::Ed25519),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_pack_unpack_between_wallets() {
        let alice = Wallet::in_memory();
        let bob = Wallet::in_memory();
        let alice_key = alice.create_signing_key(KeyType::Ed25519, None, None).unwrap();
        let bob_key = bob.create_signing_key(KeyType::Ed25519, None, None).unwrap();

        let packed = alice
            .pack_message(b"hello", &[&bob_key.verkey], Some(&alice_key.verkey))
            .unwrap();
        let unpacked = bob.unpack_message(&packed).unwrap();
        assert_eq!(unpacked.plaintext, b"hello");
        assert_eq!(unpacked.sender_verkey, Some(alice_key.verkey.clone()));
        assert_eq!(unpacked.recipient_verkey, bob_key.verkey);

        assert!(matches!(
            alice.unpack_message(&packed),
            Err(Error::NoMatchingKey)
        ));
    }

    #[test]
    fn test_pack_anoncrypt() {
        let wallet = Wallet::in_memory();
        let key = wallet.create_signing_key(KeyType::Ed25519, None, None).unwrap();
        let packed = Wallet::in_memory()
            .pack_message(b"hello", &[&key.verkey], None)
            .unwrap();
        let unpacked = wallet.unpack_message(&packed).unwrap();
        assert_eq!(unpacked.sender_verkey, None);
    }

    #[test]
    fn test_pack_errors() {
        let wallet = Wallet::in_memory();
        let key = wallet.create_signing_key(KeyType::Ed25519, None, None).unwrap();
        assert!(matches!(
            wallet.pack_message(b"hello", &[&key.verkey], Some("unknown")),
            Err(Error::NotFound(_))
        ));
        let none: [&str; 0] = [];
        assert!(matches!(
            wallet.pack_message(b"hello", &none, None),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            wallet.unpack_message(b""),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sqlite_wallet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = sqlite_wallet(&dir);
        let did = wallet
            .create_local_did(DidMethod::Sov, KeyType::Ed25519, None, None, None)
            .unwrap();

        let packed = Wallet::in_memory()
            .pack_message(b"persisted", &[&did.verkey], None)
            .unwrap();
        assert_eq!(wallet.unpack_message(&packed).unwrap().plaintext, b"persisted");
        assert_eq!(wallet.get_local_did_for_verkey(&did.verkey).unwrap(), did);
    }
}
