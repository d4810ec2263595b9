//! # Key Management
//!
//! Signing keypairs held by the wallet and the public identifiers (verkeys)
//! that name them.
//!
//! ## Key Forms
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY FORMS                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  LocalKey (Ed25519 signing key, secret)                                │
//! │  ───────────────────────────────────────                                │
//! │  • Lives only as long as one operation needs it                        │
//! │  • Zeroized on drop, raw bytes never leave the crate                   │
//! │         │                                                               │
//! │         ├──► public bytes ──► base58 ──► verkey (text identifier)      │
//! │         │                                                               │
//! │         └──► SHA-512(seed)[..32] ──► X25519 secret (key agreement)    │
//! │                                                                         │
//! │  Verkey (Ed25519 public key, shared)                                   │
//! │  ────────────────────────────────────                                   │
//! │         base58 ──► Edwards point ──► Montgomery u ──► X25519 public    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The Edwards→Montgomery map is what lets a signing identity receive
//! NaCl boxes without publishing a second key.

use base64::Engine;
use crypto_box::{PublicKey as BoxPublicKey, SecretKey as BoxSecretKey};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Size of a raw public key (and of an Ed25519 secret seed) in bytes
pub const VERKEY_SIZE: usize = 32;

/// Size of a seed accepted by key generation
pub const SEED_SIZE: usize = 32;

/// Key algorithms known to the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    /// Ed25519 signing keys; the only type usable in envelopes
    Ed25519,
    /// BLS12-381 G2 keys, recognised in records but not generated here
    Bls12381G2,
}

impl KeyType {
    /// Stable name used in stored records and tags
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::Bls12381G2 => "bls12381g2",
        }
    }

    /// Parse a stored key type name
    pub fn from_key_type(name: &str) -> Option<Self> {
        match name {
            "ed25519" => Some(KeyType::Ed25519),
            "bls12381g2" => Some(KeyType::Bls12381G2),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key_type(s).ok_or_else(|| Error::UnsupportedKeyType(s.to_string()))
    }
}

/// Opaque handle to a secret signing key owned by the store
///
/// The only things a caller can do with it are read its public half, sign,
/// and hand it to the envelope protocol. The secret is zeroized on drop.
pub struct LocalKey {
    secret: SigningKey,
}

impl LocalKey {
    /// Create a new keypair, from a seed if one is given
    ///
    /// For Ed25519 the seed is the secret key itself, so the same seed
    /// always yields the same verkey.
    pub fn generate(key_type: KeyType, seed: Option<&str>) -> Result<Self> {
        if key_type != KeyType::Ed25519 {
            return Err(Error::UnsupportedKeyType(format!(
                "Cannot generate {} keys",
                key_type
            )));
        }

        match seed {
            Some(seed) if !seed.is_empty() => {
                let bytes = validate_seed(seed)?;
                Ok(Self {
                    secret: SigningKey::from_bytes(&bytes),
                })
            }
            _ => Ok(Self {
                secret: SigningKey::generate(&mut OsRng),
            }),
        }
    }

    /// Rebuild a handle from stored secret bytes
    pub(crate) fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: Zeroizing<[u8; VERKEY_SIZE]> = Zeroizing::new(
            bytes
                .try_into()
                .map_err(|_| Error::InvalidKey("Stored secret key has wrong length".into()))?,
        );
        Ok(Self {
            secret: SigningKey::from_bytes(&bytes),
        })
    }

    /// Secret bytes for persisting into a store backend
    pub(crate) fn secret_bytes(&self) -> Zeroizing<[u8; VERKEY_SIZE]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Algorithm of this key
    pub fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    /// Raw public key bytes
    pub fn public_bytes(&self) -> [u8; VERKEY_SIZE] {
        self.secret.verifying_key().to_bytes()
    }

    /// Base58 verkey naming this key
    pub fn verkey(&self) -> String {
        bytes_to_verkey(&self.public_bytes())
    }

    /// Sign a message, returning the 64-byte Ed25519 signature
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.secret.sign(message).to_bytes()
    }

    /// Key-agreement (X25519) form of the secret
    ///
    /// The returned key zeroizes itself on drop.
    pub(crate) fn to_x25519(&self) -> BoxSecretKey {
        let scalar = Zeroizing::new(self.secret.to_scalar_bytes());
        BoxSecretKey::from(*scalar)
    }
}

impl std::fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKey")
            .field("verkey", &self.verkey())
            .finish_non_exhaustive()
    }
}

/// Encode raw public key bytes as a verkey
pub fn bytes_to_verkey(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode a verkey into raw public key bytes
pub fn verkey_to_bytes(verkey: &str) -> Result<[u8; VERKEY_SIZE]> {
    if verkey.is_empty() {
        return Err(Error::InvalidKey("Empty verkey".into()));
    }
    let bytes = bs58::decode(verkey).into_vec()?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        Error::InvalidKey(format!(
            "Verkey must decode to {} bytes, got {}",
            VERKEY_SIZE, len
        ))
    })
}

/// Parse a verkey as an Ed25519 verifying key
pub fn verifying_key(verkey: &str) -> Result<VerifyingKey> {
    let bytes = verkey_to_bytes(verkey)?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| Error::InvalidKey(format!("Invalid Ed25519 public key: {}", e)))
}

/// Key-agreement (X25519) form of a verkey
pub(crate) fn verkey_to_x25519(verkey: &str) -> Result<BoxPublicKey> {
    let verifying = verifying_key(verkey)?;
    Ok(BoxPublicKey::from(verifying.to_montgomery().to_bytes()))
}

/// Turn a caller-supplied seed into 32 bytes of key material
///
/// A seed containing `=` is read as standard base64; anything else is used
/// as its raw UTF-8 bytes. Either way the result must be exactly 32 bytes.
pub fn validate_seed(seed: &str) -> Result<Zeroizing<[u8; SEED_SIZE]>> {
    let raw: Zeroizing<Vec<u8>> = if seed.contains('=') {
        Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(seed)
                .map_err(|e| Error::InvalidSeed(format!("Invalid base64 seed: {}", e)))?,
        )
    } else {
        Zeroizing::new(seed.as_bytes().to_vec())
    };

    if raw.len() != SEED_SIZE {
        return Err(Error::InvalidSeed(format!(
            "Seed value must be {} bytes in length",
            SEED_SIZE
        )));
    }

    let mut bytes = Zeroizing::new([0u8; SEED_SIZE]);
    bytes.copy_from_slice(&raw);
    Ok(bytes)
}

// ============================================================================
// TESTS
// ============================================================================
