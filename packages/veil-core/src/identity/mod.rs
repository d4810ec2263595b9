//! # Identity Module
//!
//! DID methods, DID records and the public view of signing keys.
//!
//! ## Identity Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         IDENTITY MODEL                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  KeyInfo                                                               │
//! │  ───────                                                                │
//! │  verkey ─── key_type ─── metadata                                      │
//! │    │                                                                    │
//! │    │  (secret lives in the store, named by the verkey)                 │
//! │    ▼                                                                    │
//! │  DidInfo                                                               │
//! │  ───────                                                                │
//! │  did ─── method ─── verkey ─── key_type ─── metadata                   │
//! │                                               │                         │
//! │                                               └─ next_verkey?          │
//! │                                                  (rotation pending)    │
//! │                                                                         │
//! │  Stored under category "did", name = did,                              │
//! │  tags { method, verkey, verkey_type } for exact-match lookup.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## DID Methods
//!
//! | Method | Key types | Rotation | DID form |
//! |--------|-----------|----------|----------|
//! | `sov` | ed25519 | yes | base58(verkey[..16]) or caller-chosen |
//! | `key` | ed25519, bls12381g2 | no | `did:key:z…` derived from the key |

mod did;

pub use did::{sov_did_from_public_key, DidKey, DID_KEY_PREFIX};

use serde::{Deserialize, Serialize};

use crate::crypto::KeyType;
use crate::error::{Error, Result};

/// Metadata attached to keys and DIDs: always a JSON object
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Reserved metadata entry holding the verkey of a pending rotation
pub const NEXT_VERKEY: &str = "next_verkey";

/// Reserved metadata entry holding a DID's service endpoint
pub const ENDPOINT: &str = "endpoint";

// ============================================================================
// DID METHODS
// ============================================================================

/// DID methods the wallet can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DidMethod {
    /// Sovrin-style DIDs, ledger-anchored and rotatable
    Sov,
    /// `did:key`, derived from and bound to a single key
    Key,
}

impl DidMethod {
    /// Method name as stored in records and tags
    pub fn method_name(&self) -> &'static str {
        match self {
            DidMethod::Sov => "sov",
            DidMethod::Key => "key",
        }
    }

    /// Look a method up by name
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "sov" => Some(DidMethod::Sov),
            "key" => Some(DidMethod::Key),
            _ => None,
        }
    }

    /// Work out the method from a DID string
    ///
    /// An unqualified DID is a sov DID.
    pub fn from_did(did: &str) -> Result<Self> {
        if did.is_empty() {
            return Err(Error::InvalidDid("Empty DID".into()));
        }
        match did.strip_prefix("did:") {
            None => Ok(DidMethod::Sov),
            Some(rest) => {
                let name = rest.split(':').next().unwrap_or_default();
                let method = Self::from_method(name)
                    .ok_or_else(|| Error::UnsupportedDidMethod(name.to_string()))?;
                if method == DidMethod::Key {
                    DidKey::parse(did)?;
                }
                Ok(method)
            }
        }
    }

    /// Whether keys of `key_type` can back a DID of this method
    pub fn supports_key_type(&self, key_type: KeyType) -> bool {
        match self {
            DidMethod::Sov => key_type == KeyType::Ed25519,
            DidMethod::Key => matches!(key_type, KeyType::Ed25519 | KeyType::Bls12381G2),
        }
    }

    /// Whether the DID can be re-bound to a new key
    pub fn supports_rotation(&self) -> bool {
        matches!(self, DidMethod::Sov)
    }
}

impl std::fmt::Display for DidMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.method_name())
    }
}

impl std::str::FromStr for DidMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_method(s).ok_or_else(|| Error::UnsupportedDidMethod(s.to_string()))
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Public view of a signing keypair held by the wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Base58 public key, also the key's name in the store
    pub verkey: String,
    /// Caller-defined metadata
    #[serde(default)]
    pub metadata: Metadata,
    /// Key algorithm
    pub key_type: KeyType,
}

/// A DID held by the wallet
///
/// This is also the stored record value, so field names follow the record
/// layout (`verkey_type` for the key algorithm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidInfo {
    /// The DID string
    pub did: String,
    /// DID method
    pub method: DidMethod,
    /// Verkey the DID is currently bound to
    pub verkey: String,
    /// Algorithm of the bound key
    #[serde(rename = "verkey_type", default = "default_key_type")]
    pub key_type: KeyType,
    /// Caller-defined metadata; `next_verkey` is reserved for rotation
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_key_type() -> KeyType {
    KeyType::Ed25519
}

impl DidInfo {
    /// Verkey of a pending rotation, if one was started
    pub fn next_verkey(&self) -> Option<&str> {
        self.metadata.get(NEXT_VERKEY).and_then(|v| v.as_str())
    }

    /// Locally recorded service endpoint
    pub fn endpoint(&self) -> Option<&str> {
        self.metadata.get(ENDPOINT).and_then(|v| v.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
