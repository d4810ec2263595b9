//! # DID Derivation
//!
//! How a DID string is derived from a verkey, for each supported method.
//!
//! ## did:key
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DID:KEY FORMAT                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Example: did:key:z6MkhaXgBZDvotDUGRy7K9L7M2yvCpREH5...                │
//! │                                                                         │
//! │  ┌─────────┬──────────────────────────────────────────────────────┐    │
//! │  │   z     │  Base58btc encoding indicator (multibase)            │    │
//! │  ├─────────┼──────────────────────────────────────────────────────┤    │
//! │  │  6Mk    │  Ed25519 public key multicodec prefix (0xed01)       │    │
//! │  ├─────────┼──────────────────────────────────────────────────────┤    │
//! │  │  ...    │  32-byte Ed25519 public key (base58btc encoded)      │    │
//! │  └─────────┴──────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## sov
//!
//! An unqualified sov DID is the base58 encoding of the first 16 bytes of the
//! verkey, unless the caller names the DID explicitly.

use crate::crypto::{KeyType, VERKEY_SIZE};
use crate::error::{Error, Result};

/// The DID method prefix for did:key
pub const DID_KEY_PREFIX: &str = "did:key:";

/// Multicodec prefix for Ed25519 public keys (0xed01 in varint encoding)
const ED25519_MULTICODEC_PREFIX: [u8; 2] = [0xed, 0x01];

/// Number of verkey bytes that make up a sov DID
const SOV_DID_BYTES: usize = 16;

/// A `did:key` identifier for an Ed25519 key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DidKey {
    value: String,
}

impl DidKey {
    /// Build the did:key of a public key
    ///
    /// Only Ed25519 has a multicodec mapping here.
    pub fn from_public_key(public_key: &[u8; VERKEY_SIZE], key_type: KeyType) -> Result<Self> {
        if key_type != KeyType::Ed25519 {
            return Err(Error::UnsupportedKeyType(format!(
                "No did:key encoding for {}",
                key_type
            )));
        }

        let mut multicodec_key = Vec::with_capacity(ED25519_MULTICODEC_PREFIX.len() + VERKEY_SIZE);
        multicodec_key.extend_from_slice(&ED25519_MULTICODEC_PREFIX);
        multicodec_key.extend_from_slice(public_key);

        Ok(Self {
            value: format!(
                "{}z{}",
                DID_KEY_PREFIX,
                bs58::encode(&multicodec_key).into_string()
            ),
        })
    }

    /// Parse and validate a did:key string
    pub fn parse(did_string: &str) -> Result<Self> {
        let identifier = did_string.strip_prefix(DID_KEY_PREFIX).ok_or_else(|| {
            Error::InvalidDid(format!(
                "DID must start with '{}', got '{}'",
                DID_KEY_PREFIX, did_string
            ))
        })?;

        let encoded = identifier.strip_prefix('z').ok_or_else(|| {
            Error::InvalidDid("DID identifier must start with 'z' (base58btc)".into())
        })?;

        let decoded = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| Error::InvalidDid(format!("Invalid base58btc encoding: {}", e)))?;

        if decoded.len() != ED25519_MULTICODEC_PREFIX.len() + VERKEY_SIZE {
            return Err(Error::InvalidDid(format!(
                "Invalid public key length: expected 34 bytes (2 prefix + 32 key), got {}",
                decoded.len()
            )));
        }
        if decoded[..2] != ED25519_MULTICODEC_PREFIX {
            return Err(Error::InvalidDid(format!(
                "Invalid multicodec prefix: expected Ed25519 (0xed01), got {:02x}{:02x}",
                decoded[0], decoded[1]
            )));
        }

        Ok(Self {
            value: did_string.to_string(),
        })
    }

    /// Extract the public key from this DID
    #[cfg(test)]
    pub(crate) fn public_key(&self) -> Result<[u8; VERKEY_SIZE]> {
        let encoded = &self.value[DID_KEY_PREFIX.len() + 1..];
        let decoded = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| Error::InvalidDid(format!("Invalid base58btc encoding: {}", e)))?;

        decoded[ED25519_MULTICODEC_PREFIX.len()..]
            .try_into()
            .map_err(|_| Error::InvalidDid("Invalid public key length".into()))
    }

    /// Get the full DID string
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume into the DID string
    pub fn into_string(self) -> String {
        self.value
    }
}

impl std::fmt::Display for DidKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl std::str::FromStr for DidKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Default sov DID for a public key
pub fn sov_did_from_public_key(public_key: &[u8; VERKEY_SIZE]) -> String {
    bs58::encode(&public_key[..SOV_DID_BYTES]).into_string()
}

// ============================================================================
// TESTS
// ============================================================================
