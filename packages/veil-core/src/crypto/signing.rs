//! # Digital Signatures
//!
//! Ed25519 signatures made with wallet keys and checked against verkeys.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sign(LocalKey, message)            → 64-byte signature                 │
//! │  verify(verkey, message, signature) → Ok(()) / VerificationFailed       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Signatures are deterministic: the same key and message always give the
//! same bytes.

use ed25519_dalek::{Signature as Ed25519Signature, Verifier};

use super::keys::{verifying_key, LocalKey};
use crate::error::{Error, Result};

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// An Ed25519 signature
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (must be exactly 64 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != SIGNATURE_SIZE {
            return Err(Error::InvalidInput(format!(
                "Signature must be {} bytes, got {}",
                SIGNATURE_SIZE,
                slice.len()
            )));
        }
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Sign a message with a wallet key
pub fn sign(key: &LocalKey, message: &[u8]) -> Signature {
    Signature(key.sign(message))
}

/// Verify a signature against a verkey
///
/// `InvalidKey` if the verkey is malformed, `VerificationFailed` if the
/// signature does not match.
pub fn verify(verkey: &str, message: &[u8], signature: &Signature) -> Result<()> {
    let verifying = verifying_key(verkey)?;
    let sig = Ed25519Signature::from_bytes(&signature.0);
    verifying
        .verify(message, &sig)
        .map_err(|_| Error::VerificationFailed)
}
