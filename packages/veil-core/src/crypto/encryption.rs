//! # At-Rest Encryption
//!
//! AES-256-GCM protection of secret key material inside a store backend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     STORED SECRET LAYOUT                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   nonce (12 bytes) ‖ AES-256-GCM(store_key, secret, aad = key name)    │
//! │                                                                         │
//! │   Binding the key name as AAD stops one stored secret from being       │
//! │   swapped in under another verkey.                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the store key in bytes (256 bits)
pub const STORE_KEY_SIZE: usize = 32;

/// Key protecting secrets at rest
///
/// Zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct StoreKey([u8; STORE_KEY_SIZE]);

impl StoreKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; STORE_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a base58-encoded raw key, as given in configuration
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let decoded = Zeroizing::new(
            bs58::decode(encoded)
                .into_vec()
                .map_err(|e| Error::InvalidInput(format!("Invalid store key: {}", e)))?,
        );
        if decoded.len() != STORE_KEY_SIZE {
            return Err(Error::InvalidInput(format!(
                "Store key must be {} bytes, got {}",
                STORE_KEY_SIZE,
                decoded.len()
            )));
        }
        let mut key = Self([0u8; STORE_KEY_SIZE]);
        key.0.copy_from_slice(&decoded);
        Ok(key)
    }

    /// Generate a random key, returned base58-encoded for configuration
    pub fn generate_base58() -> String {
        let mut bytes = Zeroizing::new([0u8; STORE_KEY_SIZE]);
        rand::rngs::OsRng.fill_bytes(&mut bytes[..]);
        bs58::encode(&bytes[..]).into_string()
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| Error::CryptoError(format!("Invalid store key: {}", e)))
    }

    /// Encrypt `plaintext` bound to `name`
    ///
    /// Returns `nonce ‖ ciphertext_with_tag`.
    pub fn seal(&self, name: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()?
            .encrypt(
                AesNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: name.as_bytes(),
                },
            )
            .map_err(|_| Error::CryptoError("At-rest encryption failed".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt data produced by [`StoreKey::seal`] for the same `name`
    pub fn open(&self, name: &str, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if sealed.len() < NONCE_SIZE {
            return Err(Error::StoreError("Stored secret too short".into()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);

        self.cipher()?
            .decrypt(
                AesNonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: name.as_bytes(),
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| Error::StoreError("Stored secret failed authentication".into()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
