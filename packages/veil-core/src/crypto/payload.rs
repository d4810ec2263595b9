//! # Payload Encryption
//!
//! XChaCha20-Poly1305 (IETF) encryption of envelope payloads under a
//! per-message content-encryption key (CEK).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  XChaCha20-Poly1305(                                                   │
//! │    key   = CEK (32 random bytes, never stored)                         │
//! │    nonce = 24 random bytes                                             │
//! │    msg   = plaintext                                                   │
//! │    aad   = base64url(protected header)                                 │
//! │  )                                                                     │
//! │           ↓                                                             │
//! │  ciphertext ‖ 16-byte tag                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A 192-bit nonce makes random nonces safe without a counter.

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Name of the payload algorithm as carried in the protected header
pub const CONTENT_ALGORITHM: &str = "xchacha20poly1305_ietf";

/// Size of the content-encryption key in bytes
pub const CEK_SIZE: usize = 32;

/// Size of the payload nonce in bytes
pub const PAYLOAD_NONCE_SIZE: usize = 24;

/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// A per-message content-encryption key
///
/// Zeroized when dropped.
pub struct ContentKey(Zeroizing<[u8; CEK_SIZE]>);

impl ContentKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; CEK_SIZE]);
        OsRng.fill_bytes(&mut bytes[..]);
        Self(bytes)
    }

    /// Rebuild a key unwrapped from a recipient entry
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CEK_SIZE {
            return Err(Error::DecryptionFailed);
        }
        let mut key = Zeroizing::new([0u8; CEK_SIZE]);
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Raw key bytes, for wrapping to recipients
    pub(crate) fn as_bytes(&self) -> &[u8; CEK_SIZE] {
        &self.0
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.0[..]))
    }

    /// Encrypt `plaintext`, authenticating `aad`
    ///
    /// Returns the random nonce and `ciphertext ‖ tag`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<([u8; PAYLOAD_NONCE_SIZE], Vec<u8>)> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, Payload { msg: plaintext, aad })
            .map_err(|_| Error::CryptoError("Payload encryption failed".into()))?;

        let mut nonce_bytes = [0u8; PAYLOAD_NONCE_SIZE];
        nonce_bytes.copy_from_slice(&nonce);
        Ok((nonce_bytes, ciphertext))
    }

    /// Decrypt `ciphertext ‖ tag`, checking `aad`
    ///
    /// Any authentication failure yields `DecryptionFailed` and no output.
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if nonce.len() != PAYLOAD_NONCE_SIZE {
            return Err(Error::DecryptionFailed);
        }
        self.cipher()
            .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|_| Error::DecryptionFailed)
    }
}
