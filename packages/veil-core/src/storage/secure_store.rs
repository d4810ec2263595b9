//! # Secure Key Storage
//!
//! How secret key bytes are written into, and read back out of, a backend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KEY STORAGE SECURITY                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Without a store key:   secret bytes stored as-is                      │
//! │                                                                         │
//! │  With a store key:      nonce ‖ AES-256-GCM(secret, aad = verkey)      │
//! │                                                                         │
//! │  • A sealed secret only opens under the verkey it was stored as        │
//! │  • Decrypted bytes are zeroized once the LocalKey is rebuilt           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::crypto::{LocalKey, StoreKey};
use crate::error::Result;

/// Seals secret key bytes for storage
pub struct KeySealer {
    store_key: Option<StoreKey>,
}

impl KeySealer {
    /// Create a sealer; `None` stores secrets unencrypted
    pub fn new(store_key: Option<StoreKey>) -> Self {
        Self { store_key }
    }

    /// Whether secrets are encrypted at rest
    pub fn is_encrypted(&self) -> bool {
        self.store_key.is_some()
    }

    /// Bytes to store for `key` under `name`
    pub fn protect(&self, name: &str, key: &LocalKey) -> Result<Vec<u8>> {
        let secret = key.secret_bytes();
        match &self.store_key {
            Some(store_key) => store_key.seal(name, &secret[..]),
            None => Ok(secret.to_vec()),
        }
    }

    /// Rebuild the key stored under `name`
    pub fn recover(&self, name: &str, stored: &[u8]) -> Result<LocalKey> {
        match &self.store_key {
            Some(store_key) => LocalKey::from_secret_bytes(&store_key.open(name, stored)?),
            None => LocalKey::from_secret_bytes(stored),
        }
    }
}

impl Default for KeySealer {
    fn default() -> Self {
        Self::new(None)
    }
}

// ============================================================================
// TESTS
// ============================================================================
