//! # Veil Core
//!
//! Key management, DIDs and encrypted message envelopes for identity
//! agents.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          VEIL CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │                           Wallet                                  │ │
//! │  │  - Signing keys     - Local DIDs      - Key rotation              │ │
//! │  │  - Sign / verify    - Pack / unpack                               │ │
//! │  └─────────┬──────────────────┬──────────────────────┬──────────────┘ │
//! │            │                  │                      │                 │
//! │  ┌─────────▼──────┐  ┌────────▼────────┐  ┌──────────▼──────────────┐ │
//! │  │   Identity     │  │    Envelope     │  │        Storage          │ │
//! │  │                │  │                 │  │                         │ │
//! │  │ - DID methods  │  │ - Authcrypt     │  │ - Memory / SQLite       │ │
//! │  │ - did:key      │  │ - Anoncrypt     │  │ - Sessions + locks      │ │
//! │  │ - DID records  │  │ - JSON codec    │  │ - Encrypted secrets     │ │
//! │  └────────────────┘  └────────┬────────┘  └──────────┬──────────────┘ │
//! │                               │                      │                 │
//! │  ┌────────────────────────────▼──────────────────────▼──────────────┐ │
//! │  │                            Crypto                                │ │
//! │  │  - Ed25519 keys   - NaCl boxes   - XChaCha20-Poly1305   - AES-GCM│ │
//! │  └──────────────────────────────────────────────────────────────────┘ │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Keys, signatures, boxes and payload encryption
//! - [`identity`] - DID methods and DID/key records
//! - [`envelope`] - Packing and unpacking multi-recipient envelopes
//! - [`storage`] - Key and record stores
//! - [`wallet`] - The operations agents call
//!
//! ## Example
//!
//! ```no_run
//! use veil_core::{KeyType, Wallet};
//!
//! # fn main() -> veil_core::Result<()> {
//! let alice = Wallet::in_memory();
//! let bob = Wallet::in_memory();
//! let a = alice.create_signing_key(KeyType::Ed25519, None, None)?;
//! let b = bob.create_signing_key(KeyType::Ed25519, None, None)?;
//!
//! let packed = alice.pack_message(b"hello", &[&b.verkey], Some(&a.verkey))?;
//! let unpacked = bob.unpack_message(&packed)?;
//! assert_eq!(unpacked.sender_verkey.as_deref(), Some(a.verkey.as_str()));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod storage;
pub mod wallet;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{KeyType, LocalKey, Signature};
pub use envelope::{PackMode, Unpacked};
pub use error::{Error, Result};
pub use identity::{DidInfo, DidMethod, KeyInfo, Metadata};
pub use storage::StorageConfig;
pub use wallet::{RotationState, Wallet, WalletConfig};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Veil Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
