//! # Cryptography Module
//!
//! All cryptographic primitives used by Veil Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Identity Keys                                                         │
//! │  ─────────────                                                          │
//! │  Ed25519 signing key (LocalKey) ── verkey = base58(public key)         │
//! │         │                                                               │
//! │         └──► X25519 form for key agreement (birational map)            │
//! │                                                                         │
//! │  Envelope                                                              │
//! │  ────────                                                               │
//! │  CEK (random, per message)                                             │
//! │    ├──► wrapped per recipient: sealed box   (Anoncrypt)                │
//! │    │                           crypto box   (Authcrypt)                │
//! │    └──► XChaCha20-Poly1305(plaintext, aad = protected header)          │
//! │                                                                         │
//! │  Storage                                                               │
//! │  ───────                                                                │
//! │  AES-256-GCM(store key, secret key bytes, aad = key name)              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Crate |
//! |-----------|---------|-------|
//! | Ed25519 | Signing, identity | `ed25519-dalek` |
//! | X25519 + XSalsa20-Poly1305 | CEK wrapping | `crypto_box` |
//! | XChaCha20-Poly1305 | Payload | `chacha20poly1305` |
//! | AES-256-GCM | Secrets at rest | `aes-gcm` |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: secret keys, converted X25519 secrets and CEKs
//!    are zeroized when dropped
//! 2. **Constant-Time Operations**: dalek and RustCrypto implementations
//! 3. **Secure Random**: `rand::rngs::OsRng` for keys and nonces
//! 4. **No Nonce Reuse**: every nonce is freshly random

mod encryption;
mod keys;
mod nacl;
mod payload;
mod signing;

pub use encryption::{StoreKey, STORE_KEY_SIZE};
pub use keys::{
    bytes_to_verkey, validate_seed, verifying_key, verkey_to_bytes, KeyType, LocalKey, SEED_SIZE,
    VERKEY_SIZE,
};
pub use payload::{ContentKey, CEK_SIZE, CONTENT_ALGORITHM, PAYLOAD_NONCE_SIZE, TAG_SIZE};
pub use signing::{sign, verify, Signature, SIGNATURE_SIZE};

pub(crate) use keys::verkey_to_x25519;
pub(crate) use nacl::{box_random_nonce, open_box, seal, seal_box, seal_open};
