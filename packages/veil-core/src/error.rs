//! # Error Handling
//!
//! Error types shared by every Veil Core module.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Input Errors (100)                                                │
//! │  │   ├── InvalidInput          - Missing message/recipients/verkey     │
//! │  │   └── InvalidSeed           - Seed is not 32 bytes                  │
//! │  │                                                                      │
//! │  ├── Key & Identity Errors (200)                                       │
//! │  │   ├── InvalidKey            - Malformed public key bytes            │
//! │  │   ├── InvalidDid            - Malformed DID string                  │
//! │  │   ├── DuplicateKey          - Verkey already in the store           │
//! │  │   ├── DuplicateDid          - DID bound to another verkey           │
//! │  │   ├── NotFound              - Unknown verkey or DID                 │
//! │  │   ├── UnsupportedKeyType    - Key type cannot be used here          │
//! │  │   └── UnsupportedDidMethod  - DID method cannot be used here        │
//! │  │                                                                      │
//! │  ├── Envelope & Crypto Errors (300)                                    │
//! │  │   ├── InvalidEnvelope       - Structurally malformed wire data      │
//! │  │   ├── UnsupportedAlgorithm  - Unknown pack algorithm                │
//! │  │   ├── NoMatchingKey         - No local key for any recipient        │
//! │  │   ├── MissingSender         - Authcrypt without provable sender     │
//! │  │   ├── DecryptionFailed      - Authentication failure                │
//! │  │   ├── VerificationFailed    - Bad signature                         │
//! │  │   └── CryptoError           - Opaque primitive failure              │
//! │  │                                                                      │
//! │  ├── Storage Errors (400)                                              │
//! │  │   └── StoreError            - Opaque backend failure                │
//! │  │                                                                      │
//! │  ├── Rotation Errors (500)                                             │
//! │  │   ├── RotationNotSupported  - DID method cannot rotate              │
//! │  │   └── RotationNotStarted    - No pending next_verkey                │
//! │  │                                                                      │
//! │  └── Internal Errors (900)                                             │
//! │      └── SerializationError                                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `NoMatchingKey` and `DecryptionFailed` deliberately carry no payload: they
//! must not tell a caller which recipient entries were tried.

use thiserror::Error;

/// Result type alias for Veil Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Veil Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Input Errors (100-199)
    // ========================================================================

    /// A required argument was missing or empty
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A seed could not be turned into 32 bytes of key material
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    // ========================================================================
    // Key & Identity Errors (200-299)
    // ========================================================================

    /// Invalid key format or length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid DID format
    #[error("Invalid DID format: {0}")]
    InvalidDid(String),

    /// A key with this verkey already exists
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The DID is already present with a different verkey
    #[error("DID already present in wallet: {0}")]
    DuplicateDid(String),

    /// Unknown verkey, DID or record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Key type not usable for the requested operation
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// DID method not usable for the requested operation
    #[error("Unsupported DID method: {0}")]
    UnsupportedDidMethod(String),

    // ========================================================================
    // Envelope & Crypto Errors (300-399)
    // ========================================================================

    /// Envelope could not be decoded
    #[error("Invalid packed message: {0}")]
    InvalidEnvelope(String),

    /// Protected header names an algorithm we do not unpack
    #[error("Unsupported pack algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// None of the listed recipients has a key in this wallet
    #[error("No corresponding recipient key found")]
    NoMatchingKey,

    /// Authcrypt envelope whose sender could not be established
    #[error("Sender public key not provided for Authcrypt message")]
    MissingSender,

    /// Payload or key authentication failed
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Signature verification failed
    #[error("Signature verification failed")]
    VerificationFailed,

    /// A cryptographic primitive failed
    #[error("Cryptographic operation failed: {0}")]
    CryptoError(String),

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// The key/record store failed
    #[error("Store error: {0}")]
    StoreError(String),

    // ========================================================================
    // Rotation Errors (500-599)
    // ========================================================================

    /// The DID method has no key rotation
    #[error("DID method '{0}' does not support key rotation")]
    RotationNotSupported(String),

    /// `apply` was called without a pending `next_verkey`
    #[error("Cannot rotate DID key: no next key established for {0}")]
    RotationNotStarted(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Input
    /// - 200-299: Keys & identity
    /// - 300-399: Envelope & crypto
    /// - 400-499: Storage
    /// - 500-599: Rotation
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Input (100-199)
            Error::InvalidInput(_) => 100,
            Error::InvalidSeed(_) => 101,

            // Keys & identity (200-299)
            Error::InvalidKey(_) => 200,
            Error::InvalidDid(_) => 201,
            Error::DuplicateKey(_) => 202,
            Error::DuplicateDid(_) => 203,
            Error::NotFound(_) => 204,
            Error::UnsupportedKeyType(_) => 205,
            Error::UnsupportedDidMethod(_) => 206,

            // Envelope & crypto (300-399)
            Error::InvalidEnvelope(_) => 300,
            Error::UnsupportedAlgorithm(_) => 301,
            Error::NoMatchingKey => 302,
            Error::MissingSender => 303,
            Error::DecryptionFailed => 304,
            Error::VerificationFailed => 305,
            Error::CryptoError(_) => 306,

            // Storage (400-499)
            Error::StoreError(_) => 400,

            // Rotation (500-599)
            Error::RotationNotSupported(_) => 500,
            Error::RotationNotStarted(_) => 501,

            // Internal (900-999)
            Error::SerializationError(_) => 900,
        }
    }

    /// Whether this error is a duplicate-key conflict
    ///
    /// DID creation and rotation treat this as a benign race.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::DuplicateKey(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StoreError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::InvalidInput(format!("Invalid base64: {}", err))
    }
}

impl From<bs58::decode::Error> for Error {
    fn from(err: bs58::decode::Error) -> Self {
        Error::InvalidKey(format!("Invalid base58: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================
