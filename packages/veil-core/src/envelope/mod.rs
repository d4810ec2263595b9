//! # Envelope Module
//!
//! Multi-recipient encrypted envelopes: one symmetric encryption of the
//! message, plus one wrapped copy of the content key per recipient.
//!
//! ## Envelope Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ENVELOPE (JSON)                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  protected   base64url({"enc":"xchacha20poly1305_ietf",                │
//! │                          "typ":"JWM/1.0",                               │
//! │                          "alg":"Authcrypt" | "Anoncrypt"})              │
//! │              (this exact text is the AEAD associated data)             │
//! │                                                                         │
//! │  recipients  [                                                         │
//! │                { encrypted_key: wrapped CEK,                           │
//! │                  header: { kid:    recipient verkey,                   │
//! │                            sender: sealed sender verkey  (auth only)   │
//! │                            iv:     box nonce             (auth only) } │
//! │                },                                                       │
//! │                ...                                                      │
//! │              ]                                                          │
//! │                                                                         │
//! │  iv          24-byte payload nonce                                     │
//! │  ciphertext  XChaCha20-Poly1305(CEK, plaintext)                        │
//! │  tag         16-byte Poly1305 tag                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Binary fields are base64url without padding.
//!
//! ## Modes
//!
//! | Mode | CEK wrapping | Sender visible to |
//! |------|--------------|-------------------|
//! | Anoncrypt | sealed box | nobody |
//! | Authcrypt | authenticated box + sealed sender | each recipient only |

mod codec;
mod pack;
mod unpack;

pub use codec::{decode, encode};
pub use pack::{pack, pack_envelope};
pub use unpack::{unpack, Unpacked};

use serde::{Deserialize, Serialize};

use crate::crypto::{CONTENT_ALGORITHM, TAG_SIZE};
use crate::error::{Error, Result};

/// Envelope format identifier carried in `protected.typ`
pub const ENVELOPE_TYPE: &str = "JWM/1.0";

/// Whether an envelope proves its sender to recipients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackMode {
    /// Sender authenticated to each recipient
    Authcrypt,
    /// No sender information at all
    Anoncrypt,
}

impl PackMode {
    /// Name used in `protected.alg`
    pub fn as_str(&self) -> &'static str {
        match self {
            PackMode::Authcrypt => "Authcrypt",
            PackMode::Anoncrypt => "Anoncrypt",
        }
    }
}

impl std::str::FromStr for PackMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Authcrypt" => Ok(PackMode::Authcrypt),
            "Anoncrypt" => Ok(PackMode::Anoncrypt),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// The protected header
///
/// Field order here is the serialization order, which fixes the AAD bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    /// Payload algorithm
    pub enc: String,
    /// Envelope format
    pub typ: String,
    /// Pack mode name; unknown values are kept so unpack can report them
    pub alg: String,
}

impl ProtectedHeader {
    /// Header for a freshly packed envelope
    pub fn new(mode: PackMode) -> Self {
        Self {
            enc: CONTENT_ALGORITHM.to_string(),
            typ: ENVELOPE_TYPE.to_string(),
            alg: mode.as_str().to_string(),
        }
    }

    /// Pack mode, if `alg` names a known one
    pub fn mode(&self) -> Result<PackMode> {
        self.alg.parse()
    }
}

/// Per-recipient header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientHeader {
    /// Recipient verkey
    pub kid: String,
    /// Sender verkey sealed to this recipient (Authcrypt)
    pub sender: Option<Vec<u8>>,
    /// Nonce used to box the CEK (Authcrypt)
    pub iv: Option<Vec<u8>>,
}

/// One recipient entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// CEK wrapped for this recipient
    pub encrypted_key: Vec<u8>,
    /// Recipient header
    pub header: RecipientHeader,
}

/// A decoded envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// base64url text of the protected header, exactly as on the wire
    pub protected: String,
    /// Parsed protected header
    pub header: ProtectedHeader,
    /// Recipient entries, in wire order; never empty
    pub recipients: Vec<Recipient>,
    /// Payload nonce
    pub iv: Vec<u8>,
    /// Payload ciphertext without the tag
    pub ciphertext: Vec<u8>,
    /// Payload authentication tag
    pub tag: [u8; TAG_SIZE],
}

impl Envelope {
    /// Associated data authenticated by the payload AEAD
    pub fn aad(&self) -> &[u8] {
        self.protected.as_bytes()
    }

    /// Ciphertext with the tag appended, as the AEAD expects it
    pub(crate) fn sealed_payload(&self) -> Vec<u8> {
        let mut sealed = Vec::with_capacity(self.ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(&self.ciphertext);
        sealed.extend_from_slice(&self.tag);
        sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_mode_names() {
        assert_eq!("Authcrypt".parse::<PackMode>().unwrap(), PackMode::Authcrypt);
        assert_eq!("Anoncrypt".parse::<PackMode>().unwrap(), PackMode::Anoncrypt);
        assert!(matches!(
            "ECDH-1PU".parse::<PackMode>(),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_protected_header_field_order() {
        let json = serde_json::to_string(&ProtectedHeader::new(PackMode::Anoncrypt)).unwrap();
        assert_eq!(
            json,
            r#"{"enc":"xchacha20poly1305_ietf","typ":"JWM/1.0","alg":"Anoncrypt"}"#
        );
    }
}
