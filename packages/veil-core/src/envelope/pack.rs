//! Envelope packing.
//!
//! ```text
//! plaintext ──► XChaCha20-Poly1305(CEK, aad = protected) ──► iv, ciphertext, tag
//!
//! CEK ──┬──► recipient 1: seal(X1, CEK)                       (Anoncrypt)
//!       │                 box(X1, sender_x, CEK, nonce1)      (Authcrypt)
//!       │                 + seal(X1, sender verkey)
//!       ├──► recipient 2: ...
//!       └──► ...
//! ```

use tracing::debug;

use super::codec::{encode, encode_protected};
use super::{Envelope, PackMode, ProtectedHeader, Recipient, RecipientHeader};
use crate::crypto::{
    box_random_nonce, seal, seal_box, verkey_to_x25519, ContentKey, LocalKey, TAG_SIZE,
};
use crate::error::{Error, Result};

/// Pack `plaintext` for `recipient_verkeys`, returning the wire envelope
///
/// With a `sender` key the envelope is Authcrypt and each recipient learns
/// the sender's verkey; without one it is Anoncrypt.
pub fn pack<S: AsRef<str>>(
    plaintext: &[u8],
    recipient_verkeys: &[S],
    sender: Option<&LocalKey>,
) -> Result<Vec<u8>> {
    encode(&pack_envelope(plaintext, recipient_verkeys, sender)?)
}

/// Pack into a structured [`Envelope`] without serializing it
pub fn pack_envelope<S: AsRef<str>>(
    plaintext: &[u8],
    recipient_verkeys: &[S],
    sender: Option<&LocalKey>,
) -> Result<Envelope> {
    if recipient_verkeys.is_empty() {
        return Err(Error::InvalidInput("No message recipients".into()));
    }

    let mode = if sender.is_some() {
        PackMode::Authcrypt
    } else {
        PackMode::Anoncrypt
    };
    debug!(
        mode = mode.as_str(),
        recipients = recipient_verkeys.len(),
        "Packing message"
    );

    let cek = ContentKey::generate();

    // Converted once; zeroized when this scope ends
    let sender_keys = sender.map(|key| (key.to_x25519(), key.verkey()));

    let mut recipients = Vec::with_capacity(recipient_verkeys.len());
    for verkey in recipient_verkeys {
        let verkey = verkey.as_ref();
        let recipient_x = verkey_to_x25519(verkey)?;

        let recipient = match &sender_keys {
            None => Recipient {
                encrypted_key: seal(&recipient_x, cek.as_bytes())?,
                header: RecipientHeader {
                    kid: verkey.to_string(),
                    sender: None,
                    iv: None,
                },
            },
            Some((sender_x, sender_verkey)) => {
                let nonce = box_random_nonce();
                Recipient {
                    encrypted_key: seal_box(&recipient_x, sender_x, cek.as_bytes(), &nonce)?,
                    header: RecipientHeader {
                        kid: verkey.to_string(),
                        sender: Some(seal(&recipient_x, sender_verkey.as_bytes())?),
                        iv: Some(nonce.to_vec()),
                    },
                }
            }
        };
        recipients.push(recipient);
    }

    let header = ProtectedHeader::new(mode);
    let protected = encode_protected(&header)?;

    let (iv, mut ciphertext) = cek.encrypt(plaintext, protected.as_bytes())?;
    let split = ciphertext
        .len()
        .checked_sub(TAG_SIZE)
        .ok_or_else(|| Error::CryptoError("AEAD output shorter than its tag".into()))?;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&ciphertext[split..]);
    ciphertext.truncate(split);

    Ok(Envelope {
        protected,
        header,
        recipients,
        iv: iv.to_vec(),
        ciphertext,
        tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyType;
    use crate::envelope::decode;

    fn key() -> LocalKey {
        LocalKey::generate(KeyType::Ed25519, None).unwrap()
    }

    #[test]
    fn test_anoncrypt_two_recipients() {
        let (a, b) = (key(), key());
        let bytes = pack(b"hello", &[a.verkey(), b.verkey()], None).unwrap();
        let envelope = decode(&bytes).unwrap();

        assert_eq!(envelope.header.mode().unwrap(), PackMode::Anoncrypt);
        assert_eq!(envelope.recipients.len(), 2);
        assert_eq!(envelope.recipients[0].header.kid, a.verkey());
        assert_eq!(envelope.recipients[1].header.kid, b.verkey());
        for recipient in &envelope.recipients {
            assert!(recipient.header.sender.is_none());
            assert!(recipient.header.iv.is_none());
        }

        let wire: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        for recipient in wire["recipients"].as_array().unwrap() {
            let header = recipient["header"].as_object().unwrap();
            assert_eq!(header.len(), 1);
        }
    }

    #[test]
    fn test_authcrypt_entries_carry_sender_and_iv() {
        let sender = key();
        let recipient = key();
        let envelope = pack_envelope(b"hello", &[recipient.verkey()], Some(&sender)).unwrap();

        assert_eq!(envelope.header.mode().unwrap(), PackMode::Authcrypt);
        let header = &envelope.recipients[0].header;
        assert!(header.sender.is_some());
        assert_eq!(header.iv.as_ref().map(Vec::len), Some(24));
        // The sender verkey never appears in clear
        let wire = String::from_utf8(encode(&envelope).unwrap()).unwrap();
        assert!(!wire.contains(&sender.verkey()));
    }

    #[test]
    fn test_duplicate_recipients_kept_in_order() {
        let (a, b) = (key(), key());
        let envelope =
            pack_envelope(b"x", &[a.verkey(), b.verkey(), a.verkey()], None).unwrap();
        let kids: Vec<_> = envelope
            .recipients
            .iter()
            .map(|r| r.header.kid.clone())
            .collect();
        assert_eq!(kids, vec![a.verkey(), b.verkey(), a.verkey()]);
    }

    #[test]
    fn test_tag_split_from_ciphertext() {
        let envelope = pack_envelope(b"hello", &[key().verkey()], None).unwrap();
        assert_eq!(envelope.ciphertext.len(), 5);
        assert_eq!(envelope.iv.len(), 24);
    }

    #[test]
    fn test_empty_plaintext_allowed() {
        let envelope = pack_envelope(b"", &[key().verkey()], None).unwrap();
        assert!(envelope.ciphertext.is_empty());
    }

    #[test]
    fn test_no_recipients() {
        let empty: [String; 0] = [];
        assert!(matches!(
            pack(b"hello", &empty, None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_recipient_verkey() {
        assert!(matches!(
            pack(b"hello", &["not-a-verkey"], None),
            Err(Error::InvalidKey(_))
        ));
    }
}
