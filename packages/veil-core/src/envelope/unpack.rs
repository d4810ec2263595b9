//! Envelope unpacking.
//!
//! Recipient entries are tried in envelope order. The first `kid` for which
//! the caller holds a key is the one used; no other local keys are tried.

use tracing::debug;

use super::codec::decode;
use super::{Envelope, PackMode, Recipient};
use crate::crypto::{open_box, seal_open, verkey_to_x25519, ContentKey, LocalKey};
use crate::error::{Error, Result};

/// The result of opening an envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unpacked {
    /// Decrypted message
    pub plaintext: Vec<u8>,
    /// Sender verkey, present for Authcrypt
    pub sender_verkey: Option<String>,
    /// Verkey of the local key that opened the envelope
    pub recipient_verkey: String,
}

/// Open an envelope with keys resolved by `lookup`
///
/// `lookup` is called with each recipient `kid` in turn until it returns a
/// key. Errors from `lookup` are passed through unchanged.
pub fn unpack<F>(envelope: &[u8], mut lookup: F) -> Result<Unpacked>
where
    F: FnMut(&str) -> Result<Option<LocalKey>>,
{
    let envelope = decode(envelope)?;

    // `enc` is only authenticated: any other value fails the AEAD
    let mode = envelope.header.mode()?;
    if mode == PackMode::Anoncrypt
        && envelope
            .recipients
            .iter()
            .any(|r| r.header.sender.is_some() || r.header.iv.is_some())
    {
        return Err(Error::InvalidEnvelope(
            "Anoncrypt recipient carries sender fields".into(),
        ));
    }

    let mut matched = None;
    for recipient in &envelope.recipients {
        if let Some(key) = lookup(&recipient.header.kid)? {
            matched = Some((recipient, key));
            break;
        }
    }
    let (recipient, key) = matched.ok_or(Error::NoMatchingKey)?;
    debug!(mode = mode.as_str(), "Found recipient key for envelope");

    let (cek, sender_verkey) = match mode {
        PackMode::Anoncrypt => (unwrap_anoncrypt(recipient, &key)?, None),
        PackMode::Authcrypt => {
            let (cek, sender) = unwrap_authcrypt(recipient, &key)?;
            (cek, Some(sender))
        }
    };

    let plaintext = decrypt_payload(&envelope, &cek)?;

    Ok(Unpacked {
        plaintext,
        sender_verkey,
        recipient_verkey: recipient.header.kid.clone(),
    })
}

fn unwrap_anoncrypt(recipient: &Recipient, key: &LocalKey) -> Result<ContentKey> {
    let cek = seal_open(&key.to_x25519(), &recipient.encrypted_key)
        .map_err(|_| Error::DecryptionFailed)?;
    ContentKey::from_slice(&cek)
}

fn unwrap_authcrypt(recipient: &Recipient, key: &LocalKey) -> Result<(ContentKey, String)> {
    let (sealed_sender, nonce) = match (&recipient.header.sender, &recipient.header.iv) {
        (Some(sender), Some(iv)) => (sender, iv),
        _ => return Err(Error::MissingSender),
    };

    let recipient_x = key.to_x25519();
    let sender_bytes = seal_open(&recipient_x, sealed_sender).map_err(|_| Error::MissingSender)?;
    let sender_verkey =
        String::from_utf8(sender_bytes.to_vec()).map_err(|_| Error::MissingSender)?;
    let sender_x = verkey_to_x25519(&sender_verkey).map_err(|_| Error::MissingSender)?;

    let cek = open_box(&recipient_x, &sender_x, &recipient.encrypted_key, nonce)
        .map_err(|_| Error::DecryptionFailed)?;
    Ok((ContentKey::from_slice(&cek)?, sender_verkey))
}

fn decrypt_payload(envelope: &Envelope, cek: &ContentKey) -> Result<Vec<u8>> {
    cek.decrypt(&envelope.iv, &envelope.sealed_payload(), envelope.aad())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyType;
    use crate::envelope::codec::{b64_decode, b64_encode};
    use crate::envelope::{encode, pack, pack_envelope};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn key() -> LocalKey {
        LocalKey::generate(KeyType::Ed25519, None).unwrap()
    }

    /// Lookup over a fixed set of keys
    fn holding<'a>(keys: &'a [&'a LocalKey]) -> impl FnMut(&str) -> Result<Option<LocalKey>> + 'a {
        move |kid| {
            Ok(keys
                .iter()
                .find(|k| k.verkey() == kid)
                .map(|k| LocalKey::from_secret_bytes(&*k.secret_bytes()).unwrap()))
        }
    }

    fn mutate_wire(bytes: &[u8], mutate: impl FnOnce(&mut Value)) -> Vec<u8> {
        let mut wire: Value = serde_json::from_slice(bytes).unwrap();
        mutate(&mut wire);
        serde_json::to_vec(&wire).unwrap()
    }

    fn flip_bit(wire: &mut Value, field: &str) {
        let mut bytes = b64_decode(field, wire[field].as_str().unwrap()).unwrap();
        bytes[0] ^= 0x01;
        wire[field] = json!(b64_encode(&bytes));
    }

    #[test]
    fn test_anoncrypt_round_trip_each_recipient() {
        let (a, b) = (key(), key());
        let bytes = pack(b"hello", &[a.verkey(), b.verkey()], None).unwrap();

        for k in [&a, &b] {
            let unpacked = unpack(&bytes, holding(&[k])).unwrap();
            assert_eq!(unpacked.plaintext, b"hello");
            assert_eq!(unpacked.sender_verkey, None);
            assert_eq!(unpacked.recipient_verkey, k.verkey());
        }
    }

    #[test]
    fn test_authcrypt_round_trip() {
        let sender = key();
        let recipient = key();
        let bytes = pack(b"hello", &[recipient.verkey()], Some(&sender)).unwrap();

        let unpacked = unpack(&bytes, holding(&[&recipient])).unwrap();
        assert_eq!(unpacked.plaintext, b"hello");
        assert_eq!(unpacked.sender_verkey, Some(sender.verkey()));
        assert_eq!(unpacked.recipient_verkey, recipient.verkey());
    }

    #[test]
    fn test_authcrypt_sender_for_every_recipient() {
        let sender = key();
        let recipients = [key(), key(), key()];
        let verkeys: Vec<_> = recipients.iter().map(LocalKey::verkey).collect();
        let bytes = pack(b"to all", &verkeys, Some(&sender)).unwrap();

        for k in &recipients {
            let unpacked = unpack(&bytes, holding(&[k])).unwrap();
            assert_eq!(unpacked.sender_verkey, Some(sender.verkey()));
        }
    }

    #[test]
    fn test_first_listed_recipient_wins() {
        let (a, b) = (key(), key());
        let bytes = pack(b"hello", &[b.verkey(), a.verkey()], None).unwrap();
        let unpacked = unpack(&bytes, holding(&[&a, &b])).unwrap();
        assert_eq!(unpacked.recipient_verkey, b.verkey());
    }

    #[test]
    fn test_only_listed_kids_are_tried() {
        let a = key();
        let bytes = pack(b"hello", &[a.verkey()], None).unwrap();

        let mut tried = Vec::new();
        let result = unpack(&bytes, |kid| {
            tried.push(kid.to_string());
            Ok(None)
        });
        assert!(matches!(result, Err(Error::NoMatchingKey)));
        assert_eq!(tried, vec![a.verkey()]);
    }

    #[test]
    fn test_no_matching_key() {
        let bytes = pack(b"hello", &[key().verkey()], None).unwrap();
        let stranger = key();
        assert!(matches!(
            unpack(&bytes, holding(&[&stranger])),
            Err(Error::NoMatchingKey)
        ));
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let bytes = pack(b"hello", &[key().verkey()], None).unwrap();
        let result = unpack(&bytes, |_| Err(Error::StoreError("backend down".into())));
        assert!(matches!(result, Err(Error::StoreError(_))));
    }

    #[test]
    fn test_tampering_fails_for_every_recipient() {
        let sender = key();
        let (a, b) = (key(), key());
        for from in [None, Some(&sender)] {
            let bytes = pack(b"hello", &[a.verkey(), b.verkey()], from).unwrap();
            for field in ["ciphertext", "tag"] {
                let tampered = mutate_wire(&bytes, |w| flip_bit(w, field));
                for k in [&a, &b] {
                    assert!(matches!(
                        unpack(&tampered, holding(&[k])),
                        Err(Error::DecryptionFailed)
                    ));
                }
            }
        }
    }

    #[test]
    fn test_tampered_protected_header_fails_for_every_recipient() {
        let sender = key();
        let (a, b) = (key(), key());
        for (from, alg) in [(None, "Anoncrypt"), (Some(&sender), "Authcrypt")] {
            let bytes = pack(b"hello", &[a.verkey(), b.verkey()], from).unwrap();

            // Still a valid header, but no longer the authenticated bytes
            let header = format!(
                r#"{{"enc":"xchacha20poly1305_ietf","typ":"JWM/1.1","alg":"{}"}}"#,
                alg
            );
            let tampered = mutate_wire(&bytes, |w| {
                w["protected"] = json!(b64_encode(header.as_bytes()));
            });
            for k in [&a, &b] {
                assert!(matches!(
                    unpack(&tampered, holding(&[k])),
                    Err(Error::DecryptionFailed)
                ));
            }
        }
    }

    #[test]
    fn test_protected_bit_flips_never_decrypt() {
        let (a, b) = (key(), key());
        let bytes = pack(b"hello", &[a.verkey(), b.verkey()], None).unwrap();
        let wire: Value = serde_json::from_slice(&bytes).unwrap();
        let protected = b64_decode("protected", wire["protected"].as_str().unwrap()).unwrap();

        for bit in 0..protected.len() * 8 {
            let mut flipped = protected.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            let tampered = mutate_wire(&bytes, |w| {
                w["protected"] = json!(b64_encode(&flipped));
            });
            for k in [&a, &b] {
                // Only header shapes the codec or alg check refuse may
                // fail early; everything else must fail authentication
                assert!(matches!(
                    unpack(&tampered, holding(&[k])),
                    Err(Error::DecryptionFailed)
                        | Err(Error::InvalidEnvelope(_))
                        | Err(Error::UnsupportedAlgorithm(_))
                ));
            }
        }
    }

    #[test]
    fn test_wrong_iv_fails() {
        let a = key();
        let bytes = pack(b"hello", &[a.verkey()], None).unwrap();
        let tampered = mutate_wire(&bytes, |w| flip_bit(w, "iv"));
        assert!(matches!(
            unpack(&tampered, holding(&[&a])),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_unsupported_alg() {
        let a = key();
        let bytes = pack(b"hello", &[a.verkey()], None).unwrap();
        let tampered = mutate_wire(&bytes, |w| {
            w["protected"] = json!(b64_encode(
                br#"{"enc":"xchacha20poly1305_ietf","typ":"JWM/1.0","alg":"ECDH-1PU"}"#
            ));
        });
        assert!(matches!(
            unpack(&tampered, holding(&[&a])),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_changed_enc_fails_authentication() {
        let sender = key();
        let (a, b) = (key(), key());
        for (from, alg) in [(None, "Anoncrypt"), (Some(&sender), "Authcrypt")] {
            let bytes = pack(b"hello", &[a.verkey(), b.verkey()], from).unwrap();
            for enc in ["A256GCM", "xchacha20poly1305_ietg"] {
                let header = format!(r#"{{"enc":"{}","typ":"JWM/1.0","alg":"{}"}}"#, enc, alg);
                let tampered = mutate_wire(&bytes, |w| {
                    w["protected"] = json!(b64_encode(header.as_bytes()));
                });
                for k in [&a, &b] {
                    assert!(matches!(
                        unpack(&tampered, holding(&[k])),
                        Err(Error::DecryptionFailed)
                    ));
                }
            }
        }
    }

    #[test]
    fn test_authcrypt_missing_sender() {
        let sender = key();
        let a = key();
        let mut envelope = pack_envelope(b"hello", &[a.verkey()], Some(&sender)).unwrap();
        envelope.recipients[0].header.sender = None;
        envelope.recipients[0].header.iv = None;
        let bytes = encode(&envelope).unwrap();

        assert!(matches!(
            unpack(&bytes, holding(&[&a])),
            Err(Error::MissingSender)
        ));
    }

    #[test]
    fn test_authcrypt_unreadable_sender() {
        let sender = key();
        let a = key();
        let mut envelope = pack_envelope(b"hello", &[a.verkey()], Some(&sender)).unwrap();
        envelope.recipients[0].header.sender = Some(vec![0u8; 80]);
        let bytes = encode(&envelope).unwrap();

        assert!(matches!(
            unpack(&bytes, holding(&[&a])),
            Err(Error::MissingSender)
        ));
    }

    #[test]
    fn test_anoncrypt_with_sender_fields_rejected() {
        let sender = key();
        let a = key();
        let auth = pack_envelope(b"hello", &[a.verkey()], Some(&sender)).unwrap();
        let mut anon = pack_envelope(b"hello", &[a.verkey()], None).unwrap();
        anon.recipients[0].header = auth.recipients[0].header.clone();
        let bytes = encode(&anon).unwrap();

        assert!(matches!(
            unpack(&bytes, holding(&[&a])),
            Err(Error::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_corrupt_wrapped_key() {
        let a = key();
        let mut envelope = pack_envelope(b"hello", &[a.verkey()], None).unwrap();
        envelope.recipients[0].encrypted_key[0] ^= 0x01;
        let bytes = encode(&envelope).unwrap();

        assert!(matches!(
            unpack(&bytes, holding(&[&a])),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_anoncrypt_envelopes_do_not_identify_sender() {
        let recipient = key();
        let first = pack(b"same", &[recipient.verkey()], None).unwrap();
        let second = pack(b"same", &[recipient.verkey()], None).unwrap();

        let shape = |bytes: &[u8]| {
            let wire: Value = serde_json::from_slice(bytes).unwrap();
            let header = wire["recipients"][0]["header"].clone();
            (wire["protected"].clone(), header)
        };
        assert_eq!(shape(&first), shape(&second));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_round_trip_property(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            count in 1usize..4,
            pick in any::<proptest::sample::Index>(),
            authenticated in any::<bool>(),
        ) {
            let recipients: Vec<LocalKey> = (0..count).map(|_| key()).collect();
            let verkeys: Vec<String> = recipients.iter().map(LocalKey::verkey).collect();
            let sender = key();
            let from = if authenticated { Some(&sender) } else { None };

            let bytes = pack(&plaintext, &verkeys, from).unwrap();
            let chosen = &recipients[pick.index(count)];
            let unpacked = unpack(&bytes, holding(&[chosen])).unwrap();

            prop_assert_eq!(unpacked.plaintext, plaintext);
            prop_assert_eq!(unpacked.recipient_verkey, chosen.verkey());
            prop_assert_eq!(unpacked.sender_verkey, from.map(LocalKey::verkey));
        }
    }
}
