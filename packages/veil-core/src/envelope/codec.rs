//! Envelope wire codec.
//!
//! Encoding is deterministic: struct field order fixes the JSON key order.
//! Decoding either yields a complete, validated [`Envelope`] or a single
//! `InvalidEnvelope` error.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{Envelope, ProtectedHeader, Recipient, RecipientHeader};
use crate::crypto::{PAYLOAD_NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};

/// base64url decoder accepting input with or without padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Serialize, Deserialize)]
struct WireRecipientHeader {
    kid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iv: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireRecipient {
    encrypted_key: String,
    header: WireRecipientHeader,
}

#[derive(Serialize)]
struct WireEnvelope<'a> {
    protected: &'a str,
    recipients: Vec<WireRecipient>,
    iv: String,
    ciphertext: String,
    tag: String,
}

/// Inbound form; also accepts the flattened single-recipient layout
#[derive(Deserialize)]
struct InboundEnvelope {
    protected: String,
    #[serde(default)]
    recipients: Option<Vec<WireRecipient>>,
    #[serde(default)]
    header: Option<WireRecipientHeader>,
    #[serde(default)]
    encrypted_key: Option<String>,
    iv: String,
    ciphertext: String,
    tag: String,
}

pub(crate) fn b64_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn b64_decode(field: &str, text: &str) -> Result<Vec<u8>> {
    URL_SAFE_LENIENT
        .decode(text)
        .map_err(|_| Error::InvalidEnvelope(format!("Field '{}' is not valid base64url", field)))
}

/// Serialize a protected header to its base64url text
pub(crate) fn encode_protected(header: &ProtectedHeader) -> Result<String> {
    Ok(b64_encode(&serde_json::to_vec(header)?))
}

fn decode_protected(text: &str) -> Result<ProtectedHeader> {
    let bytes = b64_decode("protected", text)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|_| Error::InvalidEnvelope("Protected header is not JSON".into()))?;
    if !value.is_object() {
        return Err(Error::InvalidEnvelope(
            "Protected header is not a JSON object".into(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| Error::InvalidEnvelope(format!("Invalid protected header: {}", e)))
}

fn decode_recipient(wire: WireRecipient) -> Result<Recipient> {
    let WireRecipientHeader { kid, sender, iv } = wire.header;
    if kid.is_empty() {
        return Err(Error::InvalidEnvelope("Recipient kid is empty".into()));
    }
    let (sender, iv) = match (sender, iv) {
        (Some(sender), Some(iv)) => (
            Some(b64_decode("sender", &sender)?),
            Some(b64_decode("iv", &iv)?),
        ),
        (None, None) => (None, None),
        _ => {
            return Err(Error::InvalidEnvelope(
                "Recipient sender and iv must appear together".into(),
            ))
        }
    };

    Ok(Recipient {
        encrypted_key: b64_decode("encrypted_key", &wire.encrypted_key)?,
        header: RecipientHeader { kid, sender, iv },
    })
}

/// Serialize an envelope to its wire form
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
    let wire = WireEnvelope {
        protected: &envelope.protected,
        recipients: envelope
            .recipients
            .iter()
            .map(|recipient| WireRecipient {
                encrypted_key: b64_encode(&recipient.encrypted_key),
                header: WireRecipientHeader {
                    kid: recipient.header.kid.clone(),
                    sender: recipient.header.sender.as_deref().map(b64_encode),
                    iv: recipient.header.iv.as_deref().map(b64_encode),
                },
            })
            .collect(),
        iv: b64_encode(&envelope.iv),
        ciphertext: b64_encode(&envelope.ciphertext),
        tag: b64_encode(&envelope.tag),
    };
    Ok(serde_json::to_vec(&wire)?)
}

/// Parse and validate an envelope
pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    let inbound: InboundEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| Error::InvalidEnvelope(format!("Malformed envelope: {}", e)))?;

    let header = decode_protected(&inbound.protected)?;

    let wire_recipients = match (inbound.recipients, inbound.header, inbound.encrypted_key) {
        (Some(recipients), None, None) => recipients,
        (None, Some(header), Some(encrypted_key)) => vec![WireRecipient {
            encrypted_key,
            header,
        }],
        _ => {
            return Err(Error::InvalidEnvelope(
                "Envelope must carry either recipients or a flattened recipient".into(),
            ))
        }
    };
    if wire_recipients.is_empty() {
        return Err(Error::InvalidEnvelope("Envelope has no recipients".into()));
    }
    let recipients = wire_recipients
        .into_iter()
        .map(decode_recipient)
        .collect::<Result<Vec<_>>>()?;

    let iv = b64_decode("iv", &inbound.iv)?;
    if iv.len() != PAYLOAD_NONCE_SIZE {
        return Err(Error::InvalidEnvelope(format!(
            "Payload iv must be {} bytes, got {}",
            PAYLOAD_NONCE_SIZE,
            iv.len()
        )));
    }

    let tag_bytes = b64_decode("tag", &inbound.tag)?;
    let tag: [u8; TAG_SIZE] = tag_bytes.as_slice().try_into().map_err(|_| {
        Error::InvalidEnvelope(format!(
            "Tag must be {} bytes, got {}",
            TAG_SIZE,
            tag_bytes.len()
        ))
    })?;

    Ok(Envelope {
        protected: inbound.protected,
        header,
        recipients,
        iv,
        ciphertext: b64_decode("ciphertext", &inbound.ciphertext)?,
        tag,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::PackMode;
    use serde_json::json;

    fn protected(mode: PackMode) -> String {
        encode_protected(&ProtectedHeader::new(mode)).unwrap()
    }

    fn sample_wire() -> serde_json::Value {
        json!({
            "protected": protected(PackMode::Anoncrypt),
            "recipients": [
                {"encrypted_key": b64_encode(b"wrapped"), "header": {"kid": "vk1"}}
            ],
            "iv": b64_encode(&[1u8; 24]),
            "ciphertext": b64_encode(b"cipher"),
            "tag": b64_encode(&[2u8; 16]),
        })
    }

    fn decode_value(value: &serde_json::Value) -> Result<Envelope> {
        decode(&serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_decode_valid() {
        let envelope = decode_value(&sample_wire()).unwrap();
        assert_eq!(envelope.header.mode().unwrap(), PackMode::Anoncrypt);
        assert_eq!(envelope.recipients.len(), 1);
        assert_eq!(envelope.recipients[0].header.kid, "vk1");
        assert_eq!(envelope.recipients[0].encrypted_key, b"wrapped");
        assert_eq!(envelope.tag, [2u8; 16]);
    }

    #[test]
    fn test_encode_is_deterministic_and_ordered() {
        let envelope = decode_value(&sample_wire()).unwrap();
        let first = encode(&envelope).unwrap();
        assert_eq!(first, encode(&envelope).unwrap());

        let text = String::from_utf8(first).unwrap();
        let order: Vec<usize> = ["\"protected\"", "\"recipients\"", "\"iv\"", "\"ciphertext\"", "\"tag\""]
            .iter()
            .map(|key| text.find(key).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(!text.contains("\"sender\""));
    }

    #[test]
    fn test_protected_kept_verbatim() {
        // Trailing whitespace is valid JSON and makes the length need padding
        let mut json = serde_json::to_vec(&ProtectedHeader::new(PackMode::Anoncrypt)).unwrap();
        json.push(b' ');
        let padded = base64::engine::general_purpose::URL_SAFE.encode(json);
        assert!(padded.ends_with('='));

        let mut wire = sample_wire();
        wire["protected"] = json!(padded);
        let envelope = decode_value(&wire).unwrap();
        assert_eq!(envelope.protected, padded);
        assert_eq!(envelope.aad(), padded.as_bytes());
    }

    #[test]
    fn test_accepts_padded_fields() {
        let padded = base64::engine::general_purpose::URL_SAFE;
        let mut wire = sample_wire();
        wire["ciphertext"] = json!(padded.encode(b"cipher!"));
        wire["tag"] = json!(padded.encode([2u8; 16]));
        let envelope = decode_value(&wire).unwrap();
        assert_eq!(envelope.ciphertext, b"cipher!");
        assert_eq!(envelope.tag, [2u8; 16]);
    }

    #[test]
    fn test_flattened_form() {
        let mut wire = sample_wire();
        let recipient = wire["recipients"][0].clone();
        let object = wire.as_object_mut().unwrap();
        object.remove("recipients");
        object.insert("header".into(), recipient["header"].clone());
        object.insert("encrypted_key".into(), recipient["encrypted_key"].clone());

        let envelope = decode_value(&wire).unwrap();
        assert_eq!(envelope.recipients.len(), 1);
        assert_eq!(envelope.recipients[0].header.kid, "vk1");
    }

    #[test]
    fn test_rejects_structural_errors() {
        let cases: Vec<Box<dyn Fn(&mut serde_json::Value)>> = vec![
            Box::new(|w| {
                w.as_object_mut().unwrap().remove("tag");
            }),
            Box::new(|w| {
                w.as_object_mut().unwrap().remove("protected");
            }),
            Box::new(|w| w["recipients"] = json!([])),
            Box::new(|w| w["ciphertext"] = json!("not base64!")),
            Box::new(|w| w["tag"] = json!(b64_encode(&[0u8; 15]))),
            Box::new(|w| w["iv"] = json!(b64_encode(&[0u8; 12]))),
            Box::new(|w| w["protected"] = json!(b64_encode(b"[1,2,3]"))),
            Box::new(|w| w["protected"] = json!(b64_encode(b"not json"))),
            Box::new(|w| w["protected"] = json!(b64_encode(br#"{"enc":"x","typ":"y"}"#))),
            Box::new(|w| w["recipients"][0]["header"]["sender"] = json!(b64_encode(b"s"))),
            Box::new(|w| w["recipients"][0]["header"]["kid"] = json!("")),
            Box::new(|w| {
                w["recipients"][0]
                    .as_object_mut()
                    .unwrap()
                    .remove("encrypted_key");
            }),
        ];

        for (i, mutate) in cases.iter().enumerate() {
            let mut wire = sample_wire();
            mutate(&mut wire);
            assert!(
                matches!(decode_value(&wire), Err(Error::InvalidEnvelope(_))),
                "case {} should be rejected",
                i
            );
        }
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(matches!(decode(b"garbage"), Err(Error::InvalidEnvelope(_))));
        assert!(matches!(decode(b"[]"), Err(Error::InvalidEnvelope(_))));
    }

    #[test]
    fn test_unknown_alg_decodes() {
        let mut wire = sample_wire();
        wire["protected"] = json!(b64_encode(
            br#"{"enc":"xchacha20poly1305_ietf","typ":"JWM/1.0","alg":"ECDH-ES"}"#
        ));
        let envelope = decode_value(&wire).unwrap();
        assert!(matches!(envelope.header.mode(), Err(Error::UnsupportedAlgorithm(_))));
    }
}
