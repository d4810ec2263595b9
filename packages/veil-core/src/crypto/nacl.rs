//! NaCl-compatible sealed box and authenticated box.
//!
//! Both use X25519 + XSalsa20-Poly1305 (`crypto_box`). The sealed box takes
//! an ephemeral sender key per call, so its output says nothing about who
//! produced it. The authenticated box binds the ciphertext to a known
//! sender key pair.

use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::{Aead, AeadCore};
use crypto_box::{PublicKey as BoxPublicKey, SalsaBox, SecretKey as BoxSecretKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Size of an authenticated-box nonce in bytes
pub const BOX_NONCE_SIZE: usize = 24;

/// Fresh random nonce for [`seal_box`]
pub fn box_random_nonce() -> [u8; BOX_NONCE_SIZE] {
    let generated = SalsaBox::generate_nonce(&mut OsRng);
    let mut nonce = [0u8; BOX_NONCE_SIZE];
    nonce.copy_from_slice(&generated);
    nonce
}

/// Anonymously encrypt `message` to `recipient`
pub fn seal(recipient: &BoxPublicKey, message: &[u8]) -> Result<Vec<u8>> {
    recipient
        .seal(&mut OsRng, message)
        .map_err(|_| Error::CryptoError("Sealed box encryption failed".into()))
}

/// Open a sealed box addressed to `recipient`
pub fn seal_open(recipient: &BoxSecretKey, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    recipient
        .unseal(ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| Error::CryptoError("Sealed box decryption failed".into()))
}

/// Encrypt `message` from `sender` to `recipient` under `nonce`
pub fn seal_box(
    recipient: &BoxPublicKey,
    sender: &BoxSecretKey,
    message: &[u8],
    nonce: &[u8; BOX_NONCE_SIZE],
) -> Result<Vec<u8>> {
    SalsaBox::new(recipient, sender)
        .encrypt(GenericArray::from_slice(nonce), message)
        .map_err(|_| Error::CryptoError("Box encryption failed".into()))
}

/// Open a box sent by `sender` to `recipient`
pub fn open_box(
    recipient: &BoxSecretKey,
    sender: &BoxPublicKey,
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if nonce.len() != BOX_NONCE_SIZE {
        return Err(Error::CryptoError(format!(
            "Box nonce must be {} bytes, got {}",
            BOX_NONCE_SIZE,
            nonce.len()
        )));
    }

    SalsaBox::new(sender, recipient)
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| Error::CryptoError("Box decryption failed".into()))
}
