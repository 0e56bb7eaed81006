//! Authenticated encryption (ChaCha20-Poly1305).
//!
//! Blob wire format, shared by local storage and the remote record:
//! `base64(nonce[12] || ciphertext || tag[16])`.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, KeyInit, Nonce};
use rand::rngs::OsRng;

/// Nonce length in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// Encrypts plaintext into a text-encoded blob.
///
/// A fresh random nonce is generated inside this call for every invocation;
/// callers cannot supply one. Nonce reuse under the same key breaks the
/// cipher's guarantees, so generation is not exposed.
pub fn encrypt_blob(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<String> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(blob))
}

/// Decrypts a blob produced by [`encrypt_blob`].
///
/// Fails closed: any tag verification failure (wrong key, corruption,
/// tampering) is [`CryptoError::Authentication`], and no plaintext —
/// partial or otherwise — is returned on that path.
pub fn decrypt_blob(key: &DerivedKey, blob: &str) -> CryptoResult<Vec<u8>> {
    let raw = BASE64
        .decode(blob)
        .map_err(|e| CryptoError::InvalidFormat(format!("blob base64: {e}")))?;
    if raw.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidFormat(format!(
            "blob too short: {} bytes",
            raw.len()
        )));
    }

    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::Authentication)
}

/// Encrypts a UTF-8 string into a blob.
pub fn encrypt_string(key: &DerivedKey, plaintext: &str) -> CryptoResult<String> {
    encrypt_blob(key, plaintext.as_bytes())
}

/// Decrypts a blob into a UTF-8 string.
pub fn decrypt_string(key: &DerivedKey, blob: &str) -> CryptoResult<String> {
    let bytes = decrypt_blob(key, blob)?;
    String::from_utf8(bytes).map_err(|e| CryptoError::InvalidFormat(format!("utf-8: {e}")))
}
