//! Encryption layer for Lockmark.
//!
//! Provides passphrase-based protection of a user's collection data using:
//! - Argon2id for key derivation from passphrases
//! - ChaCha20-Poly1305 for authenticated encryption
//! - Secure key management with zeroization
//!
//! # Architecture
//!
//! The derived key is never stored — it is re-derived from the passphrase
//! and the persisted salt every time the user unlocks. Passphrase
//! correctness is proven by decrypting a validation token that was sealed
//! at setup; the passphrase itself is never persisted in any form.
//!
//! Ciphertext blobs are text-encoded (`base64(nonce || ciphertext || tag)`)
//! so they can travel through string-typed stores and the remote record
//! unchanged across devices.

mod cipher;
mod error;
mod key;
mod validation;

pub use cipher::{
    decrypt_blob, decrypt_string, encrypt_blob, encrypt_string, NONCE_SIZE, TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, ensure_available, DerivedKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE};
pub use validation::{create_key_package, verify_passphrase, KeyPackage, ValidationToken};
