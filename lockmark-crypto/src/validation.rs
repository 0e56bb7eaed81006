//! Passphrase verification without storing the passphrase.
//!
//! At setup, a fixed-shape token is encrypted with the derived key and the
//! resulting `{salt, encrypted_validation_token}` pair is persisted as the
//! key package. A later passphrase attempt is verified by re-deriving a
//! key from the candidate and the stored salt, then attempting to decrypt
//! the token: success proves the passphrase, and the re-derived key becomes
//! the new session key material.

use crate::cipher::{decrypt_string, encrypt_string};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, DerivedKey, KdfParams, Salt};
use serde::{Deserialize, Serialize};

/// Marker embedded in the validation token. Bumping the suffix invalidates
/// every existing key package, so it only changes with a migration path.
const TOKEN_MARKER: &str = "lockmark-validation-v1";

/// Fixed-shape payload sealed inside the key package.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationToken {
    pub timestamp: i64,
    pub marker: String,
}

/// Persisted, non-secret artifact that lets a passphrase be verified and a
/// key re-derived on any device.
///
/// One per user. Created at encryption setup, replaced wholesale on
/// passphrase change, deleted when encryption is disabled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyPackage {
    /// base64-encoded 16-byte salt.
    pub salt: String,
    /// Cipher blob sealing a JSON [`ValidationToken`].
    pub encrypted_validation_token: String,
}

/// Derives a key from the passphrase and seals a fresh key package with it.
///
/// Returns the package for persistence together with the derived key, which
/// the caller retains as session key material.
pub fn create_key_package(
    passphrase: &str,
    params: &KdfParams,
) -> CryptoResult<(KeyPackage, DerivedKey)> {
    let salt = Salt::random();
    let key = derive_key(passphrase, &salt, params)?;

    let token = ValidationToken {
        timestamp: chrono::Utc::now().timestamp_millis(),
        marker: TOKEN_MARKER.to_string(),
    };
    let token_json = serde_json::to_string(&token)?;
    let encrypted_validation_token = encrypt_string(&key, &token_json)?;

    Ok((
        KeyPackage {
            salt: salt.encode(),
            encrypted_validation_token,
        },
        key,
    ))
}

/// Verifies a passphrase attempt against a stored key package.
///
/// `Ok(Some(key))` on success — the caller may retain the key as the new
/// session key material. `Ok(None)` means the passphrase is wrong: an
/// expected, user-recoverable outcome, never surfaced as an error. `Err`
/// is reserved for malformed packages and primitive failures.
pub fn verify_passphrase(
    passphrase: &str,
    package: &KeyPackage,
    params: &KdfParams,
) -> CryptoResult<Option<DerivedKey>> {
    let salt = Salt::decode(&package.salt)?;
    let key = derive_key(passphrase, &salt, params)?;

    let token_json = match decrypt_string(&key, &package.encrypted_validation_token) {
        Ok(json) => json,
        Err(CryptoError::Authentication) => return Ok(None),
        Err(e) => return Err(e),
    };

    let token: ValidationToken = serde_json::from_str(&token_json)?;
    if token.marker != TOKEN_MARKER {
        return Err(CryptoError::InvalidFormat(format!(
            "unexpected token marker: {}",
            token.marker
        )));
    }

    Ok(Some(key))
}
