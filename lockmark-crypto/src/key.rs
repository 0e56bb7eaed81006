//! Passphrase key derivation (Argon2id).

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Derived key length in bytes (ChaCha20-Poly1305 key).
pub const KEY_SIZE: usize = 32;

/// Salt length in bytes.
pub const SALT_SIZE: usize = 16;

/// Random per-user salt mixed into key derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generates a fresh random salt.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }

    /// Base64 form for storage in string-typed stores.
    pub fn encode(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Parses a salt from its base64 storage form.
    pub fn decode(encoded: &str) -> CryptoResult<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidFormat(format!("salt base64: {e}")))?;
        if bytes.len() != SALT_SIZE {
            return Err(CryptoError::InvalidFormat(format!(
                "salt length: expected {SALT_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; SALT_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Symmetric key derived from a passphrase.
///
/// Ephemeral session material: held in memory for the duration of an
/// unlocked session, zeroized on drop. Never serialized, never logged.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Argon2id cost parameters.
///
/// The defaults must never change silently: the same passphrase + salt +
/// params have to yield the same key on every device, or a key package
/// written by one device becomes unopenable on another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Number of passes.
    pub t_cost: u32,
    /// Parallelism lanes.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // 19 MiB / 2 passes / 1 lane — OWASP-recommended Argon2id baseline,
        // well above the brute-force resistance of 10^5 PBKDF2 iterations.
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

/// Derives a symmetric key from a passphrase and salt.
///
/// Deterministic: identical inputs always produce the identical key, which
/// is what lets independent devices re-derive the same key from a shared
/// key package. Does not validate passphrase correctness — that is the
/// validation token's job.
pub fn derive_key(passphrase: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    let argon_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(KEY_SIZE))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut out = [0u8; KEY_SIZE];
    argon
        .hash_password_into(passphrase.as_bytes(), salt.as_bytes(), &mut out)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let key = DerivedKey::from_bytes(out);
    out.zeroize();
    Ok(key)
}

/// One-shot self-test gating the encryption feature.
///
/// Run once at session start; on failure the application must degrade to
/// "encryption unavailable" rather than crash mid-operation later.
pub fn ensure_available() -> CryptoResult<()> {
    let key = DerivedKey::from_bytes([7u8; KEY_SIZE]);
    let sample = b"lockmark-self-test";
    let blob = crate::cipher::encrypt_blob(&key, sample).map_err(|_| CryptoError::Unsupported)?;
    let back = crate::cipher::decrypt_blob(&key, &blob).map_err(|_| CryptoError::Unsupported)?;
    if back != sample {
        return Err(CryptoError::Unsupported);
    }
    Ok(())
}
