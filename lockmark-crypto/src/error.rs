//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in the encryption layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The platform primitive failed its startup self-test. Fatal for the
    /// encryption feature only — callers degrade to cleartext operation.
    #[error("cryptographic primitives unavailable on this platform")]
    Unsupported,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Tag verification failed: wrong key, corrupted data, or tampering.
    /// No plaintext is ever returned on this path.
    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,

    /// Blob is not well-formed (bad base64, truncated nonce, etc.).
    #[error("malformed ciphertext blob: {0}")]
    InvalidFormat(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
