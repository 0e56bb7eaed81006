//! Sync error types.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transient transport failure (includes timeouts at the transport
    /// boundary). Reflected as `SyncStatus::Error` and retried on the next
    /// trigger, never raised to the UI.
    #[error("network failure: {0}")]
    Network(String),

    /// Encrypted sync requested without session key material.
    #[error("encryption enabled but no session key available")]
    KeyUnavailable,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] lockmark_storage::StorageError),

    #[error("crypto error: {0}")]
    Crypto(#[from] lockmark_crypto::CryptoError),
}
