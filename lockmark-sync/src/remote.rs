//! Remote store abstraction.
//!
//! The server holds one logical record per user: either a plaintext list
//! of identifiers or an encrypted blob, with a per-user marker recording
//! which representation is authoritative. Transport security and timeouts
//! are the implementation's responsibility; failures surface as
//! [`SyncError::Network`].

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use lockmark_types::UserId;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Remote counterpart of the local collection.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches the plaintext set. An absent record is the empty set.
    async fn fetch_plain(&self, user: &UserId) -> SyncResult<HashSet<String>>;

    async fn save_plain(&self, user: &UserId, ids: &HashSet<String>) -> SyncResult<()>;

    /// Fetches the encrypted blob, if one exists.
    async fn fetch_encrypted(&self, user: &UserId) -> SyncResult<Option<String>>;

    async fn save_encrypted(&self, user: &UserId, blob: &str) -> SyncResult<()>;

    /// Whether the authoritative remote record is the encrypted one.
    async fn is_encrypted(&self, user: &UserId) -> SyncResult<bool>;

    async fn set_encrypted(&self, user: &UserId, encrypted: bool) -> SyncResult<()>;
}

#[derive(Default)]
struct RemoteRecords {
    plain: HashMap<UserId, HashSet<String>>,
    blobs: HashMap<UserId, String>,
    encrypted_markers: HashMap<UserId, bool>,
}

/// In-memory remote store: test double and single-device fallback.
///
/// `fail_next(n)` makes the next `n` operations fail with a network error,
/// for exercising the engine's failure paths.
#[derive(Default)]
pub struct MemoryRemoteStore {
    records: Mutex<RemoteRecords>,
    failures_remaining: AtomicU32,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects `n` consecutive transport failures.
    pub fn fail_next(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    fn check_failure(&self) -> SyncResult<()> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::Network("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_plain(&self, user: &UserId) -> SyncResult<HashSet<String>> {
        self.check_failure()?;
        let records = self.records.lock().unwrap();
        Ok(records.plain.get(user).cloned().unwrap_or_default())
    }

    async fn save_plain(&self, user: &UserId, ids: &HashSet<String>) -> SyncResult<()> {
        self.check_failure()?;
        let mut records = self.records.lock().unwrap();
        records.plain.insert(user.clone(), ids.clone());
        Ok(())
    }

    async fn fetch_encrypted(&self, user: &UserId) -> SyncResult<Option<String>> {
        self.check_failure()?;
        let records = self.records.lock().unwrap();
        Ok(records.blobs.get(user).cloned())
    }

    async fn save_encrypted(&self, user: &UserId, blob: &str) -> SyncResult<()> {
        self.check_failure()?;
        let mut records = self.records.lock().unwrap();
        records.blobs.insert(user.clone(), blob.to_string());
        Ok(())
    }

    async fn is_encrypted(&self, user: &UserId) -> SyncResult<bool> {
        self.check_failure()?;
        let records = self.records.lock().unwrap();
        Ok(records.encrypted_markers.get(user).copied().unwrap_or(false))
    }

    async fn set_encrypted(&self, user: &UserId, encrypted: bool) -> SyncResult<()> {
        self.check_failure()?;
        let mut records = self.records.lock().unwrap();
        records.encrypted_markers.insert(user.clone(), encrypted);
        Ok(())
    }
}
