//! The sync engine proper.
//!
//! One engine per user session. At most one sync runs at a time; a call
//! that arrives while another is in flight returns [`SyncOutcome::Busy`]
//! immediately and the caller decides whether to re-run afterwards.
//!
//! Transport failures are absorbed: they land in the engine state as
//! `SyncStatus::Error` plus a failure counter bump, and the operation
//! reports [`SyncOutcome::Failed`]. Nothing here panics the caller over
//! a flaky network.

use lockmark_crypto::{decrypt_string, encrypt_string, DerivedKey};
use lockmark_storage::CollectionRecord;
use lockmark_types::UserId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::conflict::{has_conflicts, resolve, ConflictStrategy};
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteStore;
use crate::stats::{SyncStats, SyncStatsStore};

/// Observable engine status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Success,
    Error,
    Conflict,
}

/// Snapshot of the engine's observable state.
#[derive(Clone, Debug)]
pub struct SyncState {
    pub status: SyncStatus,
    pub last_error: Option<String>,
    pub stats: SyncStats,
}

/// Result of a single sync attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Sync completed; the set both sides now agree on.
    Synced(HashSet<String>),
    /// Divergence detected under the manual strategy. The engine holds
    /// both sides until [`SyncEngine::resolve_conflict`] is called.
    Conflict,
    /// Transport or storage failure, recorded in stats and state.
    Failed,
    /// Another sync was already in flight.
    Busy,
}

/// Both sides of a held manual conflict.
#[derive(Clone, Debug)]
struct PendingConflict {
    local: HashSet<String>,
    remote: HashSet<String>,
}

struct EngineState {
    status: SyncStatus,
    last_error: Option<String>,
    pending: Option<PendingConflict>,
}

pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    stats_store: SyncStatsStore,
    user: UserId,
    state: Mutex<EngineState>,
    // Held for the duration of a sync; try_lock failure means busy.
    in_flight: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteStore>, stats_store: SyncStatsStore, user: UserId) -> Self {
        Self {
            remote,
            stats_store,
            user,
            state: Mutex::new(EngineState {
                status: SyncStatus::Idle,
                last_error: None,
                pending: None,
            }),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Snapshot of status, last error, and persisted stats.
    pub fn state(&self) -> SyncState {
        let inner = self.state.lock().unwrap();
        let stats = self.stats_store.load(&self.user).unwrap_or_default();
        SyncState {
            status: inner.status,
            last_error: inner.last_error.clone(),
            stats,
        }
    }

    /// Whether a manual conflict is being held.
    pub fn has_pending_conflict(&self) -> bool {
        self.state.lock().unwrap().pending.is_some()
    }

    /// Runs one sync of `local` against the remote.
    ///
    /// With a key, the collection syncs encrypted: the local set is sealed
    /// and pushed, last writer wins, no conflict detection (ciphertext
    /// cannot be diffed). Without a key the plaintext path runs the
    /// conflict heuristic and `strategy` decides how divergence resolves.
    pub async fn sync(
        &self,
        local: &HashSet<String>,
        key: Option<&DerivedKey>,
        strategy: ConflictStrategy,
    ) -> SyncOutcome {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => return SyncOutcome::Busy,
        };

        self.set_status(SyncStatus::Syncing, None);

        let result = match key {
            Some(key) => self.sync_encrypted(local, key).await,
            None => self.sync_plain(local, strategy).await,
        };

        match result {
            Ok(SyncOutcome::Synced(agreed)) => {
                self.record_success(agreed.len() as u64);
                self.set_status(SyncStatus::Success, None);
                SyncOutcome::Synced(agreed)
            }
            Ok(SyncOutcome::Conflict) => {
                self.set_status(SyncStatus::Conflict, None);
                SyncOutcome::Conflict
            }
            Ok(other) => other,
            Err(e) => self.absorb_failure(e),
        }
    }

    /// Resolves a held manual conflict under the supplied strategy and
    /// pushes the result. Passing `Manual` again keeps the conflict held.
    pub async fn resolve_conflict(&self, strategy: ConflictStrategy) -> SyncOutcome {
        if strategy == ConflictStrategy::Manual {
            return SyncOutcome::Conflict;
        }

        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => return SyncOutcome::Busy,
        };

        let pending = match self.state.lock().unwrap().pending.clone() {
            Some(pending) => pending,
            None => return SyncOutcome::Failed,
        };

        self.set_status(SyncStatus::Syncing, None);
        let resolved = resolve(&pending.local, &pending.remote, strategy);

        match self.push_plain(&resolved).await {
            Ok(()) => {
                self.state.lock().unwrap().pending = None;
                self.record_success(resolved.len() as u64);
                self.set_status(SyncStatus::Success, None);
                SyncOutcome::Synced(resolved)
            }
            Err(e) => self.absorb_failure(e),
        }
    }

    /// Decrypts the remote blob, if one exists. Used when a session
    /// unlocks on a device that has not seen the latest remote write.
    pub async fn fetch_remote_set(&self, key: &DerivedKey) -> SyncResult<Option<HashSet<String>>> {
        match self.remote.fetch_encrypted(&self.user).await? {
            Some(blob) => {
                let json = decrypt_string(key, &blob)?;
                Ok(Some(CollectionRecord::parse_ids(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn sync_encrypted(
        &self,
        local: &HashSet<String>,
        key: &DerivedKey,
    ) -> SyncResult<SyncOutcome> {
        let json = CollectionRecord::canonical_json(local)?;
        let blob = encrypt_string(key, &json)?;
        self.remote.save_encrypted(&self.user, &blob).await?;
        self.remote.set_encrypted(&self.user, true).await?;
        Ok(SyncOutcome::Synced(local.clone()))
    }

    async fn sync_plain(
        &self,
        local: &HashSet<String>,
        strategy: ConflictStrategy,
    ) -> SyncResult<SyncOutcome> {
        // Exactly one remote representation is authoritative at a time.
        // While the marker points at the sealed record, any plain record
        // is a stale leftover from before encryption was enabled; merging
        // it would resurrect identifiers removed since. Push local and
        // take the marker back.
        if self.remote.is_encrypted(&self.user).await? {
            self.push_plain(local).await?;
            return Ok(SyncOutcome::Synced(local.clone()));
        }

        let remote = self.remote.fetch_plain(&self.user).await?;

        if has_conflicts(local, &remote) {
            if strategy == ConflictStrategy::Manual {
                tracing::info!(
                    user = %self.user,
                    local = local.len(),
                    remote = remote.len(),
                    "sync conflict held for manual resolution"
                );
                self.state.lock().unwrap().pending = Some(PendingConflict {
                    local: local.clone(),
                    remote,
                });
                return Ok(SyncOutcome::Conflict);
            }
            let resolved = resolve(local, &remote, strategy);
            self.push_plain(&resolved).await?;
            return Ok(SyncOutcome::Synced(resolved));
        }

        // No divergence: fast-forward both sides to the superset.
        let superset: HashSet<String> = local.union(&remote).cloned().collect();
        self.push_plain(&superset).await?;
        Ok(SyncOutcome::Synced(superset))
    }

    async fn push_plain(&self, ids: &HashSet<String>) -> SyncResult<()> {
        self.remote.save_plain(&self.user, ids).await?;
        self.remote.set_encrypted(&self.user, false).await?;
        Ok(())
    }

    fn set_status(&self, status: SyncStatus, error: Option<String>) {
        let mut inner = self.state.lock().unwrap();
        inner.status = status;
        inner.last_error = error;
    }

    fn record_success(&self, item_count: u64) {
        let mut stats = self.stats_store.load(&self.user).unwrap_or_default();
        stats.record_success(item_count);
        if let Err(e) = self.stats_store.save(&self.user, &stats) {
            tracing::warn!(user = %self.user, error = %e, "failed to persist sync stats");
        }
    }

    fn absorb_failure(&self, error: SyncError) -> SyncOutcome {
        tracing::warn!(user = %self.user, error = %error, "sync failed");
        let mut stats = self.stats_store.load(&self.user).unwrap_or_default();
        stats.record_failure();
        if let Err(e) = self.stats_store.save(&self.user, &stats) {
            tracing::warn!(user = %self.user, error = %e, "failed to persist sync stats");
        }
        self.set_status(SyncStatus::Error, Some(error.to_string()));
        SyncOutcome::Failed
    }
}
