//! Sync counters kept per user across sessions.

use chrono::{DateTime, Utc};
use lockmark_storage::{namespace, PersistentStore};
use lockmark_types::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::SyncResult;

/// Aggregate sync counters.
///
/// `items_synced` is the item count of the most recent successful sync,
/// not a running total.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub last_sync_time: Option<DateTime<Utc>>,
    pub total_syncs: u64,
    pub failed_syncs: u64,
    pub items_synced: u64,
}

impl SyncStats {
    pub fn record_success(&mut self, item_count: u64) {
        self.last_sync_time = Some(Utc::now());
        self.total_syncs += 1;
        self.items_synced = item_count;
    }

    pub fn record_failure(&mut self) {
        self.failed_syncs += 1;
    }
}

/// Persists [`SyncStats`] under the per-user stats key.
pub struct SyncStatsStore {
    store: Arc<dyn PersistentStore>,
}

impl SyncStatsStore {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    /// Loads the stats for `user`, or zeroed counters when none exist.
    pub fn load(&self, user: &UserId) -> SyncResult<SyncStats> {
        match self.store.get(&namespace::sync_stats(user))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(SyncStats::default()),
        }
    }

    pub fn save(&self, user: &UserId, stats: &SyncStats) -> SyncResult<()> {
        let raw = serde_json::to_string(stats)?;
        self.store.put(&namespace::sync_stats(user), &raw)?;
        Ok(())
    }

    pub fn reset(&self, user: &UserId) -> SyncResult<()> {
        self.store.remove(&namespace::sync_stats(user))?;
        Ok(())
    }
}
