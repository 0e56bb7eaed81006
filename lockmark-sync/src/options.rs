//! User-tunable sync behavior.

use lockmark_storage::{namespace, PersistentStore};
use lockmark_types::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::conflict::ConflictStrategy;
use crate::error::SyncResult;

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub auto_sync: bool,
    pub sync_interval_secs: u64,
    pub sync_on_change: bool,
    pub sync_on_startup: bool,
    pub conflict_strategy: ConflictStrategy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            auto_sync: false,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            sync_on_change: false,
            sync_on_startup: false,
            conflict_strategy: ConflictStrategy::Merge,
        }
    }
}

/// Partial update applied over stored options. `None` leaves the field
/// as it was.
#[derive(Clone, Debug, Default)]
pub struct SyncOptionsUpdate {
    pub auto_sync: Option<bool>,
    pub sync_interval_secs: Option<u64>,
    pub sync_on_change: Option<bool>,
    pub sync_on_startup: Option<bool>,
    pub conflict_strategy: Option<ConflictStrategy>,
}

impl SyncOptions {
    pub fn merged(&self, update: &SyncOptionsUpdate) -> SyncOptions {
        SyncOptions {
            auto_sync: update.auto_sync.unwrap_or(self.auto_sync),
            sync_interval_secs: update.sync_interval_secs.unwrap_or(self.sync_interval_secs),
            sync_on_change: update.sync_on_change.unwrap_or(self.sync_on_change),
            sync_on_startup: update.sync_on_startup.unwrap_or(self.sync_on_startup),
            conflict_strategy: update.conflict_strategy.unwrap_or(self.conflict_strategy),
        }
    }
}

pub struct SyncOptionsStore {
    store: Arc<dyn PersistentStore>,
}

impl SyncOptionsStore {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    pub fn load(&self, user: &UserId) -> SyncResult<SyncOptions> {
        match self.store.get(&namespace::sync_options(user))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(SyncOptions::default()),
        }
    }

    pub fn save(&self, user: &UserId, options: &SyncOptions) -> SyncResult<()> {
        let raw = serde_json::to_string(options)?;
        self.store.put(&namespace::sync_options(user), &raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockmark_storage::MemoryStore;

    #[test]
    fn defaults_are_conservative() {
        let opts = SyncOptions::default();
        assert!(!opts.auto_sync);
        assert!(!opts.sync_on_change);
        assert!(!opts.sync_on_startup);
        assert_eq!(opts.sync_interval_secs, 300);
        assert_eq!(opts.conflict_strategy, ConflictStrategy::Merge);
    }

    #[test]
    fn merge_overrides_only_supplied_fields() {
        let base = SyncOptions::default();
        let merged = base.merged(&SyncOptionsUpdate {
            auto_sync: Some(true),
            sync_interval_secs: Some(60),
            ..Default::default()
        });
        assert!(merged.auto_sync);
        assert_eq!(merged.sync_interval_secs, 60);
        assert_eq!(merged.sync_on_change, base.sync_on_change);
        assert_eq!(merged.conflict_strategy, base.conflict_strategy);
    }

    #[test]
    fn store_returns_defaults_when_absent() {
        let store = SyncOptionsStore::new(Arc::new(MemoryStore::new()));
        let user = UserId::from("opts-user");
        assert_eq!(store.load(&user).unwrap(), SyncOptions::default());

        let mut opts = SyncOptions::default();
        opts.auto_sync = true;
        opts.conflict_strategy = ConflictStrategy::Manual;
        store.save(&user, &opts).unwrap();
        assert_eq!(store.load(&user).unwrap(), opts);
    }
}
