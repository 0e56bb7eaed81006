//! End-to-end facade tests: session lifecycle, encryption setup and
//! unlock, optimistic mutations, and sync orchestration.

use lockmark_collection::{CollectionError, EncryptionStatus, FavoritesStore};
use lockmark_crypto::KdfParams;
use lockmark_storage::{EncryptionSettingsStore, KeyPackageStore, MemoryStore};
use lockmark_sync::{ConflictStrategy, MemoryRemoteStore, RemoteStore, SyncOptionsUpdate};
use lockmark_types::UserId;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn fast_params() -> KdfParams {
    KdfParams {
        m_cost: 8 * 1024,
        t_cost: 1,
        p_cost: 1,
    }
}

fn facade(store: Arc<MemoryStore>, remote: Arc<MemoryRemoteStore>) -> FavoritesStore {
    FavoritesStore::with_kdf_params(store, remote, fast_params())
}

fn ids(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn setup_add_logout_unlock_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemoteStore::new());
    let favorites = facade(store.clone(), remote.clone());
    let user = UserId::from("alice");

    favorites.start(user.clone()).await.unwrap();
    assert_eq!(favorites.encryption_status(), EncryptionStatus::Disabled);

    assert!(
        favorites
            .setup_encryption("correct-horse", Some("equine".to_string()))
            .await
    );
    assert_eq!(favorites.encryption_status(), EncryptionStatus::Enabled);

    favorites.add_favorite("slack").await.unwrap();
    favorites.add_favorite("stripe").await.unwrap();
    assert_eq!(favorites.favorites_data(), vec!["slack", "stripe"]);

    // Logout destroys the key and the in-memory set.
    favorites.stop().await;
    assert!(favorites.favorites_data().is_empty());

    // Login again: enabled but locked until the passphrase is supplied.
    favorites.start(user.clone()).await.unwrap();
    assert_eq!(favorites.encryption_status(), EncryptionStatus::Error);
    assert!(favorites.favorites_data().is_empty());

    assert!(!favorites.unlock_encryption("wrong-pass").await);
    assert_eq!(favorites.encryption_status(), EncryptionStatus::Error);
    assert!(favorites.favorites_data().is_empty());

    assert!(favorites.unlock_encryption("correct-horse").await);
    assert_eq!(favorites.encryption_status(), EncryptionStatus::Enabled);
    assert_eq!(favorites.favorites_data(), vec!["slack", "stripe"]);
}

#[tokio::test]
async fn set_semantics_are_idempotent() {
    let favorites = facade(Arc::new(MemoryStore::new()), Arc::new(MemoryRemoteStore::new()));
    favorites.start(UserId::from("bob")).await.unwrap();

    favorites.add_favorite("slack").await.unwrap();
    favorites.add_favorite("slack").await.unwrap();
    assert_eq!(favorites.favorites_data(), vec!["slack"]);

    assert!(!favorites.toggle_favorite("slack").await.unwrap());
    assert!(favorites.toggle_favorite("slack").await.unwrap());
    assert_eq!(favorites.favorites_data(), vec!["slack"]);
    assert!(favorites.is_favorite("slack"));
    assert!(!favorites.is_favorite("stripe"));

    favorites.clear_favorites().await.unwrap();
    assert!(favorites.favorites_data().is_empty());
}

#[tokio::test]
async fn mutations_are_refused_while_locked() {
    let store = Arc::new(MemoryStore::new());
    let favorites = facade(store.clone(), Arc::new(MemoryRemoteStore::new()));
    let user = UserId::from("carol");

    favorites.start(user.clone()).await.unwrap();
    assert!(favorites.setup_encryption("correct-horse", None).await);
    favorites.add_favorite("slack").await.unwrap();
    favorites.stop().await;

    favorites.start(user).await.unwrap();
    let err = favorites.add_favorite("stripe").await.unwrap_err();
    assert!(matches!(err, CollectionError::Locked));
}

#[tokio::test]
async fn dirty_tracking_follows_sync() {
    let favorites = facade(Arc::new(MemoryStore::new()), Arc::new(MemoryRemoteStore::new()));
    favorites.start(UserId::from("dave")).await.unwrap();

    assert!(!favorites.has_pending_changes());
    favorites.add_favorite("slack").await.unwrap();
    assert!(favorites.has_pending_changes());

    assert!(favorites.sync_with_cloud().await);
    assert!(!favorites.has_pending_changes());

    let stats = favorites.sync_stats();
    assert_eq!(stats.total_syncs, 1);
    assert_eq!(stats.items_synced, 1);
}

#[tokio::test]
async fn plain_sync_adopts_remote_additions() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let user = UserId::from("erin");
    remote
        .save_plain(&user, &ids(&["notion", "slack"]))
        .await
        .unwrap();

    let favorites = facade(Arc::new(MemoryStore::new()), remote.clone());
    favorites.start(user.clone()).await.unwrap();
    favorites.add_favorite("slack").await.unwrap();

    assert!(favorites.sync_with_cloud().await);
    assert_eq!(favorites.favorites_data(), vec!["notion", "slack"]);
    assert_eq!(
        remote.fetch_plain(&user).await.unwrap(),
        ids(&["notion", "slack"])
    );
}

#[tokio::test]
async fn manual_conflict_is_held_and_resolved_through_facade() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let user = UserId::from("frank");
    remote.save_plain(&user, &ids(&["a", "b"])).await.unwrap();

    let favorites = facade(Arc::new(MemoryStore::new()), remote.clone());
    favorites.start(user.clone()).await.unwrap();
    favorites
        .update_sync_options(&SyncOptionsUpdate {
            conflict_strategy: Some(ConflictStrategy::Manual),
            ..Default::default()
        })
        .unwrap();
    favorites.add_favorite("a").await.unwrap();
    favorites.add_favorite("c").await.unwrap();

    assert!(!favorites.sync_with_cloud().await);
    assert!(favorites.has_pending_conflict());

    assert!(favorites.resolve_sync_conflict(ConflictStrategy::Merge).await);
    assert!(!favorites.has_pending_conflict());
    assert_eq!(favorites.favorites_data(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn disable_returns_to_cleartext_everywhere() {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemoteStore::new());
    let favorites = facade(store.clone(), remote.clone());
    let user = UserId::from("grace");

    favorites.start(user.clone()).await.unwrap();
    assert!(favorites.setup_encryption("correct-horse", None).await);
    favorites.add_favorite("slack").await.unwrap();
    assert!(favorites.sync_with_cloud().await);
    assert!(remote.is_encrypted(&user).await.unwrap());

    assert!(favorites.disable_encryption().await);
    assert_eq!(favorites.encryption_status(), EncryptionStatus::Disabled);
    assert!(!remote.is_encrypted(&user).await.unwrap());
    assert_eq!(remote.fetch_plain(&user).await.unwrap(), ids(&["slack"]));

    // No package left: a later unlock attempt cannot succeed.
    assert!(!favorites.unlock_encryption("correct-horse").await);
}

#[tokio::test]
async fn disable_does_not_resurrect_removed_favorites() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let favorites = facade(Arc::new(MemoryStore::new()), remote.clone());
    let user = UserId::from("olga");

    favorites.start(user.clone()).await.unwrap();
    favorites.add_favorite("a").await.unwrap();
    favorites.add_favorite("b").await.unwrap();
    favorites.add_favorite("c").await.unwrap();
    assert!(favorites.sync_with_cloud().await);

    // Encryption takes over, then "c" is removed and synced sealed.
    assert!(favorites.setup_encryption("correct-horse", None).await);
    favorites.remove_favorite("c").await.unwrap();
    assert!(favorites.sync_with_cloud().await);

    // Disabling must not merge the stale plaintext record back in.
    assert!(favorites.disable_encryption().await);
    assert_eq!(favorites.favorites_data(), vec!["a", "b"]);
    assert_eq!(remote.fetch_plain(&user).await.unwrap(), ids(&["a", "b"]));
    assert!(!favorites.has_pending_changes());
}

/// Remote that stalls on the plain fetch so two sync requests overlap.
struct SlowRemote {
    inner: MemoryRemoteStore,
    delay: Duration,
}

#[async_trait::async_trait]
impl lockmark_sync::RemoteStore for SlowRemote {
    async fn fetch_plain(
        &self,
        user: &UserId,
    ) -> lockmark_sync::SyncResult<HashSet<String>> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_plain(user).await
    }

    async fn save_plain(
        &self,
        user: &UserId,
        ids: &HashSet<String>,
    ) -> lockmark_sync::SyncResult<()> {
        self.inner.save_plain(user, ids).await
    }

    async fn fetch_encrypted(&self, user: &UserId) -> lockmark_sync::SyncResult<Option<String>> {
        self.inner.fetch_encrypted(user).await
    }

    async fn save_encrypted(&self, user: &UserId, blob: &str) -> lockmark_sync::SyncResult<()> {
        self.inner.save_encrypted(user, blob).await
    }

    async fn is_encrypted(&self, user: &UserId) -> lockmark_sync::SyncResult<bool> {
        self.inner.is_encrypted(user).await
    }

    async fn set_encrypted(&self, user: &UserId, encrypted: bool) -> lockmark_sync::SyncResult<()> {
        self.inner.set_encrypted(user, encrypted).await
    }
}

#[tokio::test(flavor = "current_thread")]
async fn concurrent_sync_requests_coalesce_without_starving() {
    let remote = Arc::new(SlowRemote {
        inner: MemoryRemoteStore::new(),
        delay: Duration::from_millis(100),
    });
    let favorites = FavoritesStore::with_kdf_params(
        Arc::new(MemoryStore::new()),
        remote,
        fast_params(),
    );
    favorites.start(UserId::from("pia")).await.unwrap();
    favorites.add_favorite("slack").await.unwrap();

    let first = {
        let favorites = favorites.clone();
        tokio::spawn(async move { favorites.sync_with_cloud().await })
    };

    // Let the first request take the engine, then overlap a second one.
    // On a cooperative runtime it must return promptly as queued, not
    // spin while the first holds the engine.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second =
        tokio::time::timeout(Duration::from_secs(5), favorites.sync_with_cloud()).await;
    assert!(second.expect("queued sync request should return promptly"));

    assert!(first.await.unwrap());
    // One in-flight run plus exactly one queued re-run.
    assert_eq!(favorites.sync_stats().total_syncs, 2);
    assert!(!favorites.has_pending_changes());
}

#[tokio::test]
async fn relogin_without_stop_drops_previous_session_key() {
    let store = Arc::new(MemoryStore::new());
    let favorites = facade(store.clone(), Arc::new(MemoryRemoteStore::new()));
    let alice = UserId::from("alice");

    favorites.start(alice.clone()).await.unwrap();
    assert!(favorites.setup_encryption("correct-horse", None).await);
    favorites.add_favorite("slack").await.unwrap();

    // Account switch without an intervening stop.
    favorites.start(UserId::from("bob")).await.unwrap();
    assert_eq!(favorites.encryption_status(), EncryptionStatus::Disabled);
    favorites.add_favorite("notion").await.unwrap();

    // Alice again: her key from the earlier session must be gone.
    favorites.start(alice).await.unwrap();
    assert_eq!(favorites.encryption_status(), EncryptionStatus::Error);
    assert!(favorites.favorites_data().is_empty());

    assert!(favorites.unlock_encryption("correct-horse").await);
    assert_eq!(favorites.favorites_data(), vec!["slack"]);
}

#[tokio::test]
async fn passphrase_change_reseal_survives_relogin() {
    let store = Arc::new(MemoryStore::new());
    let favorites = facade(store.clone(), Arc::new(MemoryRemoteStore::new()));
    let user = UserId::from("nina");

    favorites.start(user.clone()).await.unwrap();
    assert!(favorites.setup_encryption("correct-horse", None).await);
    favorites.add_favorite("slack").await.unwrap();

    // Wrong current passphrase is refused.
    assert!(!favorites.change_passphrase("wrong-pass", "battery-staple").await);
    assert!(favorites.change_passphrase("correct-horse", "battery-staple").await);
    favorites.stop().await;

    favorites.start(user).await.unwrap();
    assert!(!favorites.unlock_encryption("correct-horse").await);
    assert!(favorites.unlock_encryption("battery-staple").await);
    assert_eq!(favorites.favorites_data(), vec!["slack"]);
}

#[tokio::test]
async fn short_passphrase_is_rejected() {
    let favorites = facade(Arc::new(MemoryStore::new()), Arc::new(MemoryRemoteStore::new()));
    favorites.start(UserId::from("henry")).await.unwrap();
    assert!(!favorites.setup_encryption("short", None).await);
    assert_eq!(favorites.encryption_status(), EncryptionStatus::Disabled);
}

#[tokio::test]
async fn fresh_device_pulls_remote_blob_on_unlock() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let user = UserId::from("iris");

    // Device A: set up encryption, add favorites, push.
    let store_a = Arc::new(MemoryStore::new());
    let device_a = facade(store_a.clone(), remote.clone());
    device_a.start(user.clone()).await.unwrap();
    assert!(device_a.setup_encryption("correct-horse", None).await);
    device_a.add_favorite("slack").await.unwrap();
    device_a.add_favorite("stripe").await.unwrap();
    assert!(device_a.sync_with_cloud().await);
    device_a.stop().await;

    // Device B: empty local store; account provisioning copies the key
    // package and settings, collection data arrives via the remote.
    let store_b: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let package = KeyPackageStore::new(store_a.clone())
        .load(&user)
        .unwrap()
        .unwrap();
    KeyPackageStore::new(store_b.clone()).save(&user, &package).unwrap();
    let settings = EncryptionSettingsStore::new(store_a.clone()).load(&user).unwrap();
    EncryptionSettingsStore::new(store_b.clone())
        .save(&user, &settings)
        .unwrap();

    let device_b = facade(store_b, remote.clone());
    device_b.start(user).await.unwrap();
    assert_eq!(device_b.encryption_status(), EncryptionStatus::Error);

    assert!(device_b.unlock_encryption("correct-horse").await);
    assert_eq!(device_b.favorites_data(), vec!["slack", "stripe"]);
}

#[tokio::test]
async fn encrypted_sync_overwrites_without_conflict() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let user = UserId::from("judy");
    // Stale plaintext remote that would conflict on the plain path.
    remote.save_plain(&user, &ids(&["x", "y"])).await.unwrap();

    let favorites = facade(Arc::new(MemoryStore::new()), remote.clone());
    favorites.start(user.clone()).await.unwrap();
    assert!(favorites.setup_encryption("correct-horse", None).await);
    favorites.add_favorite("slack").await.unwrap();

    assert!(favorites.sync_with_cloud().await);
    assert!(!favorites.has_pending_conflict());
    assert_eq!(favorites.favorites_data(), vec!["slack"]);
    assert!(remote.is_encrypted(&user).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn auto_sync_timer_syncs_only_when_dirty() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let favorites = facade(Arc::new(MemoryStore::new()), remote.clone());
    favorites.start(UserId::from("kate")).await.unwrap();

    favorites
        .update_sync_options(&SyncOptionsUpdate {
            auto_sync: Some(true),
            sync_interval_secs: Some(1),
            ..Default::default()
        })
        .unwrap();

    // Clean set: ticks pass without syncing.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(favorites.sync_stats().total_syncs, 0);

    favorites.add_favorite("slack").await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(favorites.sync_stats().total_syncs, 1);
    assert!(!favorites.has_pending_changes());

    favorites.stop().await;
}

#[tokio::test]
async fn favorites_survive_a_duckdb_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lockmark.db");
    let user = UserId::from("mona");

    {
        let store: Arc<lockmark_storage::DuckDbStore> =
            Arc::new(lockmark_storage::DuckDbStore::open(&path).unwrap());
        let favorites = FavoritesStore::with_kdf_params(
            store,
            Arc::new(MemoryRemoteStore::new()),
            fast_params(),
        );
        favorites.start(user.clone()).await.unwrap();
        favorites.add_favorite("slack").await.unwrap();
        favorites.stop().await;
    }

    let store: Arc<lockmark_storage::DuckDbStore> =
        Arc::new(lockmark_storage::DuckDbStore::open(&path).unwrap());
    let favorites = FavoritesStore::with_kdf_params(
        store,
        Arc::new(MemoryRemoteStore::new()),
        fast_params(),
    );
    favorites.start(user).await.unwrap();
    assert_eq!(favorites.favorites_data(), vec!["slack"]);
}

#[tokio::test]
async fn startup_sync_pulls_remote_state() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let user = UserId::from("liam");
    remote.save_plain(&user, &ids(&["slack"])).await.unwrap();

    let store = Arc::new(MemoryStore::new());
    let favorites = facade(store.clone(), remote.clone());
    favorites.start(user.clone()).await.unwrap();
    favorites
        .update_sync_options(&SyncOptionsUpdate {
            sync_on_startup: Some(true),
            ..Default::default()
        })
        .unwrap();
    favorites.stop().await;

    favorites.start(user).await.unwrap();
    assert_eq!(favorites.favorites_data(), vec!["slack"]);
}
