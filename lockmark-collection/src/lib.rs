//! Favorites collection facade.
//!
//! The one entry point the application layer talks to: a plaintext set of
//! item identifiers with optional passphrase-based encryption and remote
//! synchronization behind it. Session lifecycle is explicit — the login
//! collaborator calls [`FavoritesStore::start`] and
//! [`FavoritesStore::stop`]; nothing here reacts to events on its own
//! except the timer it was asked to arm.
//!
//! Mutations are optimistic: applied to the in-memory set and persisted
//! locally first, synced afterwards. The UI never waits on the network.

use lockmark_crypto::{
    create_key_package, encrypt_string, ensure_available, verify_passphrase, DerivedKey, KdfParams,
};
use lockmark_storage::{
    CollectionRecord, CollectionRecordStore, EncryptionSettings, EncryptionSettingsStore,
    EncryptionSettingsUpdate, KeyPackageStore, PersistentStore,
};
use lockmark_sync::{
    ConflictStrategy, RemoteStore, SyncEngine, SyncOptions, SyncOptionsStore, SyncOptionsUpdate,
    SyncOutcome, SyncStats, SyncStatsStore, SyncStatus,
};
use lockmark_types::UserId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

// ============================================================================
// Error types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("no active session")]
    NotStarted,
    #[error("encryption is enabled but the session is locked")]
    Locked,
    #[error("encryption unavailable on this platform")]
    EncryptionUnavailable,
    #[error("passphrase too short (min 8 characters)")]
    PassphraseTooShort,
    #[error("encryption enabled but no key package persisted")]
    KeyPackageMissing,
    #[error("invalid passphrase")]
    InvalidPassphrase,
    #[error("storage error: {0}")]
    Storage(#[from] lockmark_storage::StorageError),
    #[error("crypto error: {0}")]
    Crypto(#[from] lockmark_crypto::CryptoError),
    #[error("sync error: {0}")]
    Sync(#[from] lockmark_sync::SyncError),
}

pub type CollectionResult<T> = Result<T, CollectionError>;

/// Encryption feature state as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionStatus {
    /// Feature off; data stored and synced in cleartext.
    Disabled,
    /// Setup in progress (key derivation, initial seal).
    Initializing,
    /// Enabled and unlocked for this session.
    Enabled,
    /// Enabled but unusable: locked, key package missing, or the
    /// crypto self-test failed. The set is not exposed in this state.
    Error,
}

// ============================================================================
// FavoritesStore — the facade
// ============================================================================

/// Result of one engine run from the facade's point of view: either the
/// engine was acquired and ran to an outcome, or it was already held.
enum SyncAttempt {
    Done(bool),
    Busy,
}

/// Per-session state. Dropped wholesale on `stop`.
struct Session {
    user: UserId,
    favorites: HashSet<String>,
    /// Snapshot of the set at the last successful sync; dirty tracking
    /// compares against this, never against the remote.
    last_synced: HashSet<String>,
    /// Encrypted local payload waiting for an unlock to open it.
    sealed_payload: Option<String>,
    options: SyncOptions,
    engine: Arc<SyncEngine>,
    crypto_ok: bool,
}

struct Shared {
    store: Arc<dyn PersistentStore>,
    remote: Arc<dyn RemoteStore>,
    settings_store: EncryptionSettingsStore,
    key_package_store: KeyPackageStore,
    record_store: CollectionRecordStore,
    options_store: SyncOptionsStore,
    kdf_params: KdfParams,
    session: RwLock<Option<Session>>,
    /// Session key material. Created on setup/unlock, dropped (zeroized)
    /// on stop or disable. Never serialized.
    key: RwLock<Option<DerivedKey>>,
    initializing: AtomicBool,
    /// Set when a sync request arrives while one is in flight; the
    /// in-flight runner drains it with a fresh snapshot when done.
    sync_queued: AtomicBool,
    auto_sync_task: Mutex<Option<JoinHandle<()>>>,
}

/// The collection facade. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct FavoritesStore {
    shared: Arc<Shared>,
}

impl FavoritesStore {
    pub fn new(store: Arc<dyn PersistentStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self::with_kdf_params(store, remote, KdfParams::default())
    }

    /// Variant with explicit KDF costs, for tests that cannot afford the
    /// production Argon2id parameters.
    pub fn with_kdf_params(
        store: Arc<dyn PersistentStore>,
        remote: Arc<dyn RemoteStore>,
        kdf_params: KdfParams,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings_store: EncryptionSettingsStore::new(store.clone()),
                key_package_store: KeyPackageStore::new(store.clone()),
                record_store: CollectionRecordStore::new(store.clone()),
                options_store: SyncOptionsStore::new(store.clone()),
                store,
                remote,
                kdf_params,
                session: RwLock::new(None),
                key: RwLock::new(None),
                initializing: AtomicBool::new(false),
                sync_queued: AtomicBool::new(false),
                auto_sync_task: Mutex::new(None),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Begins a session for `user`: loads settings, options, and the local
    /// record, arms the auto-sync timer, and runs a startup sync when the
    /// options ask for one. Must complete before dependent UI reads.
    pub async fn start(&self, user: UserId) -> CollectionResult<()> {
        // A session never inherits key material or a queued sync request
        // from the one before it, stop or no stop in between.
        *self.shared.key.write().unwrap() = None;
        self.shared.sync_queued.store(false, Ordering::SeqCst);

        let crypto_ok = match ensure_available() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "crypto self-test failed, encryption unavailable");
                false
            }
        };

        let options = self.shared.options_store.load(&user)?;
        let record = self.shared.record_store.load(&user)?;

        let (favorites, sealed_payload) = match record {
            None => (HashSet::new(), None),
            Some(r) if r.encrypted => (HashSet::new(), Some(r.payload)),
            Some(r) => (r.parse_plain()?, None),
        };

        let engine = Arc::new(SyncEngine::new(
            self.shared.remote.clone(),
            SyncStatsStore::new(self.shared.store.clone()),
            user.clone(),
        ));

        let sync_on_startup = options.sync_on_startup;
        {
            let mut session = self.shared.session.write().unwrap();
            *session = Some(Session {
                user,
                last_synced: favorites.clone(),
                favorites,
                sealed_payload,
                options: options.clone(),
                engine,
                crypto_ok,
            });
        }

        self.arm_auto_sync(&options);

        if sync_on_startup && !self.is_locked() {
            self.sync_with_cloud().await;
        }

        Ok(())
    }

    /// Ends the session: disarms the timer, destroys key material, and
    /// clears the in-memory set.
    pub async fn stop(&self) {
        if let Some(task) = self.shared.auto_sync_task.lock().unwrap().take() {
            task.abort();
        }
        *self.shared.key.write().unwrap() = None;
        *self.shared.session.write().unwrap() = None;
        self.shared.sync_queued.store(false, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // Plaintext set model
    // ------------------------------------------------------------------

    pub fn is_favorite(&self, id: &str) -> bool {
        let session = self.shared.session.read().unwrap();
        session
            .as_ref()
            .map(|s| s.favorites.contains(id))
            .unwrap_or(false)
    }

    /// Sorted view of the set for display.
    pub fn favorites_data(&self) -> Vec<String> {
        let session = self.shared.session.read().unwrap();
        let mut ids: Vec<String> = session
            .as_ref()
            .map(|s| s.favorites.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Flips membership of `id` and returns the new membership.
    pub async fn toggle_favorite(&self, id: &str) -> CollectionResult<bool> {
        let now_member = self.mutate(|favorites| {
            if favorites.remove(id) {
                false
            } else {
                favorites.insert(id.to_string());
                true
            }
        })?;
        self.after_mutation().await?;
        Ok(now_member)
    }

    pub async fn add_favorite(&self, id: &str) -> CollectionResult<()> {
        self.mutate(|favorites| {
            favorites.insert(id.to_string());
        })?;
        self.after_mutation().await
    }

    pub async fn remove_favorite(&self, id: &str) -> CollectionResult<()> {
        self.mutate(|favorites| {
            favorites.remove(id);
        })?;
        self.after_mutation().await
    }

    pub async fn clear_favorites(&self) -> CollectionResult<()> {
        self.mutate(|favorites| favorites.clear())?;
        self.after_mutation().await
    }

    /// Whether the set has changed since the last successful sync.
    pub fn has_pending_changes(&self) -> bool {
        let session = self.shared.session.read().unwrap();
        session
            .as_ref()
            .map(|s| s.favorites != s.last_synced)
            .unwrap_or(false)
    }

    /// Applies `f` to the in-memory set. Refused while locked: the set is
    /// not exposed until the session key exists.
    fn mutate<R>(&self, f: impl FnOnce(&mut HashSet<String>) -> R) -> CollectionResult<R> {
        if self.is_locked() {
            return Err(CollectionError::Locked);
        }
        let mut session = self.shared.session.write().unwrap();
        let session = session.as_mut().ok_or(CollectionError::NotStarted)?;
        Ok(f(&mut session.favorites))
    }

    /// Persists the mutated set locally, then evaluates `sync_on_change`.
    /// The local write happens before any sync reflecting it begins.
    async fn after_mutation(&self) -> CollectionResult<()> {
        let (user, favorites, options) = {
            let session = self.shared.session.read().unwrap();
            let session = session.as_ref().ok_or(CollectionError::NotStarted)?;
            (
                session.user.clone(),
                session.favorites.clone(),
                session.options.clone(),
            )
        };

        self.persist_record(&user, &favorites)?;

        if options.sync_on_change {
            let this = self.clone();
            tokio::spawn(async move {
                this.sync_with_cloud().await;
            });
        }
        Ok(())
    }

    /// Writes the local record, sealed when encryption is active.
    fn persist_record(&self, user: &UserId, favorites: &HashSet<String>) -> CollectionResult<()> {
        let settings = self.shared.settings_store.load(user)?;
        let key = self.shared.key.read().unwrap().clone();

        let record = match key {
            Some(key) if settings.enabled && settings.auto_encrypt => {
                let json = CollectionRecord::canonical_json(favorites)?;
                CollectionRecord::sealed(encrypt_string(&key, &json)?)
            }
            _ => CollectionRecord::plain(favorites)?,
        };
        self.shared.record_store.save(user, &record)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Encryption lifecycle
    // ------------------------------------------------------------------

    pub fn encryption_status(&self) -> EncryptionStatus {
        if self.shared.initializing.load(Ordering::SeqCst) {
            return EncryptionStatus::Initializing;
        }

        let session = self.shared.session.read().unwrap();
        let session = match session.as_ref() {
            Some(s) => s,
            None => return EncryptionStatus::Disabled,
        };

        let settings = match self.shared.settings_store.load(&session.user) {
            Ok(s) => s,
            Err(_) => return EncryptionStatus::Error,
        };
        if !settings.enabled {
            return EncryptionStatus::Disabled;
        }
        if !session.crypto_ok {
            return EncryptionStatus::Error;
        }
        match self.shared.key_package_store.load(&session.user) {
            Ok(Some(_)) => {}
            // Enabled without a package: re-setup required.
            _ => return EncryptionStatus::Error,
        }
        if self.shared.key.read().unwrap().is_some() {
            EncryptionStatus::Enabled
        } else {
            EncryptionStatus::Error
        }
    }

    /// Enabled but no session key yet (or crypto unavailable).
    fn is_locked(&self) -> bool {
        let session = self.shared.session.read().unwrap();
        let session = match session.as_ref() {
            Some(s) => s,
            None => return false,
        };
        let enabled = self
            .shared
            .settings_store
            .load(&session.user)
            .map(|s| s.enabled)
            .unwrap_or(false);
        enabled && self.shared.key.read().unwrap().is_none()
    }

    /// First-time encryption setup. Derives the key, seals a fresh key
    /// package, re-encrypts the local record, and pushes it. Returns
    /// `false` on any failure, with the cause logged.
    pub async fn setup_encryption(&self, passphrase: &str, hint: Option<String>) -> bool {
        match self.try_setup_encryption(passphrase, hint).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "encryption setup failed");
                self.shared.initializing.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    async fn try_setup_encryption(
        &self,
        passphrase: &str,
        hint: Option<String>,
    ) -> CollectionResult<()> {
        if passphrase.len() < 8 {
            return Err(CollectionError::PassphraseTooShort);
        }

        let (user, favorites, engine, options, crypto_ok) = {
            let session = self.shared.session.read().unwrap();
            let session = session.as_ref().ok_or(CollectionError::NotStarted)?;
            (
                session.user.clone(),
                session.favorites.clone(),
                session.engine.clone(),
                session.options.clone(),
                session.crypto_ok,
            )
        };
        if !crypto_ok {
            return Err(CollectionError::EncryptionUnavailable);
        }

        self.shared.initializing.store(true, Ordering::SeqCst);

        // Key derivation is CPU-bound; keep it off the async workers.
        let params = self.shared.kdf_params;
        let pass = passphrase.to_string();
        let (package, key) =
            tokio::task::spawn_blocking(move || create_key_package(&pass, &params))
                .await
                .map_err(|e| CollectionError::Crypto(
                    lockmark_crypto::CryptoError::KeyDerivation(e.to_string()),
                ))??;

        self.shared.key_package_store.save(&user, &package)?;
        let settings = self.shared.settings_store.load(&user)?;
        self.shared.settings_store.save(
            &user,
            &settings.merged(&EncryptionSettingsUpdate {
                enabled: Some(true),
                password_hint: Some(hint),
                ..Default::default()
            }),
        )?;
        *self.shared.key.write().unwrap() = Some(key);

        self.persist_record(&user, &favorites)?;
        self.shared.initializing.store(false, Ordering::SeqCst);

        // First encrypted push makes the remote authoritative record
        // the sealed one.
        let key = self.shared.key.read().unwrap().clone();
        engine
            .sync(&favorites, key.as_ref(), options.conflict_strategy)
            .await;
        Ok(())
    }

    /// Unlocks an existing encryption setup with a passphrase attempt.
    ///
    /// Success retains the key and opens the local record (falling back
    /// to the remote blob for a device that has no local copy yet).
    /// A wrong passphrase returns `false` and leaves the status at
    /// `Error`; it is never an error condition.
    pub async fn unlock_encryption(&self, passphrase: &str) -> bool {
        match self.try_unlock_encryption(passphrase).await {
            Ok(unlocked) => unlocked,
            Err(e) => {
                tracing::warn!(error = %e, "unlock failed");
                false
            }
        }
    }

    async fn try_unlock_encryption(&self, passphrase: &str) -> CollectionResult<bool> {
        let (user, engine) = {
            let session = self.shared.session.read().unwrap();
            let session = session.as_ref().ok_or(CollectionError::NotStarted)?;
            (session.user.clone(), session.engine.clone())
        };

        let package = self
            .shared
            .key_package_store
            .load(&user)?
            .ok_or(CollectionError::KeyPackageMissing)?;

        let params = self.shared.kdf_params;
        let pass = passphrase.to_string();
        let verified =
            tokio::task::spawn_blocking(move || verify_passphrase(&pass, &package, &params))
                .await
                .map_err(|e| CollectionError::Crypto(
                    lockmark_crypto::CryptoError::KeyDerivation(e.to_string()),
                ))??;

        let key = match verified {
            Some(key) => key,
            None => return Ok(false),
        };

        // Open the local sealed record, or pull the remote blob when this
        // device has never held one.
        let sealed = {
            let session = self.shared.session.read().unwrap();
            session
                .as_ref()
                .and_then(|s| s.sealed_payload.clone())
        };
        let favorites = match sealed {
            Some(blob) => {
                let json = lockmark_crypto::decrypt_string(&key, &blob)?;
                CollectionRecord::parse_ids(&json)?
            }
            None => engine.fetch_remote_set(&key).await?.unwrap_or_default(),
        };

        *self.shared.key.write().unwrap() = Some(key);
        {
            let mut session = self.shared.session.write().unwrap();
            if let Some(session) = session.as_mut() {
                session.favorites = favorites.clone();
                session.last_synced = favorites.clone();
                session.sealed_payload = None;
            }
        }
        self.persist_record(&user, &favorites)?;
        Ok(true)
    }

    /// Replaces the passphrase: verifies the old one, then seals a fresh
    /// key package (new salt, new key) and re-encrypts local and remote
    /// records under it. Requires an unlocked session.
    pub async fn change_passphrase(&self, old: &str, new: &str) -> bool {
        match self.try_change_passphrase(old, new).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "passphrase change failed");
                false
            }
        }
    }

    async fn try_change_passphrase(&self, old: &str, new: &str) -> CollectionResult<()> {
        if new.len() < 8 {
            return Err(CollectionError::PassphraseTooShort);
        }
        if self.is_locked() {
            return Err(CollectionError::Locked);
        }
        let (user, favorites, engine, options) = {
            let session = self.shared.session.read().unwrap();
            let session = session.as_ref().ok_or(CollectionError::NotStarted)?;
            (
                session.user.clone(),
                session.favorites.clone(),
                session.engine.clone(),
                session.options.clone(),
            )
        };

        let package = self
            .shared
            .key_package_store
            .load(&user)?
            .ok_or(CollectionError::KeyPackageMissing)?;

        let params = self.shared.kdf_params;
        let old_pass = old.to_string();
        let verified =
            tokio::task::spawn_blocking(move || verify_passphrase(&old_pass, &package, &params))
                .await
                .map_err(|e| CollectionError::Crypto(
                    lockmark_crypto::CryptoError::KeyDerivation(e.to_string()),
                ))??;
        if verified.is_none() {
            return Err(CollectionError::InvalidPassphrase);
        }

        let new_pass = new.to_string();
        let (new_package, new_key) =
            tokio::task::spawn_blocking(move || create_key_package(&new_pass, &params))
                .await
                .map_err(|e| CollectionError::Crypto(
                    lockmark_crypto::CryptoError::KeyDerivation(e.to_string()),
                ))??;

        self.shared.key_package_store.save(&user, &new_package)?;
        *self.shared.key.write().unwrap() = Some(new_key);

        self.persist_record(&user, &favorites)?;
        let key = self.shared.key.read().unwrap().clone();
        engine
            .sync(&favorites, key.as_ref(), options.conflict_strategy)
            .await;
        Ok(())
    }

    /// Turns encryption off: rewrites local and remote records in
    /// cleartext, deletes the key package, and destroys the session key.
    /// Requires an unlocked session.
    pub async fn disable_encryption(&self) -> bool {
        match self.try_disable_encryption().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "disable encryption failed");
                false
            }
        }
    }

    async fn try_disable_encryption(&self) -> CollectionResult<()> {
        if self.is_locked() {
            return Err(CollectionError::Locked);
        }
        let (user, favorites, engine, options) = {
            let session = self.shared.session.read().unwrap();
            let session = session.as_ref().ok_or(CollectionError::NotStarted)?;
            (
                session.user.clone(),
                session.favorites.clone(),
                session.engine.clone(),
                session.options.clone(),
            )
        };

        let settings = self.shared.settings_store.load(&user)?;
        self.shared.settings_store.save(
            &user,
            &settings.merged(&EncryptionSettingsUpdate {
                enabled: Some(false),
                ..Default::default()
            }),
        )?;
        self.shared.key_package_store.delete(&user)?;
        *self.shared.key.write().unwrap() = None;

        self.persist_record(&user, &favorites)?;
        if let SyncOutcome::Synced(agreed) =
            engine.sync(&favorites, None, options.conflict_strategy).await
        {
            self.adopt_synced(&user, agreed);
        }
        Ok(())
    }

    pub fn update_encryption_settings(
        &self,
        update: &EncryptionSettingsUpdate,
    ) -> CollectionResult<EncryptionSettings> {
        let user = self.current_user()?;
        let merged = self.shared.settings_store.load(&user)?.merged(update);
        self.shared.settings_store.save(&user, &merged)?;
        Ok(merged)
    }

    pub fn encryption_settings(&self) -> CollectionResult<EncryptionSettings> {
        let user = self.current_user()?;
        Ok(self.shared.settings_store.load(&user)?)
    }

    // ------------------------------------------------------------------
    // Sync orchestration
    // ------------------------------------------------------------------

    /// Runs one sync, coalescing concurrent requests.
    ///
    /// If a sync is already in flight the request is queued (at most
    /// once) and this call returns immediately; the caller that holds the
    /// engine drains the queue with a fresh snapshot after its own run.
    /// Returns `false` only when the sync itself failed or a conflict was
    /// held.
    pub async fn sync_with_cloud(&self) -> bool {
        loop {
            match self.sync_once().await {
                SyncAttempt::Busy => {
                    self.shared.sync_queued.store(true, Ordering::SeqCst);
                    return true;
                }
                SyncAttempt::Done(ok) => {
                    if !self.shared.sync_queued.swap(false, Ordering::SeqCst) {
                        return ok;
                    }
                }
            }
        }
    }

    async fn sync_once(&self) -> SyncAttempt {
        let (user, favorites, engine, options) = {
            let session = self.shared.session.read().unwrap();
            let session = match session.as_ref() {
                Some(s) => s,
                None => return SyncAttempt::Done(false),
            };
            (
                session.user.clone(),
                session.favorites.clone(),
                session.engine.clone(),
                session.options.clone(),
            )
        };

        if self.is_locked() {
            tracing::warn!(user = %user, "sync skipped: session locked");
            return SyncAttempt::Done(false);
        }
        let key = self.shared.key.read().unwrap().clone();

        match engine
            .sync(&favorites, key.as_ref(), options.conflict_strategy)
            .await
        {
            SyncOutcome::Synced(agreed) => {
                self.adopt_synced(&user, agreed);
                SyncAttempt::Done(true)
            }
            SyncOutcome::Busy => SyncAttempt::Busy,
            SyncOutcome::Conflict | SyncOutcome::Failed => SyncAttempt::Done(false),
        }
    }

    /// Completes a held manual conflict with an explicit strategy.
    pub async fn resolve_sync_conflict(&self, strategy: ConflictStrategy) -> bool {
        let (user, engine) = {
            let session = self.shared.session.read().unwrap();
            let session = match session.as_ref() {
                Some(s) => s,
                None => return false,
            };
            (session.user.clone(), session.engine.clone())
        };

        match engine.resolve_conflict(strategy).await {
            SyncOutcome::Synced(agreed) => {
                self.adopt_synced(&user, agreed);
                true
            }
            _ => false,
        }
    }

    /// Adopts a sync result as the new set and dirty-tracking snapshot.
    fn adopt_synced(&self, user: &UserId, agreed: HashSet<String>) {
        {
            let mut session = self.shared.session.write().unwrap();
            if let Some(session) = session.as_mut() {
                session.favorites = agreed.clone();
                session.last_synced = agreed.clone();
            }
        }
        if let Err(e) = self.persist_record(user, &agreed) {
            tracing::warn!(user = %user, error = %e, "failed to persist synced record");
        }
    }

    pub fn sync_status(&self) -> SyncStatus {
        let session = self.shared.session.read().unwrap();
        session
            .as_ref()
            .map(|s| s.engine.state().status)
            .unwrap_or(SyncStatus::Idle)
    }

    pub fn sync_stats(&self) -> SyncStats {
        let session = self.shared.session.read().unwrap();
        session
            .as_ref()
            .map(|s| s.engine.state().stats)
            .unwrap_or_default()
    }

    pub fn has_pending_conflict(&self) -> bool {
        let session = self.shared.session.read().unwrap();
        session
            .as_ref()
            .map(|s| s.engine.has_pending_conflict())
            .unwrap_or(false)
    }

    pub fn sync_options(&self) -> CollectionResult<SyncOptions> {
        let session = self.shared.session.read().unwrap();
        let session = session.as_ref().ok_or(CollectionError::NotStarted)?;
        Ok(session.options.clone())
    }

    /// Persists updated options and re-arms the auto-sync timer.
    pub fn update_sync_options(&self, update: &SyncOptionsUpdate) -> CollectionResult<SyncOptions> {
        let user = self.current_user()?;
        let merged = self.shared.options_store.load(&user)?.merged(update);
        self.shared.options_store.save(&user, &merged)?;
        {
            let mut session = self.shared.session.write().unwrap();
            if let Some(session) = session.as_mut() {
                session.options = merged.clone();
            }
        }
        self.arm_auto_sync(&merged);
        Ok(merged)
    }

    /// (Re)arms the periodic sync task. Each tick syncs only when the set
    /// has pending changes.
    fn arm_auto_sync(&self, options: &SyncOptions) {
        let mut task = self.shared.auto_sync_task.lock().unwrap();
        if let Some(old) = task.take() {
            old.abort();
        }
        if !options.auto_sync {
            return;
        }

        let interval = Duration::from_secs(options.sync_interval_secs.max(1));
        let this = self.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if this.has_pending_changes() {
                    this.sync_with_cloud().await;
                }
            }
        }));
    }

    fn current_user(&self) -> CollectionResult<UserId> {
        let session = self.shared.session.read().unwrap();
        session
            .as_ref()
            .map(|s| s.user.clone())
            .ok_or(CollectionError::NotStarted)
    }
}
