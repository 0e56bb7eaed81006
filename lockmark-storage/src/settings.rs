//! Per-user encryption settings.

use crate::error::StorageResult;
use crate::kv::PersistentStore;
use crate::namespace;
use lockmark_types::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// User-facing encryption configuration.
///
/// `enabled = false` (the default) disables all cryptographic processing:
/// collection data is stored and synced in cleartext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSettings {
    pub enabled: bool,
    pub auto_encrypt: bool,
    pub password_hint: Option<String>,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_encrypt: true,
            password_hint: None,
        }
    }
}

/// Typed partial update applied through [`EncryptionSettings::merged`].
///
/// `password_hint` distinguishes "leave unchanged" (`None`) from
/// "clear the hint" (`Some(None)`).
#[derive(Clone, Debug, Default)]
pub struct EncryptionSettingsUpdate {
    pub enabled: Option<bool>,
    pub auto_encrypt: Option<bool>,
    pub password_hint: Option<Option<String>>,
}

impl EncryptionSettings {
    /// Returns a copy with the update's set fields applied.
    pub fn merged(&self, update: &EncryptionSettingsUpdate) -> Self {
        Self {
            enabled: update.enabled.unwrap_or(self.enabled),
            auto_encrypt: update.auto_encrypt.unwrap_or(self.auto_encrypt),
            password_hint: update
                .password_hint
                .clone()
                .unwrap_or_else(|| self.password_hint.clone()),
        }
    }
}

/// Persists [`EncryptionSettings`] per user.
#[derive(Clone)]
pub struct EncryptionSettingsStore {
    store: Arc<dyn PersistentStore>,
}

impl EncryptionSettingsStore {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    /// Loads the user's settings, defaulting when none are stored yet.
    pub fn load(&self, user: &UserId) -> StorageResult<EncryptionSettings> {
        match self.store.get(&namespace::encryption_settings(user))? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(EncryptionSettings::default()),
        }
    }

    pub fn save(&self, user: &UserId, settings: &EncryptionSettings) -> StorageResult<()> {
        let json = serde_json::to_string(settings)?;
        self.store.put(&namespace::encryption_settings(user), &json)
    }
}
