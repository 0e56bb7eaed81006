//! Key package persistence.

use crate::error::StorageResult;
use crate::kv::PersistentStore;
use crate::namespace;
use lockmark_crypto::KeyPackage;
use lockmark_types::UserId;
use std::sync::Arc;

/// Persists the per-user [`KeyPackage`].
///
/// The package is non-secret (salt + sealed validation token) but its key
/// is encryption-related: no component other than this store may write it.
#[derive(Clone)]
pub struct KeyPackageStore {
    store: Arc<dyn PersistentStore>,
}

impl KeyPackageStore {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    pub fn load(&self, user: &UserId) -> StorageResult<Option<KeyPackage>> {
        match self.store.get(&namespace::key_package(user))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Saves the package, replacing any previous one wholesale (passphrase
    /// changes never patch an existing package).
    pub fn save(&self, user: &UserId, package: &KeyPackage) -> StorageResult<()> {
        let json = serde_json::to_string(package)?;
        self.store.put(&namespace::key_package(user), &json)
    }

    /// Deletes the package (encryption disabled).
    pub fn delete(&self, user: &UserId) -> StorageResult<()> {
        self.store.remove(&namespace::key_package(user))
    }
}
