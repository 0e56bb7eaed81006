//! Local collection record persistence.

use crate::error::StorageResult;
use crate::kv::PersistentStore;
use crate::namespace;
use lockmark_types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// The locally persisted collection payload.
///
/// Same shape as the remote record: exactly one representation is
/// authoritative at a time, selected by the `encrypted` marker. Plain
/// payloads are a JSON array of identifiers; encrypted payloads are a
/// cipher blob sealing that same array.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub encrypted: bool,
    pub payload: String,
}

impl CollectionRecord {
    /// Builds a cleartext record from a set of identifiers.
    pub fn plain(ids: &HashSet<String>) -> StorageResult<Self> {
        Ok(Self {
            encrypted: false,
            payload: Self::canonical_json(ids)?,
        })
    }

    /// Wraps an already-encrypted blob.
    pub fn sealed(blob: String) -> Self {
        Self {
            encrypted: true,
            payload: blob,
        }
    }

    /// Parses a cleartext payload back into a set.
    pub fn parse_plain(&self) -> StorageResult<HashSet<String>> {
        Self::parse_ids(&self.payload)
    }

    /// Canonical JSON array form, used both as the plain payload and as
    /// the plaintext fed to the cipher. Sorted so the bytes don't depend
    /// on set iteration order.
    pub fn canonical_json(ids: &HashSet<String>) -> StorageResult<String> {
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();
        Ok(serde_json::to_string(&sorted)?)
    }

    /// Parses the canonical JSON array form back into a set.
    pub fn parse_ids(json: &str) -> StorageResult<HashSet<String>> {
        let ids: Vec<String> = serde_json::from_str(json)?;
        Ok(ids.into_iter().collect())
    }
}

/// Persists the per-user [`CollectionRecord`].
#[derive(Clone)]
pub struct CollectionRecordStore {
    store: Arc<dyn PersistentStore>,
}

impl CollectionRecordStore {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    pub fn load(&self, user: &UserId) -> StorageResult<Option<CollectionRecord>> {
        match self.store.get(&namespace::collection(user))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, user: &UserId, record: &CollectionRecord) -> StorageResult<()> {
        let json = serde_json::to_string(record)?;
        self.store.put(&namespace::collection(user), &json)
    }

    pub fn delete(&self, user: &UserId) -> StorageResult<()> {
        self.store.remove(&namespace::collection(user))
    }
}
