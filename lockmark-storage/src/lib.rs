//! Persistent key-value storage layer for Lockmark.
//!
//! Every component persists through the injected [`PersistentStore`]
//! interface, keyed by the central [`namespace`] module — no component
//! spells its own storage keys, which is what keeps settings, key
//! packages, stats, and collection data from clobbering each other in the
//! shared store.
//!
//! Two implementations: [`MemoryStore`] (tests, injection doubles) and
//! [`DuckDbStore`] (file-backed, single key/value table).

mod collection_record;
mod error;
mod key_package;
mod kv;
pub mod namespace;
mod settings;

pub use collection_record::{CollectionRecord, CollectionRecordStore};
pub use error::{StorageError, StorageResult};
pub use key_package::KeyPackageStore;
pub use kv::{DuckDbStore, MemoryStore, PersistentStore};
pub use settings::{EncryptionSettings, EncryptionSettingsStore, EncryptionSettingsUpdate};
