//! Remote sync engine for Lockmark.
//!
//! Pushes and pulls the protected collection payload to and from a remote
//! store, detects and resolves conflicts between plaintext sets, and
//! tracks statistics. Transport failures never propagate as errors: they
//! are captured into the observable [`SyncState`] so callers poll or
//! observe status instead of catching exceptions.
//!
//! Encrypted sync is last-writer-wins: ciphertext cannot be diffed, so
//! the conflict machinery only runs on the plaintext path.

mod conflict;
mod engine;
mod error;
mod options;
mod remote;
mod stats;

pub use conflict::{has_conflicts, resolve, ConflictStrategy};
pub use engine::{SyncEngine, SyncOutcome, SyncState, SyncStatus};
pub use error::{SyncError, SyncResult};
pub use options::{SyncOptions, SyncOptionsStore, SyncOptionsUpdate};
pub use remote::{MemoryRemoteStore, RemoteStore};
pub use stats::{SyncStats, SyncStatsStore};
