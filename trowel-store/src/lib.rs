//! Local persistent storage for the Trowel offline sync core.
//!
//! Provides a narrow key/value contract (`LocalStore`) that the queue and
//! cache layers build on, plus two implementations:
//!
//! - `SqliteStore` — durable, backed by an embedded SQLite file; survives
//!   process restarts and is scoped per installation.
//! - `MemoryStore` — ephemeral, for tests and previews.
//!
//! The store has no knowledge of domain types; values are opaque bytes.

mod error;
mod memory;
mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A key-scoped durable store of opaque byte values.
///
/// Implementations must be safe to share across tasks. Writes are
/// last-writer-wins per key; there is no cross-key transaction surface
/// because the layers above never need one.
pub trait LocalStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes the value under `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> StorageResult<()>;
}
