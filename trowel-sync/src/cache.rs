//! Read-through cache of last-known-good remote views.
//!
//! A dumb durable mirror: one `CacheEntry` per domain, overwritten
//! wholesale on every refresh. No expiry is enforced here — staleness is
//! a UI concern. Reading never touches the network and never fails;
//! absence of any prior fetch is an explicit `None`, not an error.

use crate::error::SyncResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use trowel_store::LocalStore;
use trowel_types::{Domain, RemoteRecord, Timestamp};

/// Last-known snapshot of a remote list view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The records as last fetched, in server order.
    pub data: Vec<RemoteRecord>,
    /// When the snapshot was captured.
    pub fetched_at: Timestamp,
}

/// Durable last-writer-wins cache of remote list views, scoped per domain.
pub struct OfflineCache {
    store: Arc<dyn LocalStore>,
}

impl OfflineCache {
    /// Creates a cache over the given local store.
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    fn key(domain: &Domain) -> String {
        format!("cache/{domain}")
    }

    /// Overwrites the stored snapshot for `domain` with `records` and the
    /// current timestamp. No merge with the prior snapshot.
    pub fn put(&self, domain: &Domain, records: Vec<RemoteRecord>) -> SyncResult<()> {
        let entry = CacheEntry {
            data: records,
            fetched_at: Timestamp::now(),
        };
        let bytes = serde_json::to_vec(&entry)?;
        self.store.set(&Self::key(domain), &bytes)?;
        Ok(())
    }

    /// Returns the stored snapshot, or `None` if the domain was never
    /// cached. Corrupt or unreadable entries degrade to `None` — a cache
    /// read must never take down an offline read path.
    pub fn get(&self, domain: &Domain) -> Option<CacheEntry> {
        let bytes = match self.store.get(&Self::key(domain)) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                warn!(%domain, %err, "cache read failed, treating as empty");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(%domain, %err, "corrupt cache entry, treating as empty");
                None
            }
        }
    }

    /// Drops the stored snapshot for `domain`.
    pub fn clear(&self, domain: &Domain) -> SyncResult<()> {
        self.store.remove(&Self::key(domain))?;
        Ok(())
    }
}
