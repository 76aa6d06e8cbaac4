//! The offline mutation queue.
//!
//! An ordered, durable list of pending mutations per domain, stored as a
//! JSON blob in the local store. The queue owns its keyspace exclusively:
//! the orchestrator reads and removes items only through this contract.
//!
//! A corrupted or missing backing blob is never an error — the queue
//! self-heals by reinitializing to empty, since a queue that cannot be
//! read would otherwise wedge every sync pass.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use trowel_store::{LocalStore, StorageError};
use trowel_types::{Domain, LocalId, QueueItem, Timestamp};

/// A mutation permanently excluded from retry, kept for diagnostics and
/// user review rather than silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    /// The item as it looked on its final attempt.
    pub item: QueueItem,
    /// Why it was excluded.
    pub reason: String,
    /// When it was excluded.
    pub failed_at: Timestamp,
}

/// Durable FIFO queue of pending mutations, scoped per domain.
pub struct OfflineQueue {
    store: Arc<dyn LocalStore>,
    // Serializes each load-mutate-save cycle on the backing blobs. The
    // store's own lock only covers individual gets and sets, so without
    // this a concurrent enqueue and remove could save stale snapshots
    // over each other and silently drop an item.
    write_lock: Mutex<()>,
}

impl OfflineQueue {
    /// Creates a queue over the given local store.
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> SyncResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| SyncError::from(StorageError::Poisoned))
    }

    fn queue_key(domain: &Domain) -> String {
        format!("queue/{domain}")
    }

    fn dead_key(domain: &Domain) -> String {
        format!("dead/{domain}")
    }

    /// Appends an item to the domain's queue.
    ///
    /// Bounded only by device storage; a storage rejection propagates to
    /// the caller so the write is never silently lost.
    pub fn enqueue(&self, domain: &Domain, item: QueueItem) -> SyncResult<()> {
        let _guard = self.guard()?;
        let mut items = self.load_queue(domain)?;
        debug!(%domain, local_id = %item.local_id, "enqueueing mutation");
        items.push(item);
        self.save_queue(domain, &items)
    }

    /// Returns all pending items in enqueue (FIFO) order.
    pub fn items(&self, domain: &Domain) -> SyncResult<Vec<QueueItem>> {
        let _guard = self.guard()?;
        self.load_queue(domain)
    }

    /// Removes an item by id. Removing an absent id is a no-op.
    pub fn remove(&self, domain: &Domain, local_id: LocalId) -> SyncResult<()> {
        let _guard = self.guard()?;
        self.remove_locked(domain, local_id)
    }

    fn remove_locked(&self, domain: &Domain, local_id: LocalId) -> SyncResult<()> {
        let items = self.load_queue(domain)?;
        let len_before = items.len();
        let remaining: Vec<QueueItem> =
            items.into_iter().filter(|i| i.local_id != local_id).collect();
        if remaining.len() != len_before {
            self.save_queue(domain, &remaining)?;
        }
        Ok(())
    }

    /// Number of pending items for the domain.
    pub fn len(&self, domain: &Domain) -> SyncResult<usize> {
        let _guard = self.guard()?;
        Ok(self.load_queue(domain)?.len())
    }

    /// True when nothing is pending for the domain.
    pub fn is_empty(&self, domain: &Domain) -> SyncResult<bool> {
        Ok(self.len(domain)? == 0)
    }

    /// Increments the attempt counter for an item in place and returns the
    /// new count. Returns 0 if the item is no longer queued.
    pub fn record_attempt(&self, domain: &Domain, local_id: LocalId) -> SyncResult<u32> {
        let _guard = self.guard()?;
        let mut items = self.load_queue(domain)?;
        let mut attempts = 0;
        for item in &mut items {
            if item.local_id == local_id {
                item.attempts += 1;
                attempts = item.attempts;
            }
        }
        if attempts > 0 {
            self.save_queue(domain, &items)?;
        }
        Ok(attempts)
    }

    /// Moves an item out of the queue into the domain's dead-letter list.
    ///
    /// Idempotent with respect to the queue side: the item is removed if
    /// still present, and the dead-letter entry is appended either way.
    pub fn dead_letter(
        &self,
        domain: &Domain,
        item: QueueItem,
        reason: impl Into<String>,
    ) -> SyncResult<()> {
        let _guard = self.guard()?;
        self.remove_locked(domain, item.local_id)?;

        let key = Self::dead_key(domain);
        let mut dead = self.load_dead(domain)?;
        dead.push(DeadLetter {
            item,
            reason: reason.into(),
            failed_at: Timestamp::now(),
        });
        let bytes = serde_json::to_vec(&dead)?;
        self.store.set(&key, &bytes)?;
        Ok(())
    }

    /// Returns the domain's dead-lettered mutations, oldest first.
    pub fn dead_letters(&self, domain: &Domain) -> SyncResult<Vec<DeadLetter>> {
        let _guard = self.guard()?;
        self.load_dead(domain)
    }

    fn load_queue(&self, domain: &Domain) -> SyncResult<Vec<QueueItem>> {
        let key = Self::queue_key(domain);
        match self.store.get(&key)? {
            None => Ok(Vec::new()),
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(items) => Ok(items),
                Err(err) => {
                    warn!(%domain, %err, "corrupt queue blob, reinitializing to empty");
                    self.store.set(&key, b"[]")?;
                    Ok(Vec::new())
                }
            },
        }
    }

    fn save_queue(&self, domain: &Domain, items: &[QueueItem]) -> SyncResult<()> {
        let bytes = serde_json::to_vec(items)?;
        self.store.set(&Self::queue_key(domain), &bytes)?;
        Ok(())
    }

    fn load_dead(&self, domain: &Domain) -> SyncResult<Vec<DeadLetter>> {
        match self.store.get(&Self::dead_key(domain))? {
            None => Ok(Vec::new()),
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(dead) => Ok(dead),
                Err(err) => {
                    warn!(%domain, %err, "corrupt dead-letter blob, reinitializing to empty");
                    self.store.set(&Self::dead_key(domain), b"[]")?;
                    Ok(Vec::new())
                }
            },
        }
    }
}
