//! The sync orchestrator — the core state machine.
//!
//! Owns the offline queue and cache, and drives drains against the remote
//! store. Two phases: `Idle` and `Syncing`. A drain starts once per
//! detected offline→online edge or explicit trigger; a trigger arriving
//! while a drain is in flight is coalesced into a no-op, since two
//! concurrent drains could double-submit a queued mutation.

use crate::cache::OfflineCache;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::queue::OfflineQueue;
use crate::remote::{IdentityProvider, RemoteStore};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use trowel_store::LocalStore;
use trowel_types::{Domain, LocalId, MutationKind, QueueItem, RecordView, RemoteRecord};

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound for each individual remote commit. A timeout counts as
    /// a network failure: the item stays queued.
    pub commit_timeout: Duration,
    /// Failed attempts after which an item is dead-lettered.
    pub max_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            commit_timeout: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

/// The orchestrator's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No drain in flight.
    Idle,
    /// A drain is in flight.
    Syncing,
}

/// Outcome of a sync trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// A drain ran to completion (possibly with per-item failures).
    Completed(SyncReport),
    /// A drain was already in flight; this trigger was a no-op.
    AlreadyRunning,
}

/// Per-item failure recorded during a drain.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    /// The failed item's id.
    pub local_id: LocalId,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Outcome of one complete drain pass. Produced fresh per drain; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncReport {
    /// Items in the snapshot this pass processed.
    pub attempted: usize,
    /// Items committed and removed from the queue.
    pub synced: usize,
    /// Items still queued after the pass, including any enqueued while it
    /// ran.
    pub still_pending: usize,
    /// Per-item failures, in processing order.
    pub failures: Vec<SyncFailure>,
}

/// Lifecycle notifications emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A drain pass started.
    SyncStarted { domain: Domain },
    /// A drain pass finished.
    SyncCompleted { domain: Domain, report: SyncReport },
    /// The connectivity monitor reported a transition.
    ConnectivityChanged { online: bool },
}

/// Clears the in-progress flag on every exit path of a drain.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The offline-first write-behind sync core.
///
/// Writes first attempt the remote store; on transient failure (or while
/// offline) they are buffered in the durable queue and flushed, in FIFO
/// order, on the next drain. Reads merge pending items with the cached or
/// live list view so the UI stays functional without a network.
pub struct SyncOrchestrator {
    queue: OfflineQueue,
    cache: OfflineCache,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    identity: Option<Arc<dyn IdentityProvider>>,
    config: SyncConfig,
    draining: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            queue: OfflineQueue::new(store.clone()),
            cache: OfflineCache::new(store),
            remote,
            connectivity,
            identity: None,
            config,
            draining: AtomicBool::new(false),
            events,
        }
    }

    /// Attaches an identity provider used to stamp ownership onto
    /// outgoing payloads.
    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// The orchestrator's current phase.
    pub fn phase(&self) -> SyncPhase {
        if self.draining.load(Ordering::Acquire) {
            SyncPhase::Syncing
        } else {
            SyncPhase::Idle
        }
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Access to the underlying queue, for pending and dead-lettered
    /// mutation inspection.
    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Access to the cache, for hosts that prefetch list views.
    pub fn cache(&self) -> &OfflineCache {
        &self.cache
    }

    // ── Write path ───────────────────────────────────────────────

    /// Submits a create mutation, write-behind.
    ///
    /// Online, the remote store is attempted first; a confirmed record is
    /// returned on success. A transient failure, a timeout, or being
    /// offline falls back to the queue and returns the pending view. A
    /// validation rejection propagates to the caller — nothing is queued
    /// for a payload the server has already refused.
    pub async fn submit(&self, domain: &Domain, payload: Value) -> SyncResult<RecordView> {
        let payload = self.stamp_identity(payload);

        if self.connectivity.is_online() {
            match self.commit_with_timeout(domain, MutationKind::Create, &payload).await {
                Ok(record) => {
                    debug!(%domain, id = %record.id, "direct commit succeeded");
                    return Ok(RecordView::Confirmed { record });
                }
                Err(err @ SyncError::Validation(_)) => return Err(err),
                Err(err) => {
                    warn!(%domain, %err, "direct commit failed, queueing for later sync");
                }
            }
        }

        let item = QueueItem::new(MutationKind::Create, payload);
        let local_id = item.local_id;
        let pending_payload = item.payload.clone();
        self.queue.enqueue(domain, item)?;
        Ok(RecordView::Pending {
            local_id,
            payload: pending_payload,
        })
    }

    /// Buffers a mutation without attempting the remote store first.
    pub fn enqueue_mutation(
        &self,
        domain: &Domain,
        kind: MutationKind,
        payload: Value,
    ) -> SyncResult<LocalId> {
        let item = QueueItem::new(kind, self.stamp_identity(payload));
        let local_id = item.local_id;
        self.queue.enqueue(domain, item)?;
        Ok(local_id)
    }

    /// Discards a pending mutation the user no longer wants. A no-op for
    /// ids that were already flushed or never existed.
    pub fn discard_mutation(&self, domain: &Domain, local_id: LocalId) -> SyncResult<()> {
        self.queue.remove(domain, local_id)
    }

    /// Number of mutations awaiting remote commit for a domain.
    pub fn pending_count(&self, domain: &Domain) -> SyncResult<usize> {
        self.queue.len(domain)
    }

    // ── Read path ────────────────────────────────────────────────

    /// Returns the merged view of a domain: pending mutations first
    /// (tagged as such), then confirmed records.
    ///
    /// Online, the live list is fetched and mirrored into the cache; a
    /// fetch failure or being offline falls back to the last cached
    /// snapshot. Never fails for lack of a network.
    pub async fn cached_or_live(&self, domain: &Domain) -> SyncResult<Vec<RecordView>> {
        let mut views: Vec<RecordView> = self
            .queue
            .items(domain)?
            .into_iter()
            .map(|item| RecordView::Pending {
                local_id: item.local_id,
                payload: item.payload,
            })
            .collect();

        let confirmed = if self.connectivity.is_online() {
            match self.remote.fetch_all(domain).await {
                Ok(records) => {
                    if let Err(err) = self.cache.put(domain, records.clone()) {
                        warn!(%domain, %err, "failed to mirror live fetch into cache");
                    }
                    records
                }
                Err(err) => {
                    warn!(%domain, %err, "live fetch failed, serving cached snapshot");
                    self.cache.get(domain).map(|e| e.data).unwrap_or_default()
                }
            }
        } else {
            self.cache.get(domain).map(|e| e.data).unwrap_or_default()
        };

        views.extend(
            confirmed
                .into_iter()
                .map(|record| RecordView::Confirmed { record }),
        );
        Ok(views)
    }

    // ── Drain ────────────────────────────────────────────────────

    /// Runs one drain pass for a domain, unless one is already in flight.
    ///
    /// Invoked automatically on every offline→online edge by the watcher
    /// task (see [`SyncOrchestrator::start`]) and manually by the host.
    pub async fn trigger_sync(&self, domain: &Domain) -> SyncResult<SyncOutcome> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%domain, "drain already in flight, coalescing trigger");
            return Ok(SyncOutcome::AlreadyRunning);
        }
        let _guard = DrainGuard(&self.draining);

        let _ = self.events.send(SyncEvent::SyncStarted {
            domain: domain.clone(),
        });

        let report = self.drain(domain).await?;
        info!(
            %domain,
            attempted = report.attempted,
            synced = report.synced,
            still_pending = report.still_pending,
            "drain complete"
        );
        let _ = self.events.send(SyncEvent::SyncCompleted {
            domain: domain.clone(),
            report: report.clone(),
        });
        Ok(SyncOutcome::Completed(report))
    }

    /// Drains the snapshotted queue in FIFO order. Failure of one item
    /// never aborts the batch; items enqueued while the pass runs are
    /// deferred to the next pass to bound drain duration.
    async fn drain(&self, domain: &Domain) -> SyncResult<SyncReport> {
        let snapshot = self.queue.items(domain)?;
        if snapshot.is_empty() {
            debug!(%domain, "queue empty, nothing to drain");
            return Ok(SyncReport::default());
        }

        let attempted = snapshot.len();
        let mut synced = 0;
        let mut failures = Vec::new();

        for item in snapshot {
            let local_id = item.local_id;
            match self
                .commit_with_timeout(domain, item.kind, &item.payload)
                .await
            {
                Ok(record) => {
                    self.queue.remove(domain, local_id)?;
                    synced += 1;
                    debug!(%domain, %local_id, id = %record.id, "flushed mutation");
                }
                Err(err) => {
                    let attempts = self.queue.record_attempt(domain, local_id)?;
                    let reason = err.to_string();
                    if !err.is_retryable() || attempts >= self.config.max_attempts {
                        warn!(%domain, %local_id, attempts, %err, "dead-lettering mutation");
                        let mut dead = item;
                        dead.attempts = attempts;
                        self.queue.dead_letter(domain, dead, &reason)?;
                    } else {
                        warn!(%domain, %local_id, attempts, %err, "mutation failed, leaving queued");
                    }
                    failures.push(SyncFailure { local_id, reason });
                }
            }
        }

        let still_pending = self.queue.len(domain)?;

        // Best-effort cache refresh; a failure here never taints the report.
        match self.remote.fetch_all(domain).await {
            Ok(records) => {
                if let Err(err) = self.cache.put(domain, records) {
                    warn!(%domain, %err, "post-drain cache write failed");
                }
            }
            Err(err) => {
                warn!(%domain, %err, "post-drain cache refresh failed");
            }
        }

        Ok(SyncReport {
            attempted,
            synced,
            still_pending,
            failures,
        })
    }

    async fn commit_with_timeout(
        &self,
        domain: &Domain,
        kind: MutationKind,
        payload: &Value,
    ) -> SyncResult<RemoteRecord> {
        match timeout(
            self.config.commit_timeout,
            self.remote.commit(domain, kind, payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout),
        }
    }

    /// Stamps the signed-in user onto object payloads that lack an owner.
    fn stamp_identity(&self, mut payload: Value) -> Value {
        let Some(identity) = &self.identity else {
            return payload;
        };
        let Some(user_id) = identity.current_user_id() else {
            return payload;
        };
        if let Value::Object(map) = &mut payload {
            map.entry("created_by")
                .or_insert_with(|| Value::String(user_id));
        }
        payload
    }

    // ── Automatic triggering ─────────────────────────────────────

    /// Spawns the watcher task that drains the queue once per detected
    /// offline→online edge. The returned handle stops the watcher on
    /// `shutdown` (dropping the connectivity monitor ends it too).
    pub fn start(self: &Arc<Self>, domain: Domain) -> OrchestratorHandle {
        let mut subscription = self.connectivity.subscribe();
        // Seed the edge detector before spawning. The task's body only
        // runs at its first poll, so seeding inside it would miss any
        // transition delivered between `start` returning and that poll.
        let mut was_online = subscription.current();
        let orchestrator = Arc::clone(self);
        let events = self.events.subscribe();

        let task = tokio::spawn(async move {
            while let Some(online) = subscription.changed().await {
                let _ = orchestrator
                    .events
                    .send(SyncEvent::ConnectivityChanged { online });

                if online && !was_online {
                    info!(%domain, "connectivity restored, triggering sync");
                    match orchestrator.trigger_sync(&domain).await {
                        Ok(SyncOutcome::Completed(report)) => {
                            debug!(%domain, synced = report.synced, "auto drain finished");
                        }
                        Ok(SyncOutcome::AlreadyRunning) => {
                            debug!(%domain, "auto drain coalesced into running pass");
                        }
                        Err(err) => {
                            warn!(%domain, %err, "auto drain failed");
                        }
                    }
                }
                was_online = online;
            }
            debug!(%domain, "connectivity monitor gone, watcher exiting");
        });

        OrchestratorHandle { task, events }
    }
}

/// Handle to a running orchestrator watcher task.
pub struct OrchestratorHandle {
    task: JoinHandle<()>,
    events: broadcast::Receiver<SyncEvent>,
}

impl OrchestratorHandle {
    /// Receives the next lifecycle event. `None` once the orchestrator is
    /// gone and the buffer is drained.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged, skipping");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stops the watcher task.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for OrchestratorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
