//! Offline-first write-behind sync core for Trowel.
//!
//! Buffers user mutations in a durable local queue when the network is
//! unavailable, reconciles them against the remote document store once
//! connectivity returns, and maintains a cached read-through view so the
//! app stays functional offline.
//!
//! # Components
//!
//! - **Queue**: ordered, durable list of pending mutations per domain
//! - **Cache**: last-known-good mirror of remote list views
//! - **Connectivity**: boolean online signal with edge notifications
//! - **Remote**: the backend interface the host application implements
//! - **Orchestrator**: the Idle/Syncing state machine that drains the
//!   queue on each offline→online edge
//!
//! # Sync Process
//!
//! 1. A write attempts the remote store directly (when online)
//! 2. On transient failure or offline, it is queued and served as a
//!    pending record
//! 3. When connectivity returns, the queue is drained in FIFO order;
//!    failures of individual items never abort the batch
//! 4. The cache is refreshed and a [`SyncReport`] describes the pass
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trowel_store::MemoryStore;
//! use trowel_sync::mock::MockRemote;
//! use trowel_sync::{ManualConnectivity, SyncConfig, SyncOrchestrator};
//! use trowel_types::Domain;
//!
//! # tokio_test::block_on(async {
//! let connectivity = Arc::new(ManualConnectivity::new(false));
//! let orchestrator = SyncOrchestrator::new(
//!     Arc::new(MemoryStore::new()),
//!     MockRemote::new(),
//!     connectivity,
//!     SyncConfig::default(),
//! );
//!
//! let artifacts = Domain::new("artifacts");
//! let view = orchestrator
//!     .submit(&artifacts, serde_json::json!({ "name": "bronze fibula" }))
//!     .await
//!     .unwrap();
//! assert!(view.is_pending());
//! # });
//! ```

mod cache;
mod connectivity;
mod error;
mod orchestrator;
mod queue;
mod remote;

pub use cache::{CacheEntry, OfflineCache};
pub use connectivity::{ConnectivityMonitor, ConnectivitySubscription, ManualConnectivity};
pub use error::{SyncError, SyncResult};
pub use orchestrator::{
    OrchestratorHandle, SyncConfig, SyncEvent, SyncFailure, SyncOrchestrator, SyncOutcome,
    SyncPhase, SyncReport,
};
pub use queue::{DeadLetter, OfflineQueue};
pub use remote::{mock, IdentityProvider, RemoteStore};
