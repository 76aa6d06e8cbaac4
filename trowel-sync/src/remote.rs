//! Remote store abstraction.
//!
//! Defines the narrow interface the sync core requires from the networked
//! backend: per-domain commit and list-fetch. The host application
//! implements this against its actual document database; the core never
//! speaks a wire protocol itself.

use crate::error::SyncResult;
use async_trait::async_trait;
use serde_json::Value;
use trowel_types::{Domain, MutationKind, RemoteRecord};

/// The networked document backend, consumed but not implemented here.
///
/// `commit` must fail with `SyncError::Network` for transient transport
/// problems and `SyncError::Validation` when the payload itself was
/// rejected — the orchestrator retries the former and dead-letters the
/// latter.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Commits one mutation and returns the server-confirmed record.
    async fn commit(
        &self,
        domain: &Domain,
        kind: MutationKind,
        payload: &Value,
    ) -> SyncResult<RemoteRecord>;

    /// Fetches the current list view for a domain.
    async fn fetch_all(&self, domain: &Domain) -> SyncResult<Vec<RemoteRecord>>;
}

/// Supplies the signed-in user's identity, if any.
///
/// Used only to stamp ownership onto outgoing payloads; the sync core has
/// no other involvement with authentication.
pub trait IdentityProvider: Send + Sync {
    /// The current user's id, or `None` when signed out.
    fn current_user_id(&self) -> Option<String>;
}

/// A mock remote store for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Scripted outcome for a single `commit` call.
    #[derive(Debug, Clone)]
    pub enum CommitOutcome {
        /// Accept the payload and issue a server record.
        Succeed,
        /// Fail with a transient network error.
        Network(String),
        /// Reject the payload permanently.
        Validation(String),
    }

    /// In-process `RemoteStore` whose behavior is scripted per call.
    ///
    /// Outcomes are consumed FIFO; once the script runs dry every commit
    /// succeeds. Successful commits append to the per-domain record list
    /// that `fetch_all` returns.
    pub struct MockRemote {
        outcomes: Mutex<VecDeque<CommitOutcome>>,
        committed: Mutex<Vec<(Domain, MutationKind, Value)>>,
        records: Mutex<HashMap<Domain, Vec<RemoteRecord>>>,
        commit_delay: Mutex<Option<Duration>>,
        fail_fetch: Mutex<Option<String>>,
        next_id: AtomicU64,
    }

    impl MockRemote {
        /// Creates a mock where every call succeeds.
        #[must_use]
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(VecDeque::new()),
                committed: Mutex::new(Vec::new()),
                records: Mutex::new(HashMap::new()),
                commit_delay: Mutex::new(None),
                fail_fetch: Mutex::new(None),
                next_id: AtomicU64::new(1),
            })
        }

        /// Appends a scripted outcome for the next unscripted commit.
        pub fn script(&self, outcome: CommitOutcome) {
            self.outcomes.lock().unwrap().push_back(outcome);
        }

        /// Delays every commit by `delay` (for in-flight coalescing tests).
        pub fn set_commit_delay(&self, delay: Option<Duration>) {
            *self.commit_delay.lock().unwrap() = delay;
        }

        /// Makes `fetch_all` fail with a network error until cleared.
        pub fn set_fetch_failure(&self, reason: Option<String>) {
            *self.fail_fetch.lock().unwrap() = reason;
        }

        /// Seeds the list view `fetch_all` returns for a domain.
        pub fn seed_records(&self, domain: &Domain, records: Vec<RemoteRecord>) {
            self.records.lock().unwrap().insert(domain.clone(), records);
        }

        /// Every successfully committed mutation, in call order.
        pub fn commits(&self) -> Vec<(Domain, MutationKind, Value)> {
            self.committed.lock().unwrap().clone()
        }

        /// Number of successful commits so far.
        pub fn commit_count(&self) -> usize {
            self.committed.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RemoteStore for MockRemote {
        async fn commit(
            &self,
            domain: &Domain,
            kind: MutationKind,
            payload: &Value,
        ) -> SyncResult<RemoteRecord> {
            let delay = *self.commit_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(CommitOutcome::Succeed);

            match outcome {
                CommitOutcome::Succeed => {
                    let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
                    let record = RemoteRecord::new(id, payload.clone());
                    self.committed
                        .lock()
                        .unwrap()
                        .push((domain.clone(), kind, payload.clone()));
                    self.records
                        .lock()
                        .unwrap()
                        .entry(domain.clone())
                        .or_default()
                        .push(record.clone());
                    Ok(record)
                }
                CommitOutcome::Network(reason) => Err(SyncError::Network(reason)),
                CommitOutcome::Validation(reason) => Err(SyncError::Validation(reason)),
            }
        }

        async fn fetch_all(&self, domain: &Domain) -> SyncResult<Vec<RemoteRecord>> {
            if let Some(reason) = self.fail_fetch.lock().unwrap().clone() {
                return Err(SyncError::Network(reason));
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(domain)
                .cloned()
                .unwrap_or_default())
        }
    }

    /// An identity provider with a fixed user.
    pub struct FixedIdentity(pub Option<String>);

    impl IdentityProvider for FixedIdentity {
        fn current_user_id(&self) -> Option<String> {
            self.0.clone()
        }
    }
}
