//! Network status monitoring.
//!
//! Wraps whatever connectivity primitive the platform provides behind a
//! single boolean signal plus change notifications. Subscriptions are
//! scoped values: dropping one releases the underlying listener, so no
//! callback can outlive its consumer.

use tokio::sync::watch;

/// Observes connectivity transitions.
///
/// Implementations must emit a change notification exactly once per
/// actual transition — repeated identical states are deduplicated at the
/// source, not by each subscriber.
pub trait ConnectivityMonitor: Send + Sync {
    /// Current online state.
    fn is_online(&self) -> bool;

    /// Subscribes to transitions. Each call returns an independent
    /// subscription seeded with the current state.
    fn subscribe(&self) -> ConnectivitySubscription;
}

/// A cancellable subscription to connectivity transitions.
///
/// Dropping the subscription unsubscribes; the monitor going away ends
/// the stream with `None`.
pub struct ConnectivitySubscription {
    rx: watch::Receiver<bool>,
}

impl ConnectivitySubscription {
    /// Wraps a watch receiver carrying the online flag.
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// The state as of the last observed transition (or the seed value).
    pub fn current(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits for the next transition and returns the new state.
    /// Returns `None` once the monitor has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// A monitor driven by explicit `set_online` calls.
///
/// This is both the test double and the adapter surface for platforms
/// that deliver connectivity callbacks: the platform layer forwards each
/// callback into `set_online`, and deduplication happens here.
pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    /// Creates a monitor seeded with the given state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    /// Reports the platform's current state. Returns true if this was an
    /// actual transition; repeated identical states notify nobody.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|state| {
            if *state != online {
                *state = online;
                true
            } else {
                false
            }
        })
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityMonitor for ManualConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> ConnectivitySubscription {
        ConnectivitySubscription::new(self.tx.subscribe())
    }
}
