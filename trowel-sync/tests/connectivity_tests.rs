use std::time::Duration;
use tokio::time::timeout;
use trowel_sync::{ConnectivityMonitor, ManualConnectivity};

#[test]
fn reports_seed_state() {
    assert!(ManualConnectivity::new(true).is_online());
    assert!(!ManualConnectivity::new(false).is_online());
}

#[test]
fn repeated_identical_states_are_not_transitions() {
    let monitor = ManualConnectivity::new(true);
    assert!(!monitor.set_online(true));
    assert!(monitor.set_online(false));
    assert!(!monitor.set_online(false));
    assert!(monitor.set_online(true));
}

#[tokio::test]
async fn subscription_sees_each_transition_once() {
    let monitor = ManualConnectivity::new(false);
    let mut subscription = monitor.subscribe();
    assert!(!subscription.current());

    monitor.set_online(true);
    assert_eq!(subscription.changed().await, Some(true));

    monitor.set_online(false);
    assert_eq!(subscription.changed().await, Some(false));

    // No further transitions: changed() must stay pending.
    monitor.set_online(false);
    let pending = timeout(Duration::from_millis(50), subscription.changed()).await;
    assert!(pending.is_err(), "duplicate state must not notify");
}

#[tokio::test]
async fn duplicate_sets_are_coalesced_for_late_subscribers() {
    let monitor = ManualConnectivity::new(false);
    monitor.set_online(false);
    monitor.set_online(false);

    let mut subscription = monitor.subscribe();
    let pending = timeout(Duration::from_millis(50), subscription.changed()).await;
    assert!(pending.is_err());
}

#[tokio::test]
async fn subscription_ends_when_monitor_dropped() {
    let monitor = ManualConnectivity::new(true);
    let mut subscription = monitor.subscribe();

    drop(monitor);
    assert_eq!(subscription.changed().await, None);
}

#[tokio::test]
async fn dropping_subscription_releases_listener() {
    let monitor = ManualConnectivity::new(true);
    let subscription = monitor.subscribe();
    drop(subscription);

    // The monitor keeps working with no subscribers attached.
    assert!(monitor.set_online(false));
    assert!(!monitor.is_online());
}

#[tokio::test]
async fn independent_subscriptions_each_see_transitions() {
    let monitor = ManualConnectivity::new(false);
    let mut a = monitor.subscribe();
    let mut b = monitor.subscribe();

    monitor.set_online(true);
    assert_eq!(a.changed().await, Some(true));
    assert_eq!(b.changed().await, Some(true));
}
