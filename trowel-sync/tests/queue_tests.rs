use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use trowel_store::{LocalStore, MemoryStore};
use trowel_sync::{OfflineCache, OfflineQueue};
use trowel_types::{Domain, LocalId, MutationKind, QueueItem, RemoteRecord};

fn setup() -> (Arc<MemoryStore>, OfflineQueue, Domain) {
    let store = Arc::new(MemoryStore::new());
    let queue = OfflineQueue::new(store.clone());
    (store, queue, Domain::new("artifacts"))
}

fn item(name: &str) -> QueueItem {
    QueueItem::new(MutationKind::Create, json!({ "name": name }))
}

#[test]
fn empty_queue_reads_as_empty() {
    let (_, queue, domain) = setup();
    assert!(queue.items(&domain).unwrap().is_empty());
    assert_eq!(queue.len(&domain).unwrap(), 0);
    assert!(queue.is_empty(&domain).unwrap());
}

#[test]
fn enqueue_preserves_fifo_order() {
    let (store, queue, domain) = setup();
    let cache = OfflineCache::new(store);

    let mut ids = Vec::new();
    for i in 0..5 {
        let item = item(&format!("find-{i}"));
        ids.push(item.local_id);
        queue.enqueue(&domain, item).unwrap();

        // Interleaved cache traffic must not disturb queue order.
        cache
            .put(&domain, vec![RemoteRecord::new("srv-1", json!({}))])
            .unwrap();
        let _ = cache.get(&domain);
    }

    let queued: Vec<LocalId> = queue
        .items(&domain)
        .unwrap()
        .into_iter()
        .map(|i| i.local_id)
        .collect();
    assert_eq!(queued, ids);
}

#[test]
fn remove_is_idempotent() {
    let (_, queue, domain) = setup();
    let first = item("a");
    let id = first.local_id;
    queue.enqueue(&domain, first).unwrap();
    queue.enqueue(&domain, item("b")).unwrap();

    queue.remove(&domain, id).unwrap();
    assert_eq!(queue.len(&domain).unwrap(), 1);

    // Second removal of the same id, and removal of a never-existing id,
    // leave the queue unchanged.
    queue.remove(&domain, id).unwrap();
    queue.remove(&domain, LocalId::new()).unwrap();
    assert_eq!(queue.len(&domain).unwrap(), 1);
}

#[test]
fn concurrent_enqueue_and_remove_lose_nothing() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let queue = Arc::new(OfflineQueue::new(store));
    let domain = Domain::new("artifacts");

    // A drain removing a flushed item while the UI thread enqueues a new
    // one must never drop the new item, whichever write lands last.
    for round in 0..500 {
        let flushed = item(&format!("flushed-{round}"));
        let flushed_id = flushed.local_id;
        queue.enqueue(&domain, flushed).unwrap();

        let incoming = item(&format!("incoming-{round}"));
        let incoming_id = incoming.local_id;

        let remover = {
            let queue = Arc::clone(&queue);
            let domain = domain.clone();
            thread::spawn(move || queue.remove(&domain, flushed_id).unwrap())
        };
        queue.enqueue(&domain, incoming).unwrap();
        remover.join().unwrap();

        let ids: Vec<LocalId> = queue
            .items(&domain)
            .unwrap()
            .into_iter()
            .map(|i| i.local_id)
            .collect();
        assert!(
            ids.contains(&incoming_id),
            "round {round}: concurrently enqueued item was lost; queue now {ids:?}"
        );
        assert!(
            !ids.contains(&flushed_id),
            "round {round}: removed item resurfaced"
        );
        queue.remove(&domain, incoming_id).unwrap();
    }
}

#[test]
fn domains_are_isolated() {
    let (_, queue, artifacts) = setup();
    let diary = Domain::new("diary_entries");

    queue.enqueue(&artifacts, item("urn")).unwrap();
    queue.enqueue(&diary, item("day 3")).unwrap();
    queue.enqueue(&diary, item("day 4")).unwrap();

    assert_eq!(queue.len(&artifacts).unwrap(), 1);
    assert_eq!(queue.len(&diary).unwrap(), 2);
}

#[test]
fn record_attempt_increments_in_place() {
    let (_, queue, domain) = setup();
    let queued = item("urn");
    let id = queued.local_id;
    queue.enqueue(&domain, queued).unwrap();

    assert_eq!(queue.record_attempt(&domain, id).unwrap(), 1);
    assert_eq!(queue.record_attempt(&domain, id).unwrap(), 2);
    assert_eq!(queue.items(&domain).unwrap()[0].attempts, 2);
}

#[test]
fn record_attempt_for_missing_item_is_zero() {
    let (_, queue, domain) = setup();
    assert_eq!(queue.record_attempt(&domain, LocalId::new()).unwrap(), 0);
}

#[test]
fn corrupt_queue_blob_self_heals() {
    let (store, queue, domain) = setup();
    store.set("queue/artifacts", b"definitely not json").unwrap();

    // Corruption reads as empty, not as an error.
    assert!(queue.items(&domain).unwrap().is_empty());

    // And the backing key was reinitialized so later writes work.
    queue.enqueue(&domain, item("recovered")).unwrap();
    assert_eq!(queue.len(&domain).unwrap(), 1);
}

#[test]
fn dead_letter_moves_item_out_of_queue() {
    let (_, queue, domain) = setup();
    let doomed = item("bad payload");
    let id = doomed.local_id;
    queue.enqueue(&domain, doomed.clone()).unwrap();
    queue.enqueue(&domain, item("fine")).unwrap();

    queue.dead_letter(&domain, doomed, "payload rejected").unwrap();

    assert_eq!(queue.len(&domain).unwrap(), 1);
    let dead = queue.dead_letters(&domain).unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].item.local_id, id);
    assert_eq!(dead[0].reason, "payload rejected");
}

#[test]
fn dead_letters_accumulate_in_order() {
    let (_, queue, domain) = setup();
    let a = item("a");
    let b = item("b");
    queue.dead_letter(&domain, a.clone(), "first").unwrap();
    queue.dead_letter(&domain, b.clone(), "second").unwrap();

    let dead = queue.dead_letters(&domain).unwrap();
    assert_eq!(dead.len(), 2);
    assert_eq!(dead[0].item.local_id, a.local_id);
    assert_eq!(dead[1].item.local_id, b.local_id);
}
