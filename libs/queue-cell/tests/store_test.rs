mod common;

use common::{check_in, clinic_morning};
use queue_cell::models::{Priority, QueueEntry, VisitStatus};
use queue_cell::services::store::{MemoryQueueStore, QueueStore};

fn entry(position: i64) -> QueueEntry {
    QueueEntry::new(&check_in(Priority::Normal, "general"), position, clinic_morning())
}

#[tokio::test]
async fn insert_and_get_round_trip() {
    let store = MemoryQueueStore::new();
    let e = entry(1);

    store.insert(e.clone()).await.expect("insert should succeed");
    let fetched = store
        .get(e.id)
        .await
        .expect("get should succeed")
        .expect("entry should exist");
    assert_eq!(fetched.id, e.id);
    assert_eq!(fetched.version, 0);
}

#[tokio::test]
async fn update_applies_only_on_matching_version() {
    let store = MemoryQueueStore::new();
    let e = entry(1);
    store.insert(e.clone()).await.expect("insert should succeed");

    let mut updated = e.clone();
    updated.status = VisitStatus::Called;
    updated.version = 1;
    assert!(store
        .update(0, updated.clone())
        .await
        .expect("update should succeed"));

    // A writer still holding the stale version loses.
    let mut stale = e.clone();
    stale.status = VisitStatus::NoShow;
    stale.version = 1;
    assert!(!store
        .update(0, stale)
        .await
        .expect("update should succeed"));

    let fetched = store
        .get(e.id)
        .await
        .expect("get should succeed")
        .expect("entry should exist");
    assert_eq!(fetched.status, VisitStatus::Called);
    assert_eq!(fetched.version, 1);
}

#[tokio::test]
async fn update_on_missing_entry_is_a_clean_miss() {
    let store = MemoryQueueStore::new();
    let ghost = entry(1);

    assert!(!store
        .update(0, ghost)
        .await
        .expect("update should succeed"));
}

#[tokio::test]
async fn update_pair_is_all_or_nothing() {
    let store = MemoryQueueStore::new();
    let a = entry(1);
    let b = entry(2);
    store.insert(a.clone()).await.expect("insert should succeed");
    store.insert(b.clone()).await.expect("insert should succeed");

    // Swap positions atomically.
    let mut a2 = a.clone();
    let mut b2 = b.clone();
    a2.position = b.position;
    b2.position = a.position;
    a2.version = 1;
    b2.version = 1;
    assert!(store
        .update_pair(0, a2, 0, b2)
        .await
        .expect("update_pair should succeed"));

    // One stale version fails the whole pair.
    let mut a3 = store.get(a.id).await.unwrap().unwrap();
    let mut b3 = store.get(b.id).await.unwrap().unwrap();
    a3.version = 2;
    b3.version = 2;
    assert!(!store
        .update_pair(1, a3, 0, b3)
        .await
        .expect("update_pair should succeed"));

    let a_now = store.get(a.id).await.unwrap().unwrap();
    let b_now = store.get(b.id).await.unwrap().unwrap();
    assert_eq!(a_now.position, 2);
    assert_eq!(b_now.position, 1);
    assert_eq!(a_now.version, 1);
    assert_eq!(b_now.version, 1);
}

#[tokio::test]
async fn remove_reports_whether_the_entry_existed() {
    let store = MemoryQueueStore::new();
    let e = entry(1);
    store.insert(e.clone()).await.expect("insert should succeed");

    assert!(store.remove(e.id).await.expect("remove should succeed"));
    assert!(!store.remove(e.id).await.expect("remove should succeed"));
    assert!(store.get(e.id).await.expect("get should succeed").is_none());
}

#[tokio::test]
async fn next_position_is_strictly_increasing() {
    let store = MemoryQueueStore::new();

    let first = store.next_position().await.expect("should succeed");
    let second = store.next_position().await.expect("should succeed");
    let third = store.next_position().await.expect("should succeed");
    assert!(first < second && second < third);
}

#[tokio::test]
async fn list_returns_every_entry() {
    let store = MemoryQueueStore::new();
    store.insert(entry(1)).await.expect("insert should succeed");
    store.insert(entry(2)).await.expect("insert should succeed");
    store.insert(entry(3)).await.expect("insert should succeed");

    let all = store.list().await.expect("list should succeed");
    assert_eq!(all.len(), 3);
}
