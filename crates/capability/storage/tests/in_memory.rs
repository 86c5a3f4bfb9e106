use domain::{ActivityEvent, LockAction, Slot};
use lockly_storage::{
    ActivityStore, EntryRecord, EntryStore, InMemoryActivityStore, InMemoryEntryStore,
    InMemorySlotStore, SlotStore,
};

#[tokio::test]
async fn slots_list_in_id_order_per_entry() {
    let store = InMemorySlotStore::new();
    for id in [5, 1, 3] {
        store.upsert_slot("e1", Slot::new(id)).await.expect("upsert");
    }
    store.upsert_slot("e2", Slot::new(2)).await.expect("upsert");

    let ids: Vec<u32> = store
        .list_slots("e1")
        .await
        .expect("list")
        .iter()
        .map(|slot| slot.id)
        .collect();
    assert_eq!(ids, vec![1, 3, 5]);
    assert!(store.list_slots("missing").await.expect("list").is_empty());
}

#[tokio::test]
async fn slot_delete_reports_presence() {
    let store = InMemorySlotStore::new();
    store.upsert_slot("e1", Slot::new(1)).await.expect("upsert");
    assert!(store.delete_slot("e1", 1).await.expect("delete"));
    assert!(!store.delete_slot("e1", 1).await.expect("delete"));
    assert!(store.find_slot("e1", 1).await.expect("find").is_none());
}

#[tokio::test]
async fn activity_ring_buffer_evicts_oldest() {
    let store = InMemoryActivityStore::with_capacity(3);
    for ts_ms in 0..5 {
        store
            .append_event("e1", ActivityEvent::new("Front Door", LockAction::Lock, ts_ms))
            .await
            .expect("append");
    }
    assert_eq!(store.len("e1"), 3);

    let recent = store.recent_events("e1", 10).await.expect("recent");
    let stamps: Vec<i64> = recent.iter().map(|event| event.ts_ms).collect();
    assert_eq!(stamps, vec![4, 3, 2]);

    let capped = store.recent_events("e1", 1).await.expect("recent");
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].ts_ms, 4);
}

#[tokio::test]
async fn default_activity_capacity_is_one_hundred() {
    let store = InMemoryActivityStore::new();
    assert_eq!(store.capacity(), 100);
}

#[tokio::test]
async fn entries_round_trip_and_validate_range() {
    let store = InMemoryEntryStore::with_entries([EntryRecord::new("e1", "Home")]);
    let found = store.find_entry("e1").await.expect("find").expect("entry");
    assert_eq!(found.title, "Home");
    assert!(found.contains_slot(20));
    assert!(!found.contains_slot(21));

    let mut broken = EntryRecord::new("e2", "Broken");
    broken.first_slot = 10;
    broken.last_slot = 2;
    assert!(store.upsert_entry(broken).await.is_err());
    assert_eq!(store.list_entries().await.expect("list").len(), 1);
}
