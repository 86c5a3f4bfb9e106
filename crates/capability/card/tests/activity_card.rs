use std::sync::Arc;
use std::time::Duration;

use domain::{ActionSource, ActivityEvent, LockAction};
use lockly_activity::DedupConfig;
use lockly_card::{ActivityCard, LocalHost, build_feed};
use lockly_config::{ActivityView, CardConfig};
use lockly_storage::{EntryRecord, InMemoryActivityStore, InMemoryEntryStore, InMemorySlotStore};

const T0: i64 = 1_700_000_000_000;

fn host() -> Arc<LocalHost> {
    Arc::new(LocalHost::new(
        "1.0.0",
        Arc::new(InMemoryEntryStore::with_entries([EntryRecord::new("e1", "Home")])),
        Arc::new(InMemorySlotStore::new()),
        Arc::new(InMemoryActivityStore::new()),
    ))
}

async fn seed(host: &LocalHost) {
    let events = [
        ActivityEvent::new("Garage", LockAction::Unlock, T0 - 10_000).with_user("Bob"),
        ActivityEvent::new("Front Door", LockAction::ManualUnlock, T0),
        ActivityEvent::new("Front Door", LockAction::Unlock, T0 + 2_000)
            .with_source(ActionSource::Rf),
    ];
    for event in events {
        host.record_activity("e1", event).await.expect("record");
    }
}

#[tokio::test]
async fn poller_feeds_deduplicated_recent_view() {
    let host = host();
    seed(&host).await;

    let mut card = ActivityCard::new(CardConfig::new("e1"), host.clone());
    assert!(card.render_at(T0).await.is_empty());

    card.start(Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(card.is_polling());

    let feed = card.render_at(T0 + 3_000).await;
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].lock, "Front Door");
    assert_eq!(feed[0].source.as_deref(), Some("automation"));
    assert_eq!(feed[0].suppressed, 1);
    assert_eq!(feed[0].time_ago, "just now");
    assert_eq!(feed[1].lock, "Garage");

    card.stop();
    assert!(!card.is_polling());
}

#[tokio::test]
async fn per_lock_view_keeps_latest_event_per_lock() {
    let host = host();
    seed(&host).await;
    host.record_activity(
        "e1",
        ActivityEvent::new("Garage", LockAction::Lock, T0 + 5_000),
    )
    .await
    .expect("record");

    let mut config = CardConfig::new("e1");
    config.view = ActivityView::PerLock;
    let raw = host.recent_events("e1", 100).await.expect("events");
    let feed = build_feed(&raw, &config, &DedupConfig::default(), T0 + 65_000);

    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].lock, "Garage");
    assert_eq!(feed[0].action, "lock");
    assert_eq!(feed[0].last_unlocked_by.as_deref(), Some("Bob"));
    assert_eq!(feed[0].time_ago, "1m ago");
    assert_eq!(feed[1].lock, "Front Door");
}

#[tokio::test]
async fn max_events_caps_the_recent_view() {
    let host = host();
    seed(&host).await;
    let mut config = CardConfig::new("e1");
    config.max_events = 1;
    let raw = host.recent_events("e1", 100).await.expect("events");
    let feed = build_feed(&raw, &config, &DedupConfig::default(), T0);
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].lock, "Front Door");
}

#[tokio::test]
async fn recording_for_unknown_entry_fails() {
    let host = host();
    let event = ActivityEvent::new("Front Door", LockAction::Lock, T0);
    let err = host.record_activity("nope", event).await.expect_err("unknown");
    assert_eq!(err.code(), "entry_not_found");
}

#[tokio::test]
async fn newest_first_history_keeps_storage_order_on_ties() {
    let host = host();
    let events = [
        ActivityEvent::new("Front Door", LockAction::Unlock, T0).with_user("Alice"),
        ActivityEvent::new("Front Door", LockAction::Unlock, T0).with_user("Bob"),
        ActivityEvent::new("Front Door", LockAction::AutoLock, T0 + 10_000),
        ActivityEvent::new("Garage", LockAction::ManualUnlock, T0 + 20_000),
        ActivityEvent::new("Garage", LockAction::Unlock, T0 + 20_000)
            .with_source(ActionSource::Rf),
    ];
    for event in events {
        host.record_activity("e1", event).await.expect("record");
    }

    let raw = host.recent_events("e1", 100).await.expect("events");
    assert_eq!(raw[0].lock, "Garage");
    let feed = build_feed(&raw, &CardConfig::new("e1"), &DedupConfig::default(), T0 + 30_000);

    assert_eq!(feed.len(), 4);
    assert_eq!(feed[0].lock, "Garage");
    assert_eq!(feed[0].collapsed_by, Some("firmware_echo"));
    assert_eq!(feed[0].source.as_deref(), Some("automation"));
    assert_eq!(feed[1].action, "auto_lock");
    assert_eq!(feed[1].last_unlocked_by.as_deref(), Some("Bob"));
}
