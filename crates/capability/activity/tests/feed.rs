use domain::{ActionSource, ActivityEvent, LockAction};
use lockly_activity::{
    ActionCategory, DedupConfig, dedup, last_unlock, per_lock, project, recent,
};

const T0: i64 = 1_700_000_000_000;

fn event(lock: &str, action: LockAction, ts_ms: i64) -> ActivityEvent {
    ActivityEvent::new(lock, action, ts_ms)
}

fn rf(lock: &str, action: LockAction, ts_ms: i64) -> ActivityEvent {
    event(lock, action, ts_ms).with_source(ActionSource::Rf)
}

#[test]
fn recent_view_is_newest_first_and_capped() {
    let raw = vec![
        event("Front Door", LockAction::Unlock, T0).with_user("Alice"),
        event("Garage", LockAction::Lock, T0 + 10_000),
        event("Front Door", LockAction::AutoLock, T0 + 20_000),
    ];
    let entries = dedup(&raw, &DedupConfig::default());
    let view = recent(&entries, 2);
    let stamps: Vec<i64> = view.iter().map(|entry| entry.event.ts_ms).collect();
    assert_eq!(stamps, vec![T0 + 20_000, T0 + 10_000]);
}

#[test]
fn per_lock_view_keeps_latest_per_lock() {
    let raw = vec![
        event("Front Door", LockAction::Unlock, T0).with_user("Alice"),
        event("Garage", LockAction::Lock, T0 + 10_000),
        event("Front Door", LockAction::AutoLock, T0 + 20_000),
        event("Garage", LockAction::Unlock, T0 + 30_000).with_slot(2),
    ];
    let entries = dedup(&raw, &DedupConfig::default());
    let view = per_lock(&entries);
    assert_eq!(view.len(), 2);
    assert_eq!(view[0].event.lock, "Garage");
    assert_eq!(view[0].event.ts_ms, T0 + 30_000);
    assert_eq!(view[1].event.lock, "Front Door");
    assert_eq!(view[1].event.action, LockAction::AutoLock);
}

#[test]
fn per_lock_view_uses_deduplicated_events() {
    let raw = vec![
        event("Front Door", LockAction::OneTouchLock, T0),
        rf("Front Door", LockAction::Lock, T0 + 30_000),
    ];
    let entries = dedup(&raw, &DedupConfig::default());
    let view = per_lock(&entries);
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].event.action, LockAction::OneTouchLock);
}

#[test]
fn last_unlock_scans_same_lock_only() {
    let raw = vec![
        event("Front Door", LockAction::Unlock, T0).with_user("Alice"),
        event("Back Door", LockAction::Unlock, T0 + 5_000).with_user("Mallory"),
        event("Front Door", LockAction::UnlockFailureInvalidPinOrId, T0 + 6_000).with_slot(9),
        event("Front Door", LockAction::Lock, T0 + 10_000),
    ];
    let found = last_unlock(&raw, &raw[3]).expect("last unlock");
    assert_eq!(found.user_name.as_deref(), Some("Alice"));
}

#[test]
fn last_unlock_sees_suppressed_duplicates() {
    // 手动解锁带槽位，自动化回显被保留为代表事件；回溯仍能找到槽位。
    let raw = vec![
        event("Front Door", LockAction::ManualUnlock, T0).with_slot(3),
        rf("Front Door", LockAction::Unlock, T0 + 1_000),
        event("Front Door", LockAction::AutoLock, T0 + 60_000),
    ];
    let items = project(&raw, &DedupConfig::default(), false, 10, T0 + 120_000);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].action, "auto_lock");
    assert_eq!(items[0].last_unlocked_by.as_deref(), Some("Slot 3"));
    assert_eq!(items[1].source.as_deref(), Some("automation"));
    assert_eq!(items[1].collapsed_by, Some("firmware_echo"));
    assert_eq!(items[1].suppressed, 1);
}

#[test]
fn events_with_actor_skip_correlation() {
    let raw = vec![
        event("Front Door", LockAction::Unlock, T0).with_user("Alice"),
        event("Front Door", LockAction::Lock, T0 + 1_000).with_user("Bob"),
    ];
    assert!(last_unlock(&raw, &raw[1]).is_none());
}

#[test]
fn projected_item_carries_display_fields() {
    let raw = vec![event("Front Door", LockAction::Unlock, T0)
        .with_user("Alice")
        .with_source(ActionSource::Keypad)];
    let items = project(&raw, &DedupConfig::default(), true, 5, T0 + 90_000);
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.category, ActionCategory::Unlock);
    assert_eq!(item.icon, "mdi:lock-open-variant");
    assert_eq!(item.description, "unlocked by Alice via keypad");
    assert_eq!(item.time_ago, "1m ago");
    assert!(item.last_unlocked_by.is_none());
}

#[test]
fn last_unlock_prefers_later_stored_event_on_tie() {
    let raw = vec![
        event("Front Door", LockAction::Unlock, T0).with_user("Alice"),
        event("Front Door", LockAction::Unlock, T0).with_user("Bob"),
        event("Front Door", LockAction::AutoLock, T0 + 10_000),
    ];
    let found = last_unlock(&raw, &raw[2]).expect("last unlock");
    assert_eq!(found.user_name.as_deref(), Some("Bob"));
}
