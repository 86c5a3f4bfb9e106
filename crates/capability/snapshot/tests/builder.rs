use api_contract::EntityStateDto;
use domain::SlotStatus;
use lockly_snapshot::{EntitySnapshot, build_slots, filter_entry, slots_for_entry};
use serde_json::{Value, json};

fn observation(state: Option<&str>, attributes: Value) -> EntityStateDto {
    EntityStateDto {
        state: state.map(str::to_string),
        attributes: attributes.as_object().cloned().unwrap_or_default(),
    }
}

fn snapshot(items: Vec<(&str, EntityStateDto)>) -> EntitySnapshot {
    items
        .into_iter()
        .map(|(entity_id, state)| (entity_id.to_string(), state))
        .collect()
}

#[test]
fn filter_keeps_only_tagged_entry() {
    let snapshot = snapshot(vec![
        ("sensor.b", observation(None, json!({"lockly_entry_id": "e1", "lockly_slot": 1}))),
        ("sensor.a", observation(None, json!({"entry_id": "e1", "slot": 2}))),
        ("sensor.c", observation(None, json!({"lockly_entry_id": "e2", "lockly_slot": 1}))),
        ("light.x", observation(Some("on"), json!({}))),
    ]);
    let filtered = filter_entry(&snapshot, "e1");
    let ids: Vec<&str> = filtered.iter().map(|item| item.entity_id).collect();
    assert_eq!(ids, vec!["sensor.a", "sensor.b"]);
    assert!(filter_entry(&snapshot, "missing").is_empty());
}

#[test]
fn slots_are_sorted_and_distinct() {
    let snapshot = snapshot(vec![
        ("sensor.s3", observation(None, json!({"lockly_entry_id": "e1", "lockly_slot": 3, "name": "Carol"}))),
        ("sensor.s1", observation(None, json!({"lockly_entry_id": "e1", "lockly_slot": 1, "name": "Alice"}))),
        ("sensor.s1_pin", observation(None, json!({"lockly_entry_id": "e1", "lockly_slot": "1", "pin": "1234"}))),
        ("sensor.s2", observation(None, json!({"lockly_entry_id": "e1", "lockly_slot": 2}))),
    ]);
    let slots = slots_for_entry(&snapshot, "e1");
    let ids: Vec<u32> = slots.iter().map(|slot| slot.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(slots[0].name, "Alice");
    assert_eq!(slots[0].pin, "1234");
}

#[test]
fn partial_observation_defaults_fields() {
    let snapshot = snapshot(vec![(
        "sensor.s5",
        observation(None, json!({"lockly_entry_id": "e1", "lockly_slot": 5})),
    )]);
    let slots = slots_for_entry(&snapshot, "e1");
    assert_eq!(slots.len(), 1);
    let slot = &slots[0];
    assert_eq!(slot.id, 5);
    assert!(slot.name.is_empty());
    assert!(slot.pin.is_empty());
    assert!(!slot.enabled);
    assert!(!slot.busy);
    assert_eq!(slot.status, SlotStatus::Idle);
}

#[test]
fn typed_entities_feed_their_state() {
    let snapshot = snapshot(vec![
        ("text.slot_1_name", observation(Some("Dana"), json!({"lockly_entry_id": "e1", "lockly_slot": 1, "lockly_type": "name"}))),
        ("text.slot_1_pin", observation(Some("987654"), json!({"lockly_entry_id": "e1", "lockly_slot": 1, "lockly_type": "pin"}))),
        ("switch.slot_1_enabled", observation(Some("on"), json!({"lockly_entry_id": "e1", "lockly_slot": 1, "lockly_type": "enabled"}))),
        ("sensor.slot_1_status", observation(None, json!({"lockly_entry_id": "e1", "lockly_slot": 1, "busy": true, "status": "queued"}))),
    ]);
    let slots = slots_for_entry(&snapshot, "e1");
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].name, "Dana");
    assert_eq!(slots[0].pin, "987654");
    assert!(slots[0].enabled);
    assert!(slots[0].busy);
    assert_eq!(slots[0].status, SlotStatus::Queued);
}

#[test]
fn output_is_independent_of_input_order() {
    let a = observation(None, json!({"lockly_entry_id": "e1", "lockly_slot": 1, "name": "First", "status": "updating"}));
    let b = observation(None, json!({"lockly_entry_id": "e1", "lockly_slot": 1, "name": "Second", "status": "timeout"}));
    let forward = snapshot(vec![("sensor.a", a.clone()), ("sensor.b", b.clone())]);
    let backward = snapshot(vec![("sensor.b", b), ("sensor.a", a)]);

    let first = build_slots(&filter_entry(&forward, "e1"));
    let second = build_slots(&filter_entry(&backward, "e1"));
    assert_eq!(first, second);
    assert_eq!(first[0].name, "First");
    assert_eq!(first[0].status, SlotStatus::Timeout);
}
