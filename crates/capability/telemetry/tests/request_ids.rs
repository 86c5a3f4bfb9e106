use lockly_telemetry::{metrics, new_command_id, new_request_ids, record_activity_poll};

#[test]
fn request_ids_non_empty() {
    let ids = new_request_ids();
    assert!(!ids.request_id.is_empty());
    assert!(!ids.trace_id.is_empty());
    assert_ne!(ids.request_id, ids.trace_id);
}

#[test]
fn command_ids_are_unique() {
    assert_ne!(new_command_id(), new_command_id());
}

#[test]
fn failed_poll_counts_twice() {
    let before = metrics().snapshot();
    record_activity_poll(false);
    let after = metrics().snapshot();
    assert!(after.activity_polls > before.activity_polls);
    assert!(after.activity_poll_failures > before.activity_poll_failures);
}
