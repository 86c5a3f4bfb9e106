//! 进程级计数器快照。
//!
//! - GET /api/metrics

use axum::response::Response;
use lockly_telemetry::metrics;
use serde_json::json;

use crate::utils::response::ok;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    ok(json!({
        "commands_issued": snapshot.commands_issued,
        "command_failures": snapshot.command_failures,
        "validation_rejections": snapshot.validation_rejections,
        "permission_denials": snapshot.permission_denials,
        "add_poll_give_ups": snapshot.add_poll_give_ups,
        "activity_polls": snapshot.activity_polls,
        "activity_poll_failures": snapshot.activity_poll_failures,
        "events_recorded": snapshot.events_recorded,
        "events_suppressed": snapshot.events_suppressed,
    }))
}
