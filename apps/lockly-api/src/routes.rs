//! 路由定义
//!
//! - 健康检查：/health
//! - 查询通道：/api/version, /api/entries, /api/entries/:entry_id/config, /api/query
//! - 实体快照：/api/entries/:entry_id/states
//! - 活动：/api/entries/:entry_id/recent_activity, /activity, /feed
//! - 命令通道：/api/services/:service
//! - 计数器：/api/metrics

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

/// 创建 API 路由
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/version", get(get_version))
        .route("/api/entries", get(list_entries))
        .route("/api/entries/:entry_id/config", get(get_entry_config))
        .route("/api/entries/:entry_id/states", get(get_entry_states))
        .route(
            "/api/entries/:entry_id/recent_activity",
            get(get_recent_activity),
        )
        .route("/api/entries/:entry_id/activity", post(post_activity))
        .route("/api/entries/:entry_id/feed", get(get_feed))
        .route("/api/services/:service", post(call_service))
        .route("/api/query", post(post_query))
        .route("/api/metrics", get(get_metrics))
}

#[cfg(test)]
mod tests {
    use crate::{build_app, build_state};
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use lockly_config::HostConfig;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn app() -> Router {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LOCKLY_ENTRY_ID", "home"),
            ("LOCKLY_ENTRY_TITLE", "Home"),
            ("LOCKLY_LOCK_NAMES", "Front Door, Garage"),
            ("LOCKLY_LAST_SLOT", "2"),
        ]);
        let config = HostConfig::from_source(|key| vars.get(key).map(|value| value.to_string()))
            .expect("config");
        build_app(build_state(&config))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health_carries_request_ids() {
        let response = app().oneshot(get("/health")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-trace-id"));
    }

    #[tokio::test]
    async fn entries_and_version_are_listed() {
        let app = app();
        let (status, body) = send(&app, get("/api/entries")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["entry_id"], "home");
        assert_eq!(body["data"][0]["title"], "Home");

        let (status, body) = send(&app, get("/api/version")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let (status, body) = send(&app(), get("/api/entries/nope/config")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "entry_not_found");
    }

    #[tokio::test]
    async fn slot_commands_flow_through_services() {
        let app = app();
        let (status, body) = send(
            &app,
            post("/api/services/add_slot", json!({"entry_id": "home"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slots"], json!([1]));

        let (status, body) = send(
            &app,
            post(
                "/api/services/update_slot",
                json!({"entry_id": "home", "slot": 1, "pin": "12", "enabled": true}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_pin");

        let (status, _) = send(
            &app,
            post(
                "/api/services/update_slot",
                json!({"entry_id": "home", "slot": 1, "name": "Alice", "pin": "1234", "enabled": true}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            post("/api/services/apply_slot", json!({"entry_id": "home", "slot": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, get("/api/entries/home/states")).await;
        assert_eq!(status, StatusCode::OK);
        let entity = &body["data"]["lockly.home_slot_1"];
        assert_eq!(entity["state"], "enabled");
        assert_eq!(entity["attributes"]["status"], "queued");
        assert_eq!(entity["attributes"]["busy"], true);
    }

    #[tokio::test]
    async fn import_slots_respects_entry_range() {
        let app = app();
        let (status, body) = send(
            &app,
            post(
                "/api/services/import_slots",
                json!({"entry_id": "home", "items": [
                    {"slot": 1, "name": "Alice", "pin": "1234", "enabled": true},
                    {"slot": 2, "name": "Bob"}
                ]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slots"], json!([1, 2]));

        let (status, body) = send(&app, get("/api/entries/home/states")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["lockly.home_slot_1"]["state"], "enabled");
        assert_eq!(body["data"]["lockly.home_slot_2"]["state"], "disabled");

        let (status, body) = send(
            &app,
            post(
                "/api/services/import_slots",
                json!({"entry_id": "home", "replace": false, "items": [{"slot": 3}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_slot");
    }

    #[tokio::test]
    async fn unknown_service_is_rejected() {
        let (status, body) = send(
            &app(),
            post("/api/services/unlock_everything", json!({"entry_id": "home"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "unknown_command");
    }

    #[tokio::test]
    async fn recorded_activity_is_deduplicated_in_feed() {
        let app = app();
        for event in [
            json!({"lock": "Front Door", "action": "manual_unlock", "timestamp": "2026-01-01T10:00:00Z"}),
            json!({"lock": "Front Door", "action": "unlock", "source": "rf", "timestamp": "2026-01-01T10:00:02Z"}),
        ] {
            let (status, _) = send(&app, post("/api/entries/home/activity", event)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, get("/api/entries/home/recent_activity")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["data"][0]["action"], "unlock");

        let (status, body) = send(&app, get("/api/entries/home/feed?view=recent")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["data"][0]["source"], "automation");
        assert_eq!(body["data"][0]["collapsed_by"], "firmware_echo");
    }

    #[tokio::test]
    async fn bad_activity_input_is_rejected() {
        let app = app();
        let (status, body) = send(
            &app,
            post(
                "/api/entries/home/activity",
                json!({"lock": "Front Door", "action": "lock", "timestamp": "yesterday"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_timestamp");

        let (status, body) = send(&app, get("/api/entries/home/feed?view=weekly")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_view");
    }

    #[tokio::test]
    async fn query_channel_accepts_typed_messages() {
        let (status, body) = send(
            &app(),
            post("/api/query", json!({"type": "lockly/config", "entry_id": "home"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Home");
    }

    #[tokio::test]
    async fn metrics_count_recorded_events() {
        let app = app();
        let event = json!({"lock": "Garage", "action": "lock", "timestamp": "2026-01-01T10:00:00Z"});
        send(&app, post("/api/entries/home/activity", event)).await;

        let (status, body) = send(&app, get("/api/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["events_recorded"].as_u64().unwrap_or(0) >= 1);
    }
}
