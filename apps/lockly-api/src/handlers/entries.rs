//! 条目查询接口
//!
//! - GET /health
//! - GET /api/version
//! - GET /api/entries
//! - GET /api/entries/:entry_id/config
//! - GET /api/entries/:entry_id/states

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use lockly_card::EntryQuery;

use crate::AppState;
use crate::utils::response::{card_error, ok};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_version(State(state): State<AppState>) -> Response {
    match state.host.version().await {
        Ok(version) => ok(version),
        Err(err) => card_error(err),
    }
}

/// 条目列表；没有条目时返回空数组。
pub async fn list_entries(State(state): State<AppState>) -> Response {
    match state.host.entries().await {
        Ok(entries) => ok(entries),
        Err(err) => card_error(err),
    }
}

pub async fn get_entry_config(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Response {
    match state.host.entry_config(&entry_id).await {
        Ok(config) => ok(config),
        Err(err) => card_error(err),
    }
}

/// 实体快照（entity_id → state/attributes）。
pub async fn get_entry_states(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Response {
    match state.host.entity_states(&entry_id).await {
        Ok(states) => ok(states),
        Err(err) => card_error(err),
    }
}
