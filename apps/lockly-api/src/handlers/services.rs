//! 命令通道与查询通道
//!
//! - POST /api/services/:service（add_slot / update_slot / apply_slot / apply_all / remove_slot / wipe_slots / import_slots）
//! - POST /api/query（`{"type": "lockly/..."}` 消息）

use api_contract::{CommandName, QueryRequest, SlotCommandPayload};
use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use tracing::info;

use crate::AppState;
use crate::utils::response::{card_error, contract_error, ok};

pub async fn call_service(
    State(state): State<AppState>,
    Path(service): Path<String>,
    Json(payload): Json<SlotCommandPayload>,
) -> Response {
    let command = match CommandName::parse(&service) {
        Ok(command) => command,
        Err(err) => return contract_error(err),
    };
    info!(
        target: "lockly.api",
        command = command.as_str(),
        payload = ?payload.masked(),
        "service_called"
    );
    match state.host.execute(command, &payload).await {
        Ok(outcome) => ok(outcome),
        Err(err) => card_error(err),
    }
}

pub async fn post_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    match state.host.query(request).await {
        Ok(value) => ok(value),
        Err(err) => card_error(err),
    }
}
