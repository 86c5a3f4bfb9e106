//! HTTP 响应辅助函数
//!
//! - 成功响应：ok
//! - 错误响应：bad_request_error, card_error, contract_error
//!
//! 所有响应使用统一的 ApiResponse 封装；条目不存在返回 404，
//! 命令与输入校验失败返回 400，存储异常返回 500。

use api_contract::{ApiResponse, ContractError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lockly_card::CardError;
use serde::Serialize;
use tracing::{debug, warn};

/// 成功响应
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// 错误请求响应
pub fn bad_request_error(code: &str, message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(code, message.into())),
    )
        .into_response()
}

/// 卡片 / 宿主错误响应
pub fn card_error(err: CardError) -> Response {
    let status = match &err {
        CardError::EntryNotFound(_) => StatusCode::NOT_FOUND,
        CardError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    if status.is_server_error() {
        warn!(target: "lockly.api", code = err.code(), error = %err, "request_failed");
    } else {
        debug!(target: "lockly.api", code = err.code(), error = %err, "request_rejected");
    }
    (
        status,
        Json(ApiResponse::<()>::error(err.code(), err.to_string())),
    )
        .into_response()
}

/// 契约解析错误响应
pub fn contract_error(err: ContractError) -> Response {
    let code = match &err {
        ContractError::InvalidTimestamp(_) => "invalid_timestamp",
        ContractError::UnknownCommand(_) => "unknown_command",
    };
    bad_request_error(code, err.to_string())
}
