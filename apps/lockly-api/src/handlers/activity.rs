//! 活动接口
//!
//! - GET /api/entries/:entry_id/recent_activity?max_events=
//! - POST /api/entries/:entry_id/activity
//! - GET /api/entries/:entry_id/feed?view=&max_events=

use api_contract::ActivityEventDto;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use lockly_activity::DedupConfig;
use lockly_card::{build_feed, now_ms};
use lockly_config::{ActivityView, CardConfig, DEFAULT_MAX_EVENTS, MAX_EVENTS_LIMIT};
use serde::Deserialize;

use crate::AppState;
use crate::utils::response::{bad_request_error, card_error, contract_error, ok};

#[derive(Debug, Deserialize)]
pub struct RecentActivityQuery {
    pub max_events: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub view: Option<String>,
    pub max_events: Option<usize>,
}

/// 原始事件，最新在前。
pub async fn get_recent_activity(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Query(query): Query<RecentActivityQuery>,
) -> Response {
    let max_events = clamp_max_events(query.max_events);
    match state.host.recent_events(&entry_id, max_events).await {
        Ok(events) => {
            let data: Vec<ActivityEventDto> =
                events.iter().map(ActivityEventDto::from_event).collect();
            ok(data)
        }
        Err(err) => card_error(err),
    }
}

/// 追加一条原始事件。
pub async fn post_activity(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Json(req): Json<ActivityEventDto>,
) -> Response {
    let event = match req.into_event() {
        Ok(event) => event,
        Err(err) => return contract_error(err),
    };
    let data = ActivityEventDto::from_event(&event);
    match state.host.record_activity(&entry_id, event).await {
        Ok(()) => ok(data),
        Err(err) => card_error(err),
    }
}

/// 去重后的活动视图。
pub async fn get_feed(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Response {
    let view = match query.view.as_deref() {
        None => ActivityView::Recent,
        Some(value) => match ActivityView::parse(value) {
            Some(view) => view,
            None => return bad_request_error("invalid_view", format!("unknown view: {value}")),
        },
    };
    let mut config = CardConfig::new(entry_id.clone());
    config.view = view;
    config.max_events = clamp_max_events(query.max_events);

    match state
        .host
        .recent_events(&entry_id, state.activity_capacity)
        .await
    {
        Ok(raw) => ok(build_feed(&raw, &config, &DedupConfig::default(), now_ms())),
        Err(err) => card_error(err),
    }
}

fn clamp_max_events(value: Option<usize>) -> usize {
    value
        .unwrap_or(DEFAULT_MAX_EVENTS)
        .clamp(1, MAX_EVENTS_LIMIT)
}
