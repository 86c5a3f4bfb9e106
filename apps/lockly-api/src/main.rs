//! Lockly HTTP 边界适配器：查询通道、命令通道与活动视图，附请求追踪 ID。

mod handlers;
mod routes;
mod utils;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use lockly_card::LocalHost;
use lockly_config::HostConfig;
use lockly_storage::{EntryRecord, InMemoryActivityStore, InMemoryEntryStore, InMemorySlotStore};
use lockly_telemetry::{init_tracing, new_request_ids};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub host: Arc<LocalHost>,
    /// 活动视图读取的原始事件上限（环形缓冲容量）。
    pub activity_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = HostConfig::from_env()?;
    init_tracing();

    let state = build_state(&config);
    spawn_settle_loop(
        state.host.clone(),
        Duration::from_millis(config.settle_interval_ms),
    );
    let app = build_app(state);

    info!(
        target: "lockly.api",
        http_addr = %config.http_addr,
        entry_id = %config.entry_id,
        "server_starting"
    );
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 按宿主配置装配内存存储与本地宿主。
pub fn build_state(config: &HostConfig) -> AppState {
    let mut entry = EntryRecord::new(config.entry_id.clone(), config.entry_title.clone());
    entry.lock_names = config.lock_names.clone();
    entry.first_slot = config.first_slot;
    entry.last_slot = config.last_slot;

    let host = LocalHost::new(
        env!("CARGO_PKG_VERSION"),
        Arc::new(InMemoryEntryStore::with_entries([entry])),
        Arc::new(InMemorySlotStore::new()),
        Arc::new(InMemoryActivityStore::with_capacity(config.activity_capacity)),
    );
    AppState {
        host: Arc::new(host),
        activity_capacity: config.activity_capacity,
    }
}

pub fn build_app(state: AppState) -> Router {
    routes::create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
}

/// 定时推进待下发任务。
fn spawn_settle_loop(host: Arc<LocalHost>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(err) = host.settle().await {
                warn!(target: "lockly.api", error = %err, "settle_failed");
            }
        }
    });
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}
