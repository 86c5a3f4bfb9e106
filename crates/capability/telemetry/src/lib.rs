//! 追踪、请求 ID 与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub commands_issued: u64,
    pub command_failures: u64,
    pub validation_rejections: u64,
    pub permission_denials: u64,
    pub add_poll_give_ups: u64,
    pub activity_polls: u64,
    pub activity_poll_failures: u64,
    pub events_recorded: u64,
    pub events_suppressed: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    commands_issued: AtomicU64,
    command_failures: AtomicU64,
    validation_rejections: AtomicU64,
    permission_denials: AtomicU64,
    add_poll_give_ups: AtomicU64,
    activity_polls: AtomicU64,
    activity_poll_failures: AtomicU64,
    events_recorded: AtomicU64,
    events_suppressed: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            commands_issued: AtomicU64::new(0),
            command_failures: AtomicU64::new(0),
            validation_rejections: AtomicU64::new(0),
            permission_denials: AtomicU64::new(0),
            add_poll_give_ups: AtomicU64::new(0),
            activity_polls: AtomicU64::new(0),
            activity_poll_failures: AtomicU64::new(0),
            events_recorded: AtomicU64::new(0),
            events_suppressed: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_issued: self.commands_issued.load(Ordering::Relaxed),
            command_failures: self.command_failures.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            permission_denials: self.permission_denials.load(Ordering::Relaxed),
            add_poll_give_ups: self.add_poll_give_ups.load(Ordering::Relaxed),
            activity_polls: self.activity_polls.load(Ordering::Relaxed),
            activity_poll_failures: self.activity_poll_failures.load(Ordering::Relaxed),
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            events_suppressed: self.events_suppressed.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 生成命令 ID（日志关联用）。
pub fn new_command_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录命令下发次数。
pub fn record_command_issued() {
    metrics().commands_issued.fetch_add(1, Ordering::Relaxed);
}

/// 记录命令通道失败次数。
pub fn record_command_failure() {
    metrics().command_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录 PIN 校验拒绝次数。
pub fn record_validation_rejection() {
    metrics()
        .validation_rejections
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_permission_denial() {
    metrics().permission_denials.fetch_add(1, Ordering::Relaxed);
}

/// 记录新增槽位轮询放弃次数。
pub fn record_add_poll_give_up() {
    metrics().add_poll_give_ups.fetch_add(1, Ordering::Relaxed);
}

/// 记录活动轮询结果。
pub fn record_activity_poll(success: bool) {
    let metrics = metrics();
    metrics.activity_polls.fetch_add(1, Ordering::Relaxed);
    if !success {
        metrics
            .activity_poll_failures
            .fetch_add(1, Ordering::Relaxed);
    }
}

/// 记录宿主写入的活动事件数。
pub fn record_event_recorded() {
    metrics().events_recorded.fetch_add(1, Ordering::Relaxed);
}

/// 记录被去重折叠的事件数。
pub fn record_events_suppressed(count: u64) {
    if count > 0 {
        metrics()
            .events_suppressed
            .fetch_add(count, Ordering::Relaxed);
    }
}
