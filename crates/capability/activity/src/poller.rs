use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::ActivityEvent;
use lockly_telemetry::record_activity_poll;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::ActivityError;

/// 原始活动查询通道。
#[async_trait]
pub trait ActivityQuery: Send + Sync {
    async fn recent_activity(
        &self,
        entry_id: &str,
        max_events: usize,
    ) -> Result<Vec<ActivityEvent>, ActivityError>;
}

/// 固定间隔拉取原始活动，结果整体替换缓存。
///
/// 单任务顺序轮询：上一轮未完成时到期的 tick 直接跳过。
/// 失败只记 debug 日志并保留上一次缓存。
pub struct ActivityPoller {
    cache: Arc<RwLock<Vec<ActivityEvent>>>,
    handle: Option<JoinHandle<()>>,
}

impl ActivityPoller {
    pub fn spawn(
        query: Arc<dyn ActivityQuery>,
        entry_id: impl Into<String>,
        max_events: usize,
        interval: Duration,
    ) -> Self {
        let entry_id = entry_id.into();
        let cache = Arc::new(RwLock::new(Vec::new()));
        let task_cache = cache.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                refresh(query.as_ref(), &entry_id, max_events, &task_cache).await;
            }
        });
        Self {
            cache,
            handle: Some(handle),
        }
    }

    /// 当前缓存的原始事件（最新在前）。
    pub async fn events(&self) -> Vec<ActivityEvent> {
        self.cache.read().await.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 停止轮询；已完成的结果保留。
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ActivityPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 拉取一次并替换缓存。返回是否成功。
pub async fn refresh(
    query: &dyn ActivityQuery,
    entry_id: &str,
    max_events: usize,
    cache: &RwLock<Vec<ActivityEvent>>,
) -> bool {
    match query.recent_activity(entry_id, max_events).await {
        Ok(events) => {
            record_activity_poll(true);
            *cache.write().await = events;
            true
        }
        Err(err) => {
            record_activity_poll(false);
            debug!(
                target: "lockly.activity",
                entry_id = %entry_id,
                error = %err,
                "activity_poll_failed"
            );
            false
        }
    }
}
