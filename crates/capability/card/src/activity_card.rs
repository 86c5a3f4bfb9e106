use std::sync::Arc;
use std::time::Duration;

use domain::ActivityEvent;
use lockly_activity::{ActivityPoller, ActivityQuery, DedupConfig, FeedItem, project};
use lockly_config::{ActivityView, CardConfig};
use lockly_telemetry::record_events_suppressed;

use crate::now_ms;

/// 活动轮询间隔。
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// 原始历史 → 卡片行，按卡片配置选择视图与条数。
///
/// `newest_first` 为查询通道的返回顺序；投影前转回存储顺序。
pub fn build_feed(
    newest_first: &[ActivityEvent],
    config: &CardConfig,
    dedup: &DedupConfig,
    now_ms: i64,
) -> Vec<FeedItem> {
    let raw: Vec<ActivityEvent> = newest_first.iter().rev().cloned().collect();
    let items = project(
        &raw,
        dedup,
        config.view == ActivityView::PerLock,
        config.max_events,
        now_ms,
    );
    let suppressed: usize = items.iter().map(|item| item.suppressed).sum();
    if suppressed > 0 {
        record_events_suppressed(suppressed as u64);
    }
    items
}

/// 活动卡片实例：独占自己的轮询任务与原始事件缓存。
pub struct ActivityCard {
    config: CardConfig,
    dedup: DedupConfig,
    query: Arc<dyn ActivityQuery>,
    poller: Option<ActivityPoller>,
}

impl ActivityCard {
    pub fn new(config: CardConfig, query: Arc<dyn ActivityQuery>) -> Self {
        Self {
            config,
            dedup: DedupConfig::default(),
            query,
            poller: None,
        }
    }

    pub fn with_dedup(mut self, dedup: DedupConfig) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    /// 开始轮询；已有轮询先停止。
    pub fn start(&mut self, interval: Duration) {
        self.stop();
        self.poller = Some(ActivityPoller::spawn(
            self.query.clone(),
            self.config.entry_id.clone(),
            self.config.max_events,
            interval,
        ));
    }

    /// 卸载时停止轮询。
    pub fn stop(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(ActivityPoller::is_running)
    }

    /// 按当前时钟渲染。
    pub async fn render(&self) -> Vec<FeedItem> {
        self.render_at(now_ms()).await
    }

    /// 尚未拉到数据时返回空列表。
    pub async fn render_at(&self, now_ms: i64) -> Vec<FeedItem> {
        let raw = match &self.poller {
            Some(poller) => poller.events().await,
            None => Vec::new(),
        };
        build_feed(&raw, &self.config, &self.dedup, now_ms)
    }
}

impl Drop for ActivityCard {
    fn drop(&mut self) {
        self.stop();
    }
}
