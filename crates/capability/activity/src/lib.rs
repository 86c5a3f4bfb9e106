//! 门锁活动：分类、去重与视图投影。
//!
//! 原始事件只追加不修改；去重结果只是视图，被折叠的事件仍保留在组内。

pub mod classify;
pub mod dedup;
pub mod poller;
pub mod project;

pub use classify::{ActionCategory, Direction, classify, describe};
pub use dedup::{DedupConfig, DedupRule, FeedEntry, dedup};
pub use poller::{ActivityPoller, ActivityQuery, refresh};
pub use project::{FeedItem, last_unlock, per_lock, project, recent, relative_time};

/// 活动链路错误。
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActivityError {
    #[error("query error: {0}")]
    Query(String),
}
