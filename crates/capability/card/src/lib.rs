//! # Lockly Card 模块
//!
//! 卡片实例与本地宿主适配。
//!
//! - `SlotCard`：槽位卡片（权限、展示模型、命令编排入口、导出）
//! - `ActivityCard`：活动卡片（轮询 + 去重视图）
//! - `LocalHost`：进程内参考宿主，基于 storage 实现命令通道、查询通道与实体快照
//!
//! 卡片实例之间不共享状态；宿主注册只发生在边界适配器中。

mod activity_card;
mod host;
mod slot_card;

use api_contract::{EntryConfigDto, EntrySummaryDto, VersionDto};
use async_trait::async_trait;
use lockly_control::ControlError;
use lockly_storage::StorageError;

pub use activity_card::{ActivityCard, DEFAULT_POLL_INTERVAL, build_feed};
pub use host::{CommandOutcome, EntrySlots, LocalHost, MAX_ACTION_RETRIES};
pub use slot_card::{SlotCard, SlotCardView, SlotExport, SlotRow};

/// 卡片与宿主错误。
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("no available slots")]
    NoAvailableSlots,
    #[error("slot not found: {0}")]
    SlotNotFound(u32),
    #[error("slot out of range: {0}")]
    InvalidSlot(u32),
    #[error("invalid pin")]
    InvalidPin,
    #[error("no locks configured")]
    NoLocksConfigured,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Control(#[from] ControlError),
}

impl CardError {
    /// 对外错误码（命令通道与 HTTP 响应共用）。
    pub fn code(&self) -> &'static str {
        match self {
            Self::EntryNotFound(_) => "entry_not_found",
            Self::MissingField(_) => "missing_field",
            Self::NoAvailableSlots => "no_available_slots",
            Self::SlotNotFound(_) => "slot_not_found",
            Self::InvalidSlot(_) => "invalid_slot",
            Self::InvalidPin => "invalid_pin",
            Self::NoLocksConfigured => "no_locks_configured",
            Self::Storage(_) => "storage_error",
            Self::Control(ControlError::Validation { .. }) => "validation_error",
            Self::Control(ControlError::Forbidden) => "forbidden",
            Self::Control(_) => "command_failed",
        }
    }
}

/// 版本 / 配置 / 条目列表查询通道。
#[async_trait]
pub trait EntryQuery: Send + Sync {
    async fn version(&self) -> Result<VersionDto, CardError>;

    async fn entry_config(&self, entry_id: &str) -> Result<EntryConfigDto, CardError>;

    async fn entries(&self) -> Result<Vec<EntrySummaryDto>, CardError>;
}

/// 当前毫秒时间戳。
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
