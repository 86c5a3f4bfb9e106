//! 存储接口 Trait 定义
//!
//! - SlotStore：槽位记录
//! - ActivityStore：原始活动事件（只追加）
//! - EntryStore：条目配置
//!
//! 所有接口按 entry_id 隔离，返回 StorageError。

use crate::error::StorageError;
use crate::models::EntryRecord;
use async_trait::async_trait;
use domain::{ActivityEvent, Slot};

/// 槽位存储接口
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// 按 id 升序列出槽位
    async fn list_slots(&self, entry_id: &str) -> Result<Vec<Slot>, StorageError>;

    async fn find_slot(&self, entry_id: &str, slot_id: u32) -> Result<Option<Slot>, StorageError>;

    /// 写入（覆盖）槽位
    async fn upsert_slot(&self, entry_id: &str, slot: Slot) -> Result<Slot, StorageError>;

    /// 删除槽位，返回是否存在
    async fn delete_slot(&self, entry_id: &str, slot_id: u32) -> Result<bool, StorageError>;
}

/// 活动事件存储接口
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn append_event(&self, entry_id: &str, event: ActivityEvent) -> Result<(), StorageError>;

    /// 最新在前，最多 `max_events` 条
    async fn recent_events(
        &self,
        entry_id: &str,
        max_events: usize,
    ) -> Result<Vec<ActivityEvent>, StorageError>;
}

/// 条目存储接口
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn list_entries(&self) -> Result<Vec<EntryRecord>, StorageError>;

    async fn find_entry(&self, entry_id: &str) -> Result<Option<EntryRecord>, StorageError>;

    async fn upsert_entry(&self, record: EntryRecord) -> Result<EntryRecord, StorageError>;
}
