//! 存储层数据模型

/// 条目（管理组）记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub entry_id: String,
    pub title: String,
    /// 默认门锁组。
    pub lock_names: Vec<String>,
    pub first_slot: u32,
    pub last_slot: u32,
    pub group_entity_id: Option<String>,
    pub group_name: Option<String>,
}

impl EntryRecord {
    pub fn new(entry_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            title: title.into(),
            lock_names: Vec::new(),
            first_slot: 1,
            last_slot: 20,
            group_entity_id: None,
            group_name: None,
        }
    }

    /// 槽位 id 是否在配置范围内。
    pub fn contains_slot(&self, slot_id: u32) -> bool {
        (self.first_slot..=self.last_slot).contains(&slot_id)
    }
}
