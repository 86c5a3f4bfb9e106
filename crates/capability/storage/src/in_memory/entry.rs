use crate::error::StorageError;
use crate::models::EntryRecord;
use crate::traits::EntryStore;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// 条目内存存储
#[derive(Default)]
pub struct InMemoryEntryStore {
    entries: RwLock<BTreeMap<String, EntryRecord>>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带初始条目的存储
    pub fn with_entries(records: impl IntoIterator<Item = EntryRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| (record.entry_id.clone(), record))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait::async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn list_entries(&self) -> Result<Vec<EntryRecord>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(entries.values().cloned().collect())
    }

    async fn find_entry(&self, entry_id: &str) -> Result<Option<EntryRecord>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(entries.get(entry_id).cloned())
    }

    async fn upsert_entry(&self, record: EntryRecord) -> Result<EntryRecord, StorageError> {
        if record.first_slot == 0 || record.first_slot > record.last_slot {
            return Err(StorageError::new("invalid slot range"));
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        entries.insert(record.entry_id.clone(), record.clone());
        Ok(record)
    }
}
