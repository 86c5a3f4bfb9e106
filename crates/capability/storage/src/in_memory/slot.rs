use crate::error::StorageError;
use crate::traits::SlotStore;
use domain::Slot;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// 槽位内存存储（entry_id → slot_id → Slot）
#[derive(Default)]
pub struct InMemorySlotStore {
    slots: RwLock<HashMap<String, BTreeMap<u32, Slot>>>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SlotStore for InMemorySlotStore {
    async fn list_slots(&self, entry_id: &str) -> Result<Vec<Slot>, StorageError> {
        let slots = self
            .slots
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(slots
            .get(entry_id)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_slot(&self, entry_id: &str, slot_id: u32) -> Result<Option<Slot>, StorageError> {
        let slots = self
            .slots
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(slots
            .get(entry_id)
            .and_then(|entry| entry.get(&slot_id))
            .cloned())
    }

    async fn upsert_slot(&self, entry_id: &str, slot: Slot) -> Result<Slot, StorageError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        slots
            .entry(entry_id.to_string())
            .or_default()
            .insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn delete_slot(&self, entry_id: &str, slot_id: u32) -> Result<bool, StorageError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(slots
            .get_mut(entry_id)
            .and_then(|entry| entry.remove(&slot_id))
            .is_some())
    }
}
