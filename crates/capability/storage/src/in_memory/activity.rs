//! 活动事件环形缓冲
//!
//! 每个条目独立缓冲，超出容量时丢弃最旧事件。

use crate::error::StorageError;
use crate::traits::ActivityStore;
use domain::ActivityEvent;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use tracing::debug;

pub const DEFAULT_ACTIVITY_CAPACITY: usize = 100;

pub struct InMemoryActivityStore {
    capacity: usize,
    buffers: RwLock<HashMap<String, VecDeque<ActivityEvent>>>,
}

impl InMemoryActivityStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ACTIVITY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前缓冲的事件数（用于测试）
    pub fn len(&self, entry_id: &str) -> usize {
        self.buffers
            .read()
            .map(|buffers| buffers.get(entry_id).map(VecDeque::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for InMemoryActivityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ActivityStore for InMemoryActivityStore {
    async fn append_event(&self, entry_id: &str, event: ActivityEvent) -> Result<(), StorageError> {
        let mut buffers = self
            .buffers
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let buffer = buffers.entry(entry_id.to_string()).or_default();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
            debug!(
                target: "lockly.storage",
                entry_id = %entry_id,
                capacity = self.capacity,
                "activity_buffer_evicted"
            );
        }
        buffer.push_back(event);
        Ok(())
    }

    async fn recent_events(
        &self,
        entry_id: &str,
        max_events: usize,
    ) -> Result<Vec<ActivityEvent>, StorageError> {
        let buffers = self
            .buffers
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(buffers
            .get(entry_id)
            .map(|buffer| buffer.iter().rev().take(max_events).cloned().collect())
            .unwrap_or_default())
    }
}
