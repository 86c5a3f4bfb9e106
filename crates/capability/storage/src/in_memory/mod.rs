//! 内存存储实现模块
//!
//! - SlotStore: InMemorySlotStore
//! - ActivityStore: InMemoryActivityStore（环形缓冲）
//! - EntryStore: InMemoryEntryStore

pub mod activity;
pub mod entry;
pub mod slot;

pub use activity::*;
pub use entry::*;
pub use slot::*;
