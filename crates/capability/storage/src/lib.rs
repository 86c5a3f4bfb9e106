//! # Lockly Storage 模块
//!
//! 宿主侧状态的存储抽象层。
//!
//! 1. **接口抽象层** (`traits.rs`)：槽位、活动事件、条目的异步 Trait 接口
//! 2. **数据模型层** (`models.rs`)：条目记录
//! 3. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 4. **实现层** (`in_memory/`)：`RwLock` 保护的内存实现，活动事件使用环形缓冲
//!
//! 磁盘持久化由宿主平台负责，不在本模块范围内。

pub mod error;
pub mod in_memory;
pub mod models;
pub mod traits;

pub use error::StorageError;
pub use in_memory::*;
pub use models::*;
pub use traits::*;
