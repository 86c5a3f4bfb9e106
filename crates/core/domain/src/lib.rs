pub mod data;
pub mod permissions;

pub use data::{ActionSource, ActivityEvent, LockAction, Slot, SlotStatus};
pub use permissions::AccessPolicy;

/// 当前操作者上下文：所有卡片实例共享的身份信息。
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user_id: String,
    pub display_name: String,
    pub is_admin: bool,
}

impl ActorContext {
    /// 构造显式身份的操作者上下文。
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            is_admin,
        }
    }
}

impl Default for ActorContext {
    /// 匿名上下文（仅用于测试或占位）。
    fn default() -> Self {
        Self {
            user_id: "".to_string(),
            display_name: "".to_string(),
            is_admin: false,
        }
    }
}
