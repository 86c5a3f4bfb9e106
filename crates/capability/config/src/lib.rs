//! 卡片配置与宿主运行配置加载。
//!
//! - `CardConfig`：卡片对外暴露的配置面（JSON）
//! - `HostConfig`：本地宿主进程的环境变量配置

mod card;
mod host;

pub use card::{ActivityView, CardConfig, DEFAULT_MAX_EVENTS, MAX_EVENTS_LIMIT};
pub use host::HostConfig;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("config parse error: {0}")]
    Parse(String),
}
