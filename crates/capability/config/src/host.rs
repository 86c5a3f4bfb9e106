use std::env;

use crate::ConfigError;

/// 本地宿主运行配置。
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub http_addr: String,
    pub entry_id: String,
    pub entry_title: String,
    /// 条目默认门锁组。
    pub lock_names: Vec<String>,
    pub first_slot: u32,
    pub last_slot: u32,
    pub activity_capacity: usize,
    pub settle_interval_ms: u64,
}

impl HostConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置。
    pub fn from_source<F>(source: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_addr =
            read_optional(&source, "LOCKLY_HTTP_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let entry_id = read_optional(&source, "LOCKLY_ENTRY_ID")
            .ok_or_else(|| ConfigError::Missing("LOCKLY_ENTRY_ID".to_string()))?;
        let entry_title =
            read_optional(&source, "LOCKLY_ENTRY_TITLE").unwrap_or_else(|| "Lockly".to_string());
        let lock_names = read_optional(&source, "LOCKLY_LOCK_NAMES")
            .map(|value| {
                value
                    .split(',')
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let first_slot = read_u64_with_default(&source, "LOCKLY_FIRST_SLOT", 1)?;
        let last_slot = read_u64_with_default(&source, "LOCKLY_LAST_SLOT", 20)?;
        if first_slot == 0 || first_slot > u64::from(u32::MAX) {
            return Err(ConfigError::Invalid(
                "LOCKLY_FIRST_SLOT".to_string(),
                first_slot.to_string(),
            ));
        }
        if last_slot < first_slot || last_slot > u64::from(u32::MAX) {
            return Err(ConfigError::Invalid(
                "LOCKLY_LAST_SLOT".to_string(),
                last_slot.to_string(),
            ));
        }
        let activity_capacity = read_u64_with_default(&source, "LOCKLY_ACTIVITY_CAPACITY", 100)?;
        if activity_capacity == 0 {
            return Err(ConfigError::Invalid(
                "LOCKLY_ACTIVITY_CAPACITY".to_string(),
                "0".to_string(),
            ));
        }
        let settle_interval_ms =
            read_u64_with_default(&source, "LOCKLY_SETTLE_INTERVAL_MS", 2000)?;

        Ok(Self {
            http_addr,
            entry_id,
            entry_title,
            lock_names,
            first_slot: first_slot as u32,
            last_slot: last_slot as u32,
            activity_capacity: activity_capacity as usize,
            settle_interval_ms,
        })
    }
}

fn read_u64_with_default<F>(source: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match read_optional(source, key) {
        Some(value) => value,
        None => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional<F>(source: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match source(key) {
        Some(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}
