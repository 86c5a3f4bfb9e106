//! 稳定的通道消息 DTO 与 API 响应契约。
//!
//! - 查询通道：`lockly/version`、`lockly/config`、`lockly/entries`、`lockly/recent_activity`
//! - 命令通道：`add_slot`、`update_slot`、`apply_slot`、`apply_all`、`remove_slot`、`wipe_slots`、`import_slots`
//! - 实体快照：entity_id → attributes

use chrono::{DateTime, SecondsFormat, Utc};
use domain::{ActionSource, ActivityEvent, LockAction};
use serde::{Deserialize, Serialize};

/// 契约转换错误。
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// 标准 API 响应封装。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 查询通道请求（按 `type` 字段区分）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueryRequest {
    #[serde(rename = "lockly/version")]
    Version,
    #[serde(rename = "lockly/config")]
    Config { entry_id: String },
    #[serde(rename = "lockly/entries")]
    Entries,
    #[serde(rename = "lockly/recent_activity")]
    RecentActivity {
        entry_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_events: Option<usize>,
    },
}

/// `lockly/version` 响应。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDto {
    pub version: String,
}

/// `lockly/config` 响应。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryConfigDto {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub group_entity_id: Option<String>,
    /// 可用槽位范围（含两端）。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_slot: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_slot: Option<u32>,
}

impl EntryConfigDto {
    /// 槽位范围内的槽位数；范围缺失或无效时为 `None`。
    pub fn slot_capacity(&self) -> Option<usize> {
        match (self.first_slot, self.last_slot) {
            (Some(first), Some(last)) if first <= last => Some((last - first) as usize + 1),
            _ => None,
        }
    }
}

/// `lockly/entries` 列表项。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySummaryDto {
    pub entry_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

/// 原始活动事件（`lockly/recent_activity` 列表项）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEventDto {
    pub lock: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<u32>,
    /// ISO 8601 时间戳。
    pub timestamp: String,
}

impl ActivityEventDto {
    /// 解析为领域事件（一次性完成类型化）。
    pub fn into_event(self) -> Result<ActivityEvent, ContractError> {
        let ts_ms = parse_timestamp_ms(&self.timestamp)?;
        Ok(ActivityEvent {
            lock: self.lock,
            action: LockAction::parse(&self.action),
            source: self
                .source
                .filter(|source| !source.trim().is_empty())
                .map(|source| ActionSource::parse(&source)),
            user_name: self.user_name.filter(|name| !name.is_empty()),
            slot_id: self.slot_id,
            ts_ms,
        })
    }

    pub fn from_event(event: &ActivityEvent) -> Self {
        Self {
            lock: event.lock.clone(),
            action: event.action.as_str().to_string(),
            source: event.source.as_ref().map(|source| source.as_str().to_string()),
            user_name: event.user_name.clone(),
            slot_id: event.slot_id,
            timestamp: format_timestamp_ms(event.ts_ms),
        }
    }
}

/// ISO 8601 / RFC 3339 → 毫秒时间戳。
pub fn parse_timestamp_ms(value: &str) -> Result<i64, ContractError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.timestamp_millis())
        .map_err(|_| ContractError::InvalidTimestamp(value.to_string()))
}

/// 毫秒时间戳 → RFC 3339（UTC）。
pub fn format_timestamp_ms(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 命令通道支持的命令名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    AddSlot,
    UpdateSlot,
    ApplySlot,
    ApplyAll,
    RemoveSlot,
    WipeSlots,
    ImportSlots,
}

impl CommandName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddSlot => "add_slot",
            Self::UpdateSlot => "update_slot",
            Self::ApplySlot => "apply_slot",
            Self::ApplyAll => "apply_all",
            Self::RemoveSlot => "remove_slot",
            Self::WipeSlots => "wipe_slots",
            Self::ImportSlots => "import_slots",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ContractError> {
        match value.trim() {
            "add_slot" => Ok(Self::AddSlot),
            "update_slot" => Ok(Self::UpdateSlot),
            // push_slot 为旧名称
            "apply_slot" | "push_slot" => Ok(Self::ApplySlot),
            "apply_all" => Ok(Self::ApplyAll),
            "remove_slot" => Ok(Self::RemoveSlot),
            "wipe_slots" => Ok(Self::WipeSlots),
            "import_slots" => Ok(Self::ImportSlots),
            other => Err(ContractError::UnknownCommand(other.to_string())),
        }
    }
}

/// 槽位导出 / 导入条目。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTransferDto {
    pub slot: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pin: String,
    #[serde(default)]
    pub enabled: bool,
}

/// 命令通道请求体。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotCommandPayload {
    pub entry_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_entities: Option<Vec<String>>,
    /// `import_slots` 的导入条目。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SlotTransferDto>>,
    /// `import_slots`：为真（默认）时先清空现有槽位，否则按 id 合并。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<bool>,
}

impl SlotCommandPayload {
    pub fn for_entry(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            ..Self::default()
        }
    }

    /// 日志用副本：PIN 以 `***` 遮蔽。
    pub fn masked(&self) -> Self {
        Self {
            pin: self.pin.as_ref().map(|_| "***".to_string()),
            items: self.items.as_ref().map(|items| {
                items
                    .iter()
                    .map(|item| SlotTransferDto {
                        pin: "***".to_string(),
                        ..item.clone()
                    })
                    .collect()
            }),
            ..self.clone()
        }
    }
}

/// 单个实体的观测数据。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityStateDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}
