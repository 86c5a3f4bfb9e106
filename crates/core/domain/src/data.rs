/// 槽位命令状态（由宿主异步推送）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotStatus {
    #[default]
    Idle,
    Queued,
    Updating,
    Timeout,
}

impl SlotStatus {
    /// 解析宿主上报的状态字符串；空串与未知值视为 idle。
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "updating" => Self::Updating,
            "timeout" => Self::Timeout,
            _ => Self::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Updating => "updating",
            Self::Timeout => "timeout",
        }
    }

    /// 命令仍在途中（排队或写入中）。
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Updating)
    }

    /// 同一槽位多条观测合并时的优先级。
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Queued => 1,
            Self::Updating => 2,
            Self::Timeout => 3,
        }
    }

    /// 取两者中优先级更高的状态。
    pub fn merge(self, other: Self) -> Self {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }
}

/// PIN 槽位。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Slot {
    pub id: u32,
    pub name: String,
    /// 敏感字段，不得写入日志。
    pub pin: String,
    pub enabled: bool,
    pub busy: bool,
    pub status: SlotStatus,
}

impl Slot {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// 槽位展示状态：enabled / disabled / empty。
    pub fn state_label(&self) -> &'static str {
        if self.enabled {
            "enabled"
        } else if !self.name.is_empty() || !self.pin.is_empty() {
            "disabled"
        } else {
            "empty"
        }
    }
}

/// 门锁事件动作（固定词表，未知值落到 `Unknown`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockAction {
    Lock,
    Unlock,
    KeyLock,
    KeyUnlock,
    AutoLock,
    ManualLock,
    ManualUnlock,
    OneTouchLock,
    LockFailureInvalidPinOrId,
    LockFailureInvalidSchedule,
    UnlockFailureInvalidPinOrId,
    UnlockFailureInvalidSchedule,
    ScheduleLock,
    ScheduleUnlock,
    PinCodeAdded,
    PinCodeDeleted,
    NonAccessUserOperationalEvent,
    Unknown,
}

impl LockAction {
    pub const ALL: [LockAction; 18] = [
        Self::Unknown,
        Self::Lock,
        Self::Unlock,
        Self::LockFailureInvalidPinOrId,
        Self::LockFailureInvalidSchedule,
        Self::UnlockFailureInvalidPinOrId,
        Self::UnlockFailureInvalidSchedule,
        Self::OneTouchLock,
        Self::KeyLock,
        Self::KeyUnlock,
        Self::AutoLock,
        Self::ScheduleLock,
        Self::ScheduleUnlock,
        Self::ManualLock,
        Self::ManualUnlock,
        Self::NonAccessUserOperationalEvent,
        Self::PinCodeAdded,
        Self::PinCodeDeleted,
    ];

    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::KeyLock => "key_lock",
            Self::KeyUnlock => "key_unlock",
            Self::AutoLock => "auto_lock",
            Self::ManualLock => "manual_lock",
            Self::ManualUnlock => "manual_unlock",
            Self::OneTouchLock => "one_touch_lock",
            Self::LockFailureInvalidPinOrId => "lock_failure_invalid_pin_or_id",
            Self::LockFailureInvalidSchedule => "lock_failure_invalid_schedule",
            Self::UnlockFailureInvalidPinOrId => "unlock_failure_invalid_pin_or_id",
            Self::UnlockFailureInvalidSchedule => "unlock_failure_invalid_schedule",
            Self::ScheduleLock => "schedule_lock",
            Self::ScheduleUnlock => "schedule_unlock",
            Self::PinCodeAdded => "pin_code_added",
            Self::PinCodeDeleted => "pin_code_deleted",
            Self::NonAccessUserOperationalEvent => "non_access_user_operational_event",
            Self::Unknown => "unknown",
        }
    }
}

/// 事件来源。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionSource {
    Keypad,
    Rfid,
    Manual,
    Rf,
    Remote,
    Automation,
    Other(String),
}

impl ActionSource {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "keypad" => Self::Keypad,
            "rfid" => Self::Rfid,
            "manual" => Self::Manual,
            "rf" => Self::Rf,
            "remote" => Self::Remote,
            "automation" => Self::Automation,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Keypad => "keypad",
            Self::Rfid => "rfid",
            Self::Manual => "manual",
            Self::Rf => "rf",
            Self::Remote => "remote",
            Self::Automation => "automation",
            Self::Other(value) => value.as_str(),
        }
    }

    /// rf / remote / automation 都是远程命令触发。
    pub fn is_automation(&self) -> bool {
        matches!(self, Self::Rf | Self::Remote | Self::Automation)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Rfid => "RFID",
            Self::Rf | Self::Remote | Self::Automation => "automation",
            other => other.as_str(),
        }
    }
}

/// 原始门锁事件（记录后不可变）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub lock: String,
    pub action: LockAction,
    pub source: Option<ActionSource>,
    pub user_name: Option<String>,
    pub slot_id: Option<u32>,
    pub ts_ms: i64,
}

impl ActivityEvent {
    pub fn new(lock: impl Into<String>, action: LockAction, ts_ms: i64) -> Self {
        Self {
            lock: lock.into(),
            action,
            source: None,
            user_name: None,
            slot_id: None,
            ts_ms,
        }
    }

    pub fn with_source(mut self, source: ActionSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_user(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn with_slot(mut self, slot_id: u32) -> Self {
        self.slot_id = Some(slot_id);
        self
    }

    /// 事件是否带有可识别的操作者（用户名或槽位）。
    pub fn has_actor(&self) -> bool {
        self.user_name.as_deref().is_some_and(|name| !name.is_empty()) || self.slot_id.is_some()
    }

    /// 操作者展示名：用户名优先，否则 `Slot n`。
    pub fn actor_label(&self) -> Option<String> {
        match self.user_name.as_deref() {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => self.slot_id.map(|slot_id| format!("Slot {}", slot_id)),
        }
    }

    pub fn is_automation(&self) -> bool {
        self.source.as_ref().is_some_and(ActionSource::is_automation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_action_parses_full_vocabulary() {
        for action in LockAction::ALL {
            assert_eq!(LockAction::parse(action.as_str()), action);
        }
        assert_eq!(LockAction::parse("jammed"), LockAction::Unknown);
    }

    #[test]
    fn slot_status_merge_prefers_timeout() {
        assert_eq!(SlotStatus::Queued.merge(SlotStatus::Timeout), SlotStatus::Timeout);
        assert_eq!(SlotStatus::Updating.merge(SlotStatus::Idle), SlotStatus::Updating);
        assert_eq!(SlotStatus::parse(""), SlotStatus::Idle);
    }

    #[test]
    fn slot_state_label() {
        let mut slot = Slot::new(1);
        assert_eq!(slot.state_label(), "empty");
        slot.name = "Alice".to_string();
        assert_eq!(slot.state_label(), "disabled");
        slot.enabled = true;
        assert_eq!(slot.state_label(), "enabled");
    }

    #[test]
    fn actor_label_falls_back_to_slot() {
        let event = ActivityEvent::new("Garage", LockAction::Unlock, 0).with_slot(3);
        assert_eq!(event.actor_label().as_deref(), Some("Slot 3"));
        assert!(event.has_actor());
    }
}
