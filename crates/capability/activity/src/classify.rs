use domain::{ActivityEvent, LockAction};
use serde::Serialize;

/// 展示分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Unlock,
    Lock,
    Fail,
    Other,
    Unknown,
}

impl ActionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unlock => "unlock",
            Self::Lock => "lock",
            Self::Fail => "fail",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Unlock => "mdi:lock-open-variant",
            Self::Lock => "mdi:lock",
            Self::Fail => "mdi:lock-alert",
            Self::Other => "mdi:lock-clock",
            Self::Unknown => "mdi:help-circle-outline",
        }
    }

    /// 锁定/解锁方向；失败与其他事件没有方向。
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::Unlock => Some(Direction::Unlock),
            Self::Lock => Some(Direction::Lock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Lock,
    Unlock,
}

/// 动作 → 分类。失败优先判定，`unlock_failure_*` 归为 fail。
pub fn classify(action: LockAction) -> ActionCategory {
    if action == LockAction::Unknown {
        return ActionCategory::Unknown;
    }
    let name = action.as_str();
    if name.contains("fail") {
        ActionCategory::Fail
    } else if name.contains("unlock") || action == LockAction::KeyUnlock {
        ActionCategory::Unlock
    } else if name.contains("lock") {
        ActionCategory::Lock
    } else {
        ActionCategory::Other
    }
}

/// 动作展示文案；未收录的动作把 `_` 换成空格。
pub fn action_label(action: LockAction) -> String {
    let label = match action {
        LockAction::Lock | LockAction::ManualLock => "locked",
        LockAction::Unlock | LockAction::ManualUnlock => "unlocked",
        LockAction::AutoLock => "auto-locked",
        LockAction::KeyLock => "locked with key",
        LockAction::KeyUnlock => "unlocked with key",
        LockAction::OneTouchLock => "one-touch locked",
        LockAction::ScheduleLock => "schedule locked",
        LockAction::ScheduleUnlock => "schedule unlocked",
        other => return other.as_str().replace('_', " "),
    };
    label.to_string()
}

/// `"<label>[ by <actor>][ via <source>]"`
pub fn describe(event: &ActivityEvent) -> String {
    let mut parts = vec![action_label(event.action)];
    if let Some(actor) = event.actor_label() {
        parts.push(format!("by {}", actor));
    }
    if let Some(source) = event.source.as_ref() {
        parts.push(format!("via {}", source.label()));
    }
    parts.join(" ")
}
