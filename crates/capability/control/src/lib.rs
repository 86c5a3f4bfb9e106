//! 槽位命令编排：编辑 → 校验 → 保存 → 下发 → 观测确认。
//!
//! 命令只下发不等待门锁回执；`queued → updating → idle/timeout`
//! 由快照异步推回，只影响展示状态，不参与编排控制流。

mod orchestrator;
mod retry;

use api_contract::{CommandName, SlotCommandPayload};
use async_trait::async_trait;
use domain::Slot;

pub use orchestrator::{
    ApplyAllOutcome, OrchestratorConfig, SlotDraft, SlotOrchestrator, SlotView, WorkflowPhase,
};
pub use retry::{Backoff, RetryPolicy};

/// 命令通道返回的不透明错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ChannelError(pub String);

impl ChannelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// 编排错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("validation error on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("forbidden")]
    Forbidden,
    #[error("slot {0} already has a command in flight")]
    SlotBusy(u32),
    #[error("slot cap reached: {0}")]
    SlotCapReached(usize),
    #[error("slot not found: {0}")]
    SlotNotFound(u32),
    #[error("cancelled")]
    Cancelled,
    #[error("persist failed: {0}")]
    Persist(String),
    #[error("apply failed: {0}")]
    Apply(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("state error: {0}")]
    State(String),
}

impl ControlError {
    /// 面向用户的非致命提示。
    pub fn notice(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Forbidden => "Only admins can change slots.".to_string(),
            Self::SlotBusy(slot_id) => format!("Slot {} is still updating.", slot_id),
            Self::SlotCapReached(max) => format!("All {} slots are in use.", max),
            Self::SlotNotFound(slot_id) => format!("Slot {} no longer exists.", slot_id),
            Self::Cancelled => "Cancelled.".to_string(),
            Self::Persist(message) => format!("Could not save slot: {}", message),
            Self::Apply(message) => format!("Saved, but pushing to locks failed: {}", message),
            Self::Transport(message) => format!("Command failed: {}", message),
            Self::State(_) => "Something went wrong, please retry.".to_string(),
        }
    }
}

/// 外部命令通道。
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn call(
        &self,
        command: CommandName,
        payload: &SlotCommandPayload,
    ) -> Result<(), ChannelError>;
}

/// 空命令通道（用于占位）。
#[derive(Debug, Default)]
pub struct NoopChannel;

#[async_trait]
impl CommandChannel for NoopChannel {
    async fn call(
        &self,
        _command: CommandName,
        _payload: &SlotCommandPayload,
    ) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// 最新槽位列表来源（新增槽位后轮询用）。
#[async_trait]
pub trait SlotSource: Send + Sync {
    async fn current_slots(&self) -> Result<Vec<Slot>, ChannelError>;
}

/// 批量或破坏性操作前的确认提示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPrompt {
    ApplySlot { slot_id: u32 },
    ApplyAll { slot_count: usize },
    RemoveSlot { slot_id: u32 },
    WipeSlots { slot_count: usize },
}

impl ConfirmPrompt {
    pub fn message(&self) -> String {
        match self {
            Self::ApplySlot { slot_id } => format!("Push slot {} to all locks?", slot_id),
            Self::ApplyAll { slot_count } => {
                format!("Push {} enabled slots to all locks?", slot_count)
            }
            Self::RemoveSlot { slot_id } => {
                format!("Remove slot {} and clear its PIN from all locks?", slot_id)
            }
            Self::WipeSlots { slot_count } => {
                format!("Remove all {} slots and clear their PINs from all locks?", slot_count)
            }
        }
    }
}

/// 用户确认交互。
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

/// 固定应答的确认器（无交互的调用方使用）。
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmer(pub bool);

#[async_trait]
impl Confirmer for FixedConfirmer {
    async fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        self.0
    }
}

/// PIN 必须是 4~8 位十进制数字。
pub fn validate_pin(pin: &str) -> Result<(), ControlError> {
    let valid = (4..=8).contains(&pin.len()) && pin.bytes().all(|byte| byte.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ControlError::Validation {
            field: "pin",
            message: "PIN must be 4-8 digits (numbers only).".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_validation_bounds() {
        for pin in ["1234", "00000000", "987654"] {
            assert!(validate_pin(pin).is_ok(), "{pin}");
        }
        for pin in ["", "123", "123456789", "12a4", " 1234", "１２３４", "-1234"] {
            assert!(validate_pin(pin).is_err(), "{pin}");
        }
    }

    #[test]
    fn validation_notice_is_field_message() {
        let err = validate_pin("12").expect_err("invalid");
        assert!(matches!(err, ControlError::Validation { field: "pin", .. }));
        assert_eq!(err.notice(), "PIN must be 4-8 digits (numbers only).");
    }

    #[test]
    fn apply_notice_mentions_saved_values() {
        let notice = ControlError::Apply("offline".to_string()).notice();
        assert!(notice.starts_with("Saved"));
        assert!(notice.ends_with("offline"));
    }
}
