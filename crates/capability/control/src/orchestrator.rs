use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use api_contract::{CommandName, SlotCommandPayload, SlotTransferDto};
use domain::{AccessPolicy, ActorContext, Slot, SlotStatus};
use lockly_telemetry::{
    new_command_id, record_add_poll_give_up, record_command_failure, record_command_issued,
    record_permission_denial, record_validation_rejection,
};
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;
use crate::{
    ChannelError, CommandChannel, ConfirmPrompt, Confirmer, ControlError, SlotSource, validate_pin,
};

/// 单个槽位的编辑流程阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowPhase {
    #[default]
    Idle,
    Editing,
    Validating,
    Saving,
    Applying,
    /// 上一次操作失败，编辑器保持打开。
    Error,
    /// 宿主上报超时，重试前保持。
    Timeout,
}

/// 编排器配置。
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub entry_id: String,
    /// 目标门锁覆盖列表；为空时由宿主使用默认门锁组。
    pub lock_entities: Vec<String>,
    pub dry_run: bool,
    pub max_slots: usize,
    pub add_poll: RetryPolicy,
}

impl OrchestratorConfig {
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            lock_entities: Vec::new(),
            dry_run: false,
            max_slots: 20,
            add_poll: RetryPolicy::default(),
        }
    }
}

/// 保存表单内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDraft {
    pub name: String,
    pub pin: String,
    pub enabled: bool,
}

/// `apply_all` 结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyAllOutcome {
    pub applied: Vec<u32>,
    pub skipped: Vec<u32>,
}

/// 槽位展示状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub slot: Slot,
    pub phase: WorkflowPhase,
    /// 是否显示忙碌指示。
    pub spinner: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct SlotWorkflow {
    phase: WorkflowPhase,
    in_flight: bool,
    observed_busy: bool,
    last_error: Option<String>,
}

type Workflows = Mutex<HashMap<u32, SlotWorkflow>>;

/// 在途标记；释放时清除。
struct InFlight<'a> {
    workflows: &'a Workflows,
    slot_ids: Vec<u32>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut workflows) = self.workflows.lock() {
            for slot_id in &self.slot_ids {
                if let Some(workflow) = workflows.get_mut(slot_id) {
                    workflow.in_flight = false;
                }
            }
        }
    }
}

/// 槽位命令编排器。
pub struct SlotOrchestrator {
    channel: Arc<dyn CommandChannel>,
    source: Arc<dyn SlotSource>,
    confirmer: Arc<dyn Confirmer>,
    policy: AccessPolicy,
    config: OrchestratorConfig,
    workflows: Workflows,
}

impl SlotOrchestrator {
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        source: Arc<dyn SlotSource>,
        confirmer: Arc<dyn Confirmer>,
        policy: AccessPolicy,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            channel,
            source,
            confirmer,
            policy,
            config,
            workflows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// 按条目可用槽位范围收紧上限。
    pub fn set_max_slots(&mut self, max_slots: usize) {
        self.config.max_slots = max_slots;
    }

    pub fn can_edit(&self, actor: &ActorContext) -> bool {
        self.policy.can_edit(actor)
    }

    pub fn phase(&self, slot_id: u32) -> WorkflowPhase {
        self.workflows
            .lock()
            .ok()
            .and_then(|workflows| workflows.get(&slot_id).map(|workflow| workflow.phase))
            .unwrap_or_default()
    }

    pub fn last_error(&self, slot_id: u32) -> Option<String> {
        self.workflows
            .lock()
            .ok()
            .and_then(|workflows| workflows.get(&slot_id).and_then(|w| w.last_error.clone()))
    }

    /// 打开编辑器。
    pub fn open_editor(&self, actor: &ActorContext, slot_id: u32) -> Result<(), ControlError> {
        self.authorize(actor)?;
        self.set_phase(slot_id, WorkflowPhase::Editing, None)
    }

    /// 关闭编辑器（不发命令）。
    pub fn close_editor(&self, slot_id: u32) -> Result<(), ControlError> {
        self.set_phase(slot_id, WorkflowPhase::Idle, None)
    }

    /// 合并宿主推送的槽位状态，生成展示模型。
    pub fn observe(&self, slots: &[Slot]) -> Result<Vec<SlotView>, ControlError> {
        let mut workflows = self.lock()?;
        let present: HashSet<u32> = slots.iter().map(|slot| slot.id).collect();
        workflows.retain(|slot_id, workflow| present.contains(slot_id) || workflow.in_flight);

        let views = slots
            .iter()
            .map(|slot| {
                let workflow = workflows.entry(slot.id).or_default();
                workflow.observed_busy = slot.busy || slot.status.is_pending();
                if slot.status == SlotStatus::Timeout && workflow.phase != WorkflowPhase::Timeout {
                    warn!(
                        target: "lockly.control",
                        entry_id = %self.config.entry_id,
                        slot = slot.id,
                        "slot_apply_timeout"
                    );
                    workflow.phase = WorkflowPhase::Timeout;
                }
                SlotView {
                    slot: slot.clone(),
                    phase: workflow.phase,
                    spinner: workflow.in_flight || workflow.observed_busy,
                    last_error: workflow.last_error.clone(),
                }
            })
            .collect();
        Ok(views)
    }

    /// 新增槽位：下发 add 后有界轮询新槽位出现，找到则打开编辑。
    ///
    /// 轮询耗尽返回 `Ok(None)`，不视为错误。
    pub async fn add_slot(
        &self,
        actor: &ActorContext,
        current: &[Slot],
    ) -> Result<Option<u32>, ControlError> {
        self.authorize(actor)?;
        if current.len() >= self.config.max_slots {
            return Err(ControlError::SlotCapReached(self.config.max_slots));
        }
        let known: HashSet<u32> = current.iter().map(|slot| slot.id).collect();
        self.issue(CommandName::AddSlot, self.payload())
            .await
            .map_err(|err| ControlError::Transport(err.0))?;

        let policy = self.config.add_poll;
        for attempt in 0..policy.attempts {
            tokio::time::sleep(policy.delay_for(attempt)).await;
            let slots = match self.source.current_slots().await {
                Ok(slots) => slots,
                Err(err) => {
                    debug!(
                        target: "lockly.control",
                        entry_id = %self.config.entry_id,
                        attempt = attempt,
                        error = %err,
                        "add_slot_poll_failed"
                    );
                    continue;
                }
            };
            if let Some(slot_id) = slots
                .iter()
                .map(|slot| slot.id)
                .filter(|slot_id| !known.contains(slot_id))
                .min()
            {
                self.set_phase(slot_id, WorkflowPhase::Editing, None)?;
                info!(
                    target: "lockly.control",
                    entry_id = %self.config.entry_id,
                    slot = slot_id,
                    attempt = attempt,
                    "slot_added"
                );
                return Ok(Some(slot_id));
            }
        }
        record_add_poll_give_up();
        debug!(
            target: "lockly.control",
            entry_id = %self.config.entry_id,
            attempts = policy.attempts,
            "add_slot_poll_gave_up"
        );
        Ok(None)
    }

    /// 保存并下发：校验 → update_slot → apply_slot。
    ///
    /// 保存失败不会下发；下发失败不回滚已保存的值。
    pub async fn save(
        &self,
        actor: &ActorContext,
        slot_id: u32,
        draft: SlotDraft,
    ) -> Result<(), ControlError> {
        self.authorize(actor)?;
        let _guard = self.begin(&[slot_id])?;

        self.set_phase(slot_id, WorkflowPhase::Validating, None)?;
        if let Err(err) = validate_pin(&draft.pin) {
            record_validation_rejection();
            debug!(
                target: "lockly.control",
                entry_id = %self.config.entry_id,
                slot = slot_id,
                "slot_pin_rejected"
            );
            self.set_phase(slot_id, WorkflowPhase::Editing, Some(err.notice()))?;
            return Err(err);
        }

        self.set_phase(slot_id, WorkflowPhase::Saving, None)?;
        let mut update = self.payload();
        update.slot = Some(slot_id);
        update.name = Some(draft.name);
        update.pin = Some(draft.pin);
        update.enabled = Some(draft.enabled);
        if let Err(err) = self.issue(CommandName::UpdateSlot, update).await {
            let err = ControlError::Persist(err.0);
            self.set_phase(slot_id, WorkflowPhase::Error, Some(err.notice()))?;
            return Err(err);
        }

        self.set_phase(slot_id, WorkflowPhase::Applying, None)?;
        if let Err(err) = self.issue(CommandName::ApplySlot, self.targeted(Some(slot_id))).await {
            let err = ControlError::Apply(err.0);
            self.set_phase(slot_id, WorkflowPhase::Error, Some(err.notice()))?;
            return Err(err);
        }

        self.set_phase(slot_id, WorkflowPhase::Idle, None)?;
        Ok(())
    }

    /// 单个槽位重新下发（也用于超时后的重试）。
    pub async fn apply_slot(&self, actor: &ActorContext, slot_id: u32) -> Result<(), ControlError> {
        self.authorize(actor)?;
        let _guard = self.begin(&[slot_id])?;
        self.confirm(&ConfirmPrompt::ApplySlot { slot_id }).await?;

        self.set_phase(slot_id, WorkflowPhase::Applying, None)?;
        match self.issue(CommandName::ApplySlot, self.targeted(Some(slot_id))).await {
            Ok(()) => self.set_phase(slot_id, WorkflowPhase::Idle, None),
            Err(err) => {
                let err = ControlError::Transport(err.0);
                self.set_phase(slot_id, WorkflowPhase::Error, Some(err.notice()))?;
                Err(err)
            }
        }
    }

    /// 下发全部启用槽位；停用槽位跳过，不清除。
    pub async fn apply_all(
        &self,
        actor: &ActorContext,
        slots: &[Slot],
    ) -> Result<ApplyAllOutcome, ControlError> {
        self.authorize(actor)?;
        let (enabled, disabled): (Vec<&Slot>, Vec<&Slot>) =
            slots.iter().partition(|slot| slot.enabled);
        let mut outcome = ApplyAllOutcome {
            applied: enabled.iter().map(|slot| slot.id).collect(),
            skipped: disabled.iter().map(|slot| slot.id).collect(),
        };
        outcome.applied.sort_unstable();
        outcome.skipped.sort_unstable();
        if outcome.applied.is_empty() {
            return Ok(outcome);
        }

        let _guard = self.begin(&outcome.applied)?;
        self.confirm(&ConfirmPrompt::ApplyAll {
            slot_count: outcome.applied.len(),
        })
        .await?;

        for slot_id in &outcome.applied {
            self.set_phase(*slot_id, WorkflowPhase::Applying, None)?;
        }
        let mut payload = self.targeted(None);
        payload.slots = Some(outcome.applied.clone());
        let result = self.issue(CommandName::ApplyAll, payload).await;
        let (phase, notice) = match &result {
            Ok(()) => (WorkflowPhase::Idle, None),
            Err(err) => (
                WorkflowPhase::Error,
                Some(ControlError::Transport(err.0.clone()).notice()),
            ),
        };
        for slot_id in &outcome.applied {
            self.set_phase(*slot_id, phase, notice.clone())?;
        }
        result.map_err(|err| ControlError::Transport(err.0))?;
        Ok(outcome)
    }

    /// 删除槽位并从所有目标门锁清除 PIN。
    pub async fn remove_slot(&self, actor: &ActorContext, slot_id: u32) -> Result<(), ControlError> {
        self.authorize(actor)?;
        let _guard = self.begin(&[slot_id])?;
        self.confirm(&ConfirmPrompt::RemoveSlot { slot_id }).await?;

        match self.issue(CommandName::RemoveSlot, self.targeted(Some(slot_id))).await {
            Ok(()) => {
                self.lock()?.remove(&slot_id);
                Ok(())
            }
            Err(err) => {
                let err = ControlError::Transport(err.0);
                self.set_phase(slot_id, WorkflowPhase::Error, Some(err.notice()))?;
                Err(err)
            }
        }
    }

    /// 一次批量命令删除全部槽位。返回涉及的槽位 id。
    pub async fn wipe_slots(
        &self,
        actor: &ActorContext,
        slots: &[Slot],
    ) -> Result<Vec<u32>, ControlError> {
        self.authorize(actor)?;
        let mut slot_ids: Vec<u32> = slots.iter().map(|slot| slot.id).collect();
        slot_ids.sort_unstable();
        slot_ids.dedup();
        let _guard = self.begin(&slot_ids)?;
        self.confirm(&ConfirmPrompt::WipeSlots {
            slot_count: slot_ids.len(),
        })
        .await?;

        let mut payload = self.targeted(None);
        payload.slots = Some(slot_ids.clone());
        self.issue(CommandName::WipeSlots, payload)
            .await
            .map_err(|err| ControlError::Transport(err.0))?;
        let mut workflows = self.lock()?;
        for slot_id in &slot_ids {
            workflows.remove(slot_id);
        }
        Ok(slot_ids)
    }

    /// 导入槽位；`replace` 为真时宿主先清空现有槽位。返回导入的槽位 id。
    pub async fn import_slots(
        &self,
        actor: &ActorContext,
        items: Vec<SlotTransferDto>,
        replace: bool,
    ) -> Result<Vec<u32>, ControlError> {
        self.authorize(actor)?;
        let mut slot_ids: Vec<u32> = items.iter().map(|item| item.slot).collect();
        slot_ids.sort_unstable();
        slot_ids.dedup();
        let _guard = self.begin(&slot_ids)?;

        let mut payload = self.payload();
        payload.items = Some(items);
        payload.replace = Some(replace);
        self.issue(CommandName::ImportSlots, payload)
            .await
            .map_err(|err| ControlError::Transport(err.0))?;
        let mut workflows = self.lock()?;
        if replace {
            workflows.clear();
        } else {
            for slot_id in &slot_ids {
                workflows.remove(slot_id);
            }
        }
        Ok(slot_ids)
    }

    fn authorize(&self, actor: &ActorContext) -> Result<(), ControlError> {
        if self.policy.can_edit(actor) {
            return Ok(());
        }
        record_permission_denial();
        debug!(
            target: "lockly.control",
            entry_id = %self.config.entry_id,
            user_id = %actor.user_id,
            "slot_edit_forbidden"
        );
        Err(ControlError::Forbidden)
    }

    async fn confirm(&self, prompt: &ConfirmPrompt) -> Result<(), ControlError> {
        if self.confirmer.confirm(prompt).await {
            Ok(())
        } else {
            debug!(
                target: "lockly.control",
                entry_id = %self.config.entry_id,
                prompt = ?prompt,
                "command_not_confirmed"
            );
            Err(ControlError::Cancelled)
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<u32, SlotWorkflow>>, ControlError> {
        self.workflows
            .lock()
            .map_err(|_| ControlError::State("workflow lock poisoned".to_string()))
    }

    /// 标记在途；任一槽位已有在途命令或宿主仍在处理时拒绝。
    fn begin(&self, slot_ids: &[u32]) -> Result<InFlight<'_>, ControlError> {
        let mut workflows = self.lock()?;
        if let Some(slot_id) = slot_ids.iter().copied().find(|slot_id| {
            workflows
                .get(slot_id)
                .is_some_and(|workflow| workflow.in_flight || workflow.observed_busy)
        }) {
            return Err(ControlError::SlotBusy(slot_id));
        }
        for slot_id in slot_ids {
            workflows.entry(*slot_id).or_default().in_flight = true;
        }
        Ok(InFlight {
            workflows: &self.workflows,
            slot_ids: slot_ids.to_vec(),
        })
    }

    fn set_phase(
        &self,
        slot_id: u32,
        phase: WorkflowPhase,
        error: Option<String>,
    ) -> Result<(), ControlError> {
        let mut workflows = self.lock()?;
        let workflow = workflows.entry(slot_id).or_default();
        workflow.phase = phase;
        workflow.last_error = error;
        Ok(())
    }

    fn payload(&self) -> SlotCommandPayload {
        let mut payload = SlotCommandPayload::for_entry(self.config.entry_id.clone());
        if self.config.dry_run {
            payload.dry_run = Some(true);
        }
        payload
    }

    /// 带目标门锁的命令体。
    fn targeted(&self, slot_id: Option<u32>) -> SlotCommandPayload {
        let mut payload = self.payload();
        payload.slot = slot_id;
        if !self.config.lock_entities.is_empty() {
            payload.lock_entities = Some(self.config.lock_entities.clone());
        }
        payload
    }

    async fn issue(
        &self,
        command: CommandName,
        payload: SlotCommandPayload,
    ) -> Result<(), ChannelError> {
        let command_id = new_command_id();
        record_command_issued();
        info!(
            target: "lockly.control",
            entry_id = %payload.entry_id,
            command_id = %command_id,
            command = command.as_str(),
            slot = ?payload.slot,
            dry_run = self.config.dry_run,
            payload = ?payload.masked(),
            "command_issued"
        );
        match self.channel.call(command, &payload).await {
            Ok(()) => Ok(()),
            Err(err) => {
                record_command_failure();
                warn!(
                    target: "lockly.control",
                    entry_id = %payload.entry_id,
                    command_id = %command_id,
                    command = command.as_str(),
                    slot = ?payload.slot,
                    error = %err,
                    "command_failed"
                );
                Err(err)
            }
        }
    }
}
