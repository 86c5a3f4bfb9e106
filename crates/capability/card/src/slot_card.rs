use std::sync::Arc;

use api_contract::{EntryConfigDto, SlotTransferDto};
use domain::{AccessPolicy, ActorContext, Slot};
use lockly_config::CardConfig;
use lockly_control::{
    ApplyAllOutcome, CommandChannel, Confirmer, OrchestratorConfig, RetryPolicy, SlotDraft,
    SlotOrchestrator, SlotSource, WorkflowPhase,
};
use lockly_snapshot::{EntitySnapshot, slots_for_entry};
use serde::Serialize;
use tracing::debug;

use crate::{CardError, EntryQuery};

const FALLBACK_TITLE: &str = "Lockly";

/// 槽位卡片的一行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotRow {
    pub slot: u32,
    pub name: String,
    /// 无编辑权限时不下发 PIN。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    pub enabled: bool,
    pub state: &'static str,
    pub status: &'static str,
    pub phase: &'static str,
    pub spinner: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 一次渲染的卡片模型。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotCardView {
    pub title: String,
    pub can_edit: bool,
    pub can_add: bool,
    pub show_bulk_actions: bool,
    pub dry_run: bool,
    pub slots: Vec<SlotRow>,
}

/// 导出条目，可原样交给 `import_slots`。
pub type SlotExport = SlotTransferDto;

/// 槽位卡片实例。
///
/// 槽位列表与条目配置归实例独占；权限每次渲染重新计算。
pub struct SlotCard {
    config: CardConfig,
    policy: AccessPolicy,
    orchestrator: SlotOrchestrator,
    entries: Arc<dyn EntryQuery>,
    entry_config: Option<EntryConfigDto>,
    slots: Vec<Slot>,
}

impl SlotCard {
    pub fn new(
        config: CardConfig,
        channel: Arc<dyn CommandChannel>,
        source: Arc<dyn SlotSource>,
        confirmer: Arc<dyn Confirmer>,
        entries: Arc<dyn EntryQuery>,
    ) -> Self {
        Self::with_add_poll(config, channel, source, confirmer, entries, RetryPolicy::default())
    }

    pub fn with_add_poll(
        config: CardConfig,
        channel: Arc<dyn CommandChannel>,
        source: Arc<dyn SlotSource>,
        confirmer: Arc<dyn Confirmer>,
        entries: Arc<dyn EntryQuery>,
        add_poll: RetryPolicy,
    ) -> Self {
        let policy = AccessPolicy::new(config.admin_only, config.admin_users.clone());
        let mut orchestrator_config = OrchestratorConfig::new(config.entry_id.clone());
        orchestrator_config.lock_entities = config.lock_entities.clone();
        orchestrator_config.dry_run = config.dry_run;
        orchestrator_config.add_poll = add_poll;
        let orchestrator =
            SlotOrchestrator::new(channel, source, confirmer, policy.clone(), orchestrator_config);
        Self {
            config,
            policy,
            orchestrator,
            entries,
            entry_config: None,
            slots: Vec::new(),
        }
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// 拉取条目配置；失败保留上一次结果。条目声明了槽位范围时以其作为新增上限。
    pub async fn refresh_config(&mut self) {
        match self.entries.entry_config(&self.config.entry_id).await {
            Ok(entry_config) => {
                if let Some(capacity) = entry_config.slot_capacity() {
                    self.orchestrator.set_max_slots(capacity);
                }
                self.entry_config = Some(entry_config);
            }
            Err(err) => debug!(
                target: "lockly.card",
                entry_id = %self.config.entry_id,
                error = %err,
                "entry_config_fetch_failed"
            ),
        }
    }

    /// 接收宿主推送的实体快照。
    pub fn apply_snapshot(&mut self, snapshot: &EntitySnapshot) {
        self.slots = slots_for_entry(snapshot, &self.config.entry_id);
    }

    /// 配置标题 → 条目标题 → 分组名 → 默认标题。
    pub fn title(&self) -> String {
        let entry_title = self.entry_config.as_ref().and_then(|entry| {
            non_empty(entry.title.as_deref()).or_else(|| non_empty(entry.group_name.as_deref()))
        });
        non_empty(self.config.title.as_deref())
            .or(entry_title)
            .unwrap_or(FALLBACK_TITLE)
            .to_string()
    }

    pub fn can_edit(&self, actor: &ActorContext) -> bool {
        self.policy.can_edit(actor)
    }

    pub fn render(&self, actor: &ActorContext) -> Result<SlotCardView, CardError> {
        let can_edit = self.can_edit(actor);
        let views = self.orchestrator.observe(&self.slots)?;
        let slots = views
            .into_iter()
            .map(|view| SlotRow {
                slot: view.slot.id,
                state: view.slot.state_label(),
                status: view.slot.status.as_str(),
                name: view.slot.name,
                pin: can_edit.then_some(view.slot.pin),
                enabled: view.slot.enabled,
                phase: phase_label(view.phase),
                spinner: view.spinner,
                error: view.last_error,
            })
            .collect();
        Ok(SlotCardView {
            title: self.title(),
            can_edit,
            can_add: can_edit && self.slots.len() < self.orchestrator.config().max_slots,
            show_bulk_actions: can_edit && self.config.show_bulk_actions,
            dry_run: self.config.dry_run,
            slots,
        })
    }

    /// 按 id 升序导出；`include_pins` 为假时 PIN 置空。
    pub fn export_slots(&self, include_pins: bool) -> Vec<SlotExport> {
        let mut exported: Vec<SlotExport> = self
            .slots
            .iter()
            .map(|slot| SlotExport {
                slot: slot.id,
                name: slot.name.clone(),
                pin: if include_pins {
                    slot.pin.clone()
                } else {
                    String::new()
                },
                enabled: slot.enabled,
            })
            .collect();
        exported.sort_by_key(|slot| slot.slot);
        exported
    }

    /// 按当前操作者的权限导出。
    pub fn export_for(&self, actor: &ActorContext) -> Vec<SlotExport> {
        self.export_slots(self.can_edit(actor))
    }

    pub fn open_editor(&self, actor: &ActorContext, slot_id: u32) -> Result<(), CardError> {
        Ok(self.orchestrator.open_editor(actor, slot_id)?)
    }

    pub fn close_editor(&self, slot_id: u32) -> Result<(), CardError> {
        Ok(self.orchestrator.close_editor(slot_id)?)
    }

    pub async fn add_slot(&self, actor: &ActorContext) -> Result<Option<u32>, CardError> {
        Ok(self.orchestrator.add_slot(actor, &self.slots).await?)
    }

    pub async fn save(
        &self,
        actor: &ActorContext,
        slot_id: u32,
        draft: SlotDraft,
    ) -> Result<(), CardError> {
        Ok(self.orchestrator.save(actor, slot_id, draft).await?)
    }

    pub async fn apply_slot(&self, actor: &ActorContext, slot_id: u32) -> Result<(), CardError> {
        Ok(self.orchestrator.apply_slot(actor, slot_id).await?)
    }

    pub async fn apply_all(&self, actor: &ActorContext) -> Result<ApplyAllOutcome, CardError> {
        Ok(self.orchestrator.apply_all(actor, &self.slots).await?)
    }

    pub async fn remove_slot(&self, actor: &ActorContext, slot_id: u32) -> Result<(), CardError> {
        Ok(self.orchestrator.remove_slot(actor, slot_id).await?)
    }

    pub async fn wipe_slots(&self, actor: &ActorContext) -> Result<Vec<u32>, CardError> {
        Ok(self.orchestrator.wipe_slots(actor, &self.slots).await?)
    }

    pub async fn import_slots(
        &self,
        actor: &ActorContext,
        items: Vec<SlotExport>,
        replace: bool,
    ) -> Result<Vec<u32>, CardError> {
        Ok(self.orchestrator.import_slots(actor, items, replace).await?)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn phase_label(phase: WorkflowPhase) -> &'static str {
    match phase {
        WorkflowPhase::Idle => "idle",
        WorkflowPhase::Editing => "editing",
        WorkflowPhase::Validating => "validating",
        WorkflowPhase::Saving => "saving",
        WorkflowPhase::Applying => "applying",
        WorkflowPhase::Error => "error",
        WorkflowPhase::Timeout => "timeout",
    }
}
