//! 进程内参考宿主。
//!
//! 命令只改存储中的槽位记录并登记待下发任务；`settle` 每调用一次推进一步
//! （`queued → updating → idle`），完成时为每把目标门锁记录 PIN 变更事件。
//! 离线门锁不应答：每次 `settle` 计一次重试，超过 `MAX_ACTION_RETRIES` 后槽位
//! 置为 `timeout` 且不再忙碌。dry-run 命令立即完成且不记录事件。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use api_contract::{
    ActivityEventDto, CommandName, EntityStateDto, EntryConfigDto, EntrySummaryDto,
    QueryRequest, SlotCommandPayload, SlotTransferDto, VersionDto,
};
use async_trait::async_trait;
use domain::{ActivityEvent, LockAction, Slot, SlotStatus};
use lockly_activity::{ActivityError, ActivityQuery};
use lockly_control::{ChannelError, CommandChannel, SlotSource, validate_pin};
use lockly_snapshot::{EntitySnapshot, slots_for_entry};
use lockly_storage::{ActivityStore, EntryRecord, EntryStore, SlotStore};
use lockly_telemetry::record_event_recorded;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{CardError, EntryQuery, now_ms};

/// 未应答时的最大重试次数。
pub const MAX_ACTION_RETRIES: u32 = 3;

/// 命令执行结果：涉及的槽位。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub slots: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobStage {
    Queued,
    Updating,
}

/// 待下发任务。
#[derive(Debug, Clone)]
struct PendingJob {
    locks: Vec<String>,
    removal: bool,
    stage: JobStage,
    /// 已重试次数。
    retries: u32,
}

type JobKey = (String, u32);

pub struct LocalHost {
    version: String,
    entries: Arc<dyn EntryStore>,
    slots: Arc<dyn SlotStore>,
    activity: Arc<dyn ActivityStore>,
    jobs: Mutex<HashMap<JobKey, PendingJob>>,
    offline_locks: Mutex<HashSet<String>>,
}

impl LocalHost {
    pub fn new(
        version: impl Into<String>,
        entries: Arc<dyn EntryStore>,
        slots: Arc<dyn SlotStore>,
        activity: Arc<dyn ActivityStore>,
    ) -> Self {
        Self {
            version: version.into(),
            entries,
            slots,
            activity,
            jobs: Mutex::new(HashMap::new()),
            offline_locks: Mutex::new(HashSet::new()),
        }
    }

    /// 标记门锁是否离线；离线门锁不应答 PIN 下发。
    pub fn set_lock_offline(&self, lock: impl Into<String>, offline: bool) -> Result<(), CardError> {
        let lock = lock.into();
        let mut locks = self.offline_locks()?;
        if offline {
            locks.insert(lock);
        } else {
            locks.remove(&lock);
        }
        Ok(())
    }

    /// 某条目的槽位来源（经实体快照构建）。
    pub fn slot_source(self: &Arc<Self>, entry_id: impl Into<String>) -> Arc<dyn SlotSource> {
        Arc::new(EntrySlots {
            host: self.clone(),
            entry_id: entry_id.into(),
        })
    }

    pub async fn entry(&self, entry_id: &str) -> Result<EntryRecord, CardError> {
        self.entries
            .find_entry(entry_id)
            .await?
            .ok_or_else(|| CardError::EntryNotFound(entry_id.to_string()))
    }

    /// 执行一条命令。
    pub async fn execute(
        &self,
        command: CommandName,
        payload: &SlotCommandPayload,
    ) -> Result<CommandOutcome, CardError> {
        let entry = self.entry(&payload.entry_id).await?;
        let dry_run = payload.dry_run.unwrap_or(false);
        let slots = match command {
            CommandName::AddSlot => vec![self.add_slot(&entry).await?],
            CommandName::UpdateSlot => vec![self.update_slot(&entry, payload).await?],
            CommandName::ApplySlot => {
                let slot_id = payload.slot.ok_or(CardError::MissingField("slot"))?;
                let slot = self.require_slot(&entry, slot_id).await?;
                let locks = targets(&entry, payload)?;
                self.schedule(&entry, vec![slot], locks, false, dry_run).await?
            }
            CommandName::ApplyAll => {
                let candidates = self.selected(&entry, payload.slots.as_deref()).await?;
                let enabled: Vec<Slot> = candidates.into_iter().filter(|slot| slot.enabled).collect();
                let locks = targets(&entry, payload)?;
                self.schedule(&entry, enabled, locks, false, dry_run).await?
            }
            CommandName::RemoveSlot => {
                let slot_id = payload.slot.ok_or(CardError::MissingField("slot"))?;
                let slot = self.require_slot(&entry, slot_id).await?;
                let locks = targets(&entry, payload).unwrap_or_default();
                self.schedule(&entry, vec![slot], locks, true, dry_run).await?
            }
            CommandName::WipeSlots => {
                let slots = self.selected(&entry, payload.slots.as_deref()).await?;
                let locks = targets(&entry, payload).unwrap_or_default();
                self.schedule(&entry, slots, locks, true, dry_run).await?
            }
            CommandName::ImportSlots => {
                let items = payload.items.as_deref().ok_or(CardError::MissingField("items"))?;
                self.import_slots(&entry, items, payload.replace.unwrap_or(true))
                    .await?
            }
        };
        info!(
            target: "lockly.card",
            entry_id = %entry.entry_id,
            command = command.as_str(),
            slots = ?slots,
            dry_run = dry_run,
            "host_command_accepted"
        );
        Ok(CommandOutcome { slots })
    }

    /// 推进所有待下发任务一步。返回推进的任务数。
    pub async fn settle(&self) -> Result<usize, CardError> {
        let offline = self.offline_locks()?.clone();
        let (advanced, retried, finished, timed_out) = {
            let mut jobs = self.jobs()?;
            let mut advanced: Vec<JobKey> = Vec::new();
            let mut retried = 0;
            let mut finished: Vec<(JobKey, PendingJob)> = Vec::new();
            let mut timed_out: Vec<(JobKey, PendingJob)> = Vec::new();
            jobs.retain(|key, job| match job.stage {
                JobStage::Queued => {
                    job.stage = JobStage::Updating;
                    advanced.push(key.clone());
                    true
                }
                JobStage::Updating if job.locks.iter().any(|lock| offline.contains(lock)) => {
                    if job.retries < MAX_ACTION_RETRIES {
                        job.retries += 1;
                        retried += 1;
                        debug!(
                            target: "lockly.card",
                            entry_id = %key.0,
                            slot = key.1,
                            attempt = job.retries + 1,
                            "host_job_retry"
                        );
                        true
                    } else {
                        timed_out.push((key.clone(), job.clone()));
                        false
                    }
                }
                JobStage::Updating => {
                    finished.push((key.clone(), job.clone()));
                    false
                }
            });
            (advanced, retried, finished, timed_out)
        };

        for (entry_id, slot_id) in &advanced {
            if let Some(mut slot) = self.slots.find_slot(entry_id, *slot_id).await? {
                slot.status = SlotStatus::Updating;
                self.slots.upsert_slot(entry_id, slot).await?;
            }
        }
        for ((entry_id, slot_id), job) in &finished {
            self.complete(entry_id, *slot_id, job).await?;
        }
        for ((entry_id, slot_id), job) in &timed_out {
            self.time_out(entry_id, *slot_id, job, &offline).await?;
        }
        Ok(advanced.len() + retried + finished.len() + timed_out.len())
    }

    /// 待下发任务数。
    pub fn pending_jobs(&self) -> usize {
        self.jobs().map(|jobs| jobs.len()).unwrap_or(0)
    }

    /// 渲染某条目的实体快照（每个槽位一个实体）。
    pub async fn entity_states(&self, entry_id: &str) -> Result<EntitySnapshot, CardError> {
        let entry = self.entry(entry_id).await?;
        let slots = self.slots.list_slots(&entry.entry_id).await?;
        Ok(slots
            .iter()
            .map(|slot| {
                (
                    format!("lockly.{}_slot_{}", entry.entry_id, slot.id),
                    slot_entity(&entry.entry_id, slot),
                )
            })
            .collect())
    }

    /// 追加一条原始活动事件。
    pub async fn record_activity(&self, entry_id: &str, event: ActivityEvent) -> Result<(), CardError> {
        let entry = self.entry(entry_id).await?;
        self.activity.append_event(&entry.entry_id, event).await?;
        record_event_recorded();
        Ok(())
    }

    /// 原始活动事件，最新在前。
    pub async fn recent_events(
        &self,
        entry_id: &str,
        max_events: usize,
    ) -> Result<Vec<ActivityEvent>, CardError> {
        let entry = self.entry(entry_id).await?;
        Ok(self.activity.recent_events(&entry.entry_id, max_events).await?)
    }

    /// 处理查询通道消息。
    pub async fn query(&self, request: QueryRequest) -> Result<Value, CardError> {
        let value = match request {
            QueryRequest::Version => json!(self.version().await?),
            QueryRequest::Config { entry_id } => json!(self.entry_config(&entry_id).await?),
            QueryRequest::Entries => json!(self.entries().await?),
            QueryRequest::RecentActivity {
                entry_id,
                max_events,
            } => {
                let events = self
                    .recent_events(&entry_id, max_events.unwrap_or(lockly_config::DEFAULT_MAX_EVENTS))
                    .await?;
                let events: Vec<ActivityEventDto> =
                    events.iter().map(ActivityEventDto::from_event).collect();
                json!(events)
            }
        };
        Ok(value)
    }

    async fn add_slot(&self, entry: &EntryRecord) -> Result<u32, CardError> {
        let existing = self.slots.list_slots(&entry.entry_id).await?;
        let slot_id = (entry.first_slot..=entry.last_slot)
            .find(|candidate| !existing.iter().any(|slot| slot.id == *candidate))
            .ok_or(CardError::NoAvailableSlots)?;
        self.slots
            .upsert_slot(&entry.entry_id, Slot::new(slot_id))
            .await?;
        Ok(slot_id)
    }

    async fn update_slot(
        &self,
        entry: &EntryRecord,
        payload: &SlotCommandPayload,
    ) -> Result<u32, CardError> {
        let slot_id = payload.slot.ok_or(CardError::MissingField("slot"))?;
        let mut slot = self.require_slot(entry, slot_id).await?;
        if let Some(name) = &payload.name {
            slot.name = name.trim().to_string();
        }
        if let Some(pin) = &payload.pin {
            slot.pin = pin.trim().to_string();
        }
        if let Some(enabled) = payload.enabled {
            slot.enabled = enabled;
        }
        if slot.enabled && validate_pin(&slot.pin).is_err() {
            slot.enabled = false;
            self.slots.upsert_slot(&entry.entry_id, slot).await?;
            debug!(
                target: "lockly.card",
                entry_id = %entry.entry_id,
                slot = slot_id,
                "host_slot_pin_rejected"
            );
            return Err(CardError::InvalidPin);
        }
        self.slots.upsert_slot(&entry.entry_id, slot).await?;
        Ok(slot_id)
    }

    /// 导入槽位：先整体校验，再替换或按 id 合并。导入的槽位不忙碌，状态为空闲。
    async fn import_slots(
        &self,
        entry: &EntryRecord,
        items: &[SlotTransferDto],
        replace: bool,
    ) -> Result<Vec<u32>, CardError> {
        for item in items {
            if !entry.contains_slot(item.slot) {
                return Err(CardError::InvalidSlot(item.slot));
            }
            if item.enabled && validate_pin(item.pin.trim()).is_err() {
                return Err(CardError::InvalidPin);
            }
        }

        if replace {
            for slot in self.slots.list_slots(&entry.entry_id).await? {
                self.slots.delete_slot(&entry.entry_id, slot.id).await?;
            }
            self.jobs()?.retain(|(entry_id, _), _| *entry_id != entry.entry_id);
        }
        let mut imported = Vec::with_capacity(items.len());
        for item in items {
            let mut slot = Slot::new(item.slot);
            slot.name = item.name.trim().to_string();
            slot.pin = item.pin.trim().to_string();
            slot.enabled = item.enabled;
            self.slots.upsert_slot(&entry.entry_id, slot).await?;
            self.jobs()?.remove(&(entry.entry_id.clone(), item.slot));
            imported.push(item.slot);
        }
        info!(
            target: "lockly.card",
            entry_id = %entry.entry_id,
            count = imported.len(),
            replace = replace,
            "host_slots_imported"
        );
        Ok(imported)
    }

    async fn require_slot(&self, entry: &EntryRecord, slot_id: u32) -> Result<Slot, CardError> {
        self.slots
            .find_slot(&entry.entry_id, slot_id)
            .await?
            .ok_or(CardError::SlotNotFound(slot_id))
    }

    /// 指定槽位（不存在的跳过）；未指定时为全部槽位。
    async fn selected(
        &self,
        entry: &EntryRecord,
        slot_ids: Option<&[u32]>,
    ) -> Result<Vec<Slot>, CardError> {
        let slots = self.slots.list_slots(&entry.entry_id).await?;
        Ok(match slot_ids {
            Some(slot_ids) => slots
                .into_iter()
                .filter(|slot| slot_ids.contains(&slot.id))
                .collect(),
            None => slots,
        })
    }

    async fn schedule(
        &self,
        entry: &EntryRecord,
        slots: Vec<Slot>,
        locks: Vec<String>,
        removal: bool,
        dry_run: bool,
    ) -> Result<Vec<u32>, CardError> {
        let slot_ids: Vec<u32> = slots.iter().map(|slot| slot.id).collect();
        if dry_run {
            for mut slot in slots {
                if removal {
                    self.slots.delete_slot(&entry.entry_id, slot.id).await?;
                } else {
                    slot.busy = false;
                    slot.status = SlotStatus::Idle;
                    self.slots.upsert_slot(&entry.entry_id, slot).await?;
                }
            }
            return Ok(slot_ids);
        }

        for mut slot in slots {
            slot.busy = true;
            slot.status = SlotStatus::Queued;
            self.slots.upsert_slot(&entry.entry_id, slot).await?;
        }
        let mut jobs = self.jobs()?;
        for slot_id in &slot_ids {
            jobs.insert(
                (entry.entry_id.clone(), *slot_id),
                PendingJob {
                    locks: locks.clone(),
                    removal,
                    stage: JobStage::Queued,
                    retries: 0,
                },
            );
        }
        Ok(slot_ids)
    }

    async fn complete(&self, entry_id: &str, slot_id: u32, job: &PendingJob) -> Result<(), CardError> {
        let Some(mut slot) = self.slots.find_slot(entry_id, slot_id).await? else {
            warn!(
                target: "lockly.card",
                entry_id = %entry_id,
                slot = slot_id,
                "host_job_slot_missing"
            );
            return Ok(());
        };
        let action = if job.removal || !slot.enabled {
            LockAction::PinCodeDeleted
        } else {
            LockAction::PinCodeAdded
        };
        if job.removal {
            self.slots.delete_slot(entry_id, slot_id).await?;
        } else {
            slot.busy = false;
            slot.status = SlotStatus::Idle;
            self.slots.upsert_slot(entry_id, slot.clone()).await?;
        }

        let ts_ms = now_ms();
        for lock in &job.locks {
            let mut event = ActivityEvent::new(lock.clone(), action, ts_ms).with_slot(slot_id);
            if !slot.name.is_empty() {
                event = event.with_user(slot.name.clone());
            }
            self.activity.append_event(entry_id, event).await?;
            record_event_recorded();
        }
        info!(
            target: "lockly.card",
            entry_id = %entry_id,
            slot = slot_id,
            action = action.as_str(),
            locks = job.locks.len(),
            "host_slot_settled"
        );
        Ok(())
    }

    /// 重试用尽：槽位保留并置为超时，不记录事件。
    async fn time_out(
        &self,
        entry_id: &str,
        slot_id: u32,
        job: &PendingJob,
        offline: &HashSet<String>,
    ) -> Result<(), CardError> {
        if let Some(mut slot) = self.slots.find_slot(entry_id, slot_id).await? {
            slot.busy = false;
            slot.status = SlotStatus::Timeout;
            self.slots.upsert_slot(entry_id, slot).await?;
        }
        let unanswered: Vec<&str> = job
            .locks
            .iter()
            .filter(|lock| offline.contains(*lock))
            .map(String::as_str)
            .collect();
        warn!(
            target: "lockly.card",
            entry_id = %entry_id,
            slot = slot_id,
            locks = ?unanswered,
            attempts = job.retries + 1,
            "host_job_timeout"
        );
        Ok(())
    }

    fn jobs(&self) -> Result<MutexGuard<'_, HashMap<JobKey, PendingJob>>, CardError> {
        self.jobs
            .lock()
            .map_err(|_| CardError::Storage(lockly_storage::StorageError::new("job lock failed")))
    }

    fn offline_locks(&self) -> Result<MutexGuard<'_, HashSet<String>>, CardError> {
        self.offline_locks
            .lock()
            .map_err(|_| CardError::Storage(lockly_storage::StorageError::new("lock set failed")))
    }
}

/// 目标门锁：命令中的覆盖列表优先，否则为条目默认门锁组。
fn targets(entry: &EntryRecord, payload: &SlotCommandPayload) -> Result<Vec<String>, CardError> {
    let locks: Vec<String> = match &payload.lock_entities {
        Some(locks) if !locks.is_empty() => locks.clone(),
        _ => entry.lock_names.clone(),
    };
    if locks.is_empty() {
        return Err(CardError::NoLocksConfigured);
    }
    Ok(locks)
}

fn slot_entity(entry_id: &str, slot: &Slot) -> EntityStateDto {
    let attributes = json!({
        "lockly_entry_id": entry_id,
        "lockly_slot": slot.id,
        "name": slot.name,
        "pin": slot.pin,
        "enabled": slot.enabled,
        "busy": slot.busy,
        "status": slot.status.as_str(),
    });
    EntityStateDto {
        state: Some(slot.state_label().to_string()),
        attributes: match attributes {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
    }
}

#[async_trait]
impl CommandChannel for LocalHost {
    async fn call(
        &self,
        command: CommandName,
        payload: &SlotCommandPayload,
    ) -> Result<(), ChannelError> {
        self.execute(command, payload)
            .await
            .map(|_| ())
            .map_err(|err| ChannelError::new(err.code()))
    }
}

#[async_trait]
impl ActivityQuery for LocalHost {
    async fn recent_activity(
        &self,
        entry_id: &str,
        max_events: usize,
    ) -> Result<Vec<ActivityEvent>, ActivityError> {
        self.recent_events(entry_id, max_events)
            .await
            .map_err(|err| ActivityError::Query(err.to_string()))
    }
}

#[async_trait]
impl EntryQuery for LocalHost {
    async fn version(&self) -> Result<VersionDto, CardError> {
        Ok(VersionDto {
            version: self.version.clone(),
        })
    }

    async fn entry_config(&self, entry_id: &str) -> Result<EntryConfigDto, CardError> {
        let entry = self.entry(entry_id).await?;
        Ok(EntryConfigDto {
            title: Some(entry.title).filter(|title| !title.is_empty()),
            group_name: entry.group_name,
            group_entity_id: entry.group_entity_id,
            first_slot: Some(entry.first_slot),
            last_slot: Some(entry.last_slot),
        })
    }

    async fn entries(&self) -> Result<Vec<EntrySummaryDto>, CardError> {
        Ok(self
            .entries
            .list_entries()
            .await?
            .into_iter()
            .map(|entry| EntrySummaryDto {
                entry_id: entry.entry_id,
                title: entry.title,
                group_entity_id: entry.group_entity_id,
                group_name: entry.group_name,
            })
            .collect())
    }
}

/// 单条目槽位来源：渲染实体快照后经快照适配器重建槽位。
pub struct EntrySlots {
    host: Arc<LocalHost>,
    entry_id: String,
}

#[async_trait]
impl SlotSource for EntrySlots {
    async fn current_slots(&self) -> Result<Vec<Slot>, ChannelError> {
        let snapshot = self
            .host
            .entity_states(&self.entry_id)
            .await
            .map_err(|err| ChannelError::new(err.code()))?;
        Ok(slots_for_entry(&snapshot, &self.entry_id))
    }
}
