//! 实体快照过滤与槽位模型构建。
//!
//! 宿主推送的实体观测是松散类型的键值；此处一次性解析为 `Slot`，
//! 之后的逻辑只面向类型化结构。

use std::collections::{BTreeMap, HashMap};

use api_contract::EntityStateDto;
use domain::{Slot, SlotStatus};
use serde_json::Value;

/// entity_id → 观测数据。
pub type EntitySnapshot = HashMap<String, EntityStateDto>;

/// 属于某条目的单个观测（按 entity_id 排序后输出）。
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub entity_id: &'a str,
    pub state: &'a EntityStateDto,
}

/// 过滤出属于 `entry_id` 的观测，按 entity_id 升序。
pub fn filter_entry<'a>(snapshot: &'a EntitySnapshot, entry_id: &str) -> Vec<Observation<'a>> {
    let mut matched: Vec<Observation<'a>> = snapshot
        .iter()
        .filter(|(_, state)| {
            text_attr(state, &["lockly_entry_id", "entry_id"]).as_deref() == Some(entry_id)
        })
        .map(|(entity_id, state)| Observation {
            entity_id: entity_id.as_str(),
            state,
        })
        .collect();
    matched.sort_by(|a, b| a.entity_id.cmp(b.entity_id));
    matched
}

/// 按槽位聚合观测，输出按 id 升序。
///
/// 同一槽位的多条观测按 entity_id 顺序合并：字符串取首个非空值，
/// 布尔取或，状态取优先级更高者。缺失字段保持默认值。
pub fn build_slots(observations: &[Observation<'_>]) -> Vec<Slot> {
    let mut slots: BTreeMap<u32, Slot> = BTreeMap::new();
    for observation in observations {
        let Some(slot_id) = slot_attr(observation.state) else {
            continue;
        };
        let slot = slots.entry(slot_id).or_insert_with(|| Slot::new(slot_id));
        merge_observation(slot, observation.state);
    }
    slots.into_values().collect()
}

/// 过滤 + 构建。
pub fn slots_for_entry(snapshot: &EntitySnapshot, entry_id: &str) -> Vec<Slot> {
    build_slots(&filter_entry(snapshot, entry_id))
}

fn merge_observation(slot: &mut Slot, state: &EntityStateDto) {
    let kind = text_attr(state, &["lockly_type", "type"]);
    let from_state = |field: &str| {
        if kind.as_deref() == Some(field) {
            state.state.clone().filter(|value| !value.is_empty())
        } else {
            None
        }
    };

    if slot.name.is_empty()
        && let Some(name) = text_attr(state, &["name"]).or_else(|| from_state("name"))
    {
        slot.name = name;
    }
    if slot.pin.is_empty()
        && let Some(pin) = text_attr(state, &["pin"]).or_else(|| from_state("pin"))
    {
        slot.pin = pin;
    }
    let enabled = bool_attr(state, "enabled")
        || (kind.as_deref() == Some("enabled")
            && state.state.as_deref().is_some_and(truthy));
    slot.enabled |= enabled;
    slot.busy |= bool_attr(state, "busy");
    if let Some(status) = text_attr(state, &["status"]) {
        slot.status = slot.status.merge(SlotStatus::parse(&status));
    }
}

fn attr<'a>(state: &'a EntityStateDto, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| state.attributes.get(*key))
        .find(|value| !value.is_null())
}

fn text_attr(state: &EntityStateDto, keys: &[&str]) -> Option<String> {
    match attr(state, keys)? {
        Value::String(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn bool_attr(state: &EntityStateDto, key: &str) -> bool {
    match attr(state, &[key]) {
        Some(Value::Bool(value)) => *value,
        Some(Value::String(value)) => truthy(value),
        Some(Value::Number(value)) => value.as_u64().is_some_and(|value| value != 0),
        _ => false,
    }
}

fn slot_attr(state: &EntityStateDto) -> Option<u32> {
    match attr(state, &["lockly_slot", "slot"])? {
        Value::Number(value) => value.as_u64().and_then(|value| u32::try_from(value).ok()),
        Value::String(value) => value.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}
