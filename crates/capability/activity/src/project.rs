use std::collections::HashSet;

use domain::ActivityEvent;
use serde::Serialize;

use crate::classify::{ActionCategory, classify, describe};
use crate::dedup::{DedupConfig, DedupRule, FeedEntry, dedup};

/// 活动卡片的一行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub lock: String,
    pub action: String,
    pub category: ActionCategory,
    pub icon: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub ts_ms: i64,
    pub time_ago: String,
    /// 无操作者的锁定/解锁事件，回溯到的最近一次解锁者。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_unlocked_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed_by: Option<&'static str>,
    pub suppressed: usize,
}

/// 最新在前，截取 `max_events` 条。
pub fn recent(entries: &[FeedEntry], max_events: usize) -> Vec<&FeedEntry> {
    let mut ordered: Vec<&FeedEntry> = entries.iter().collect();
    // 稳定排序；同一时刻保持后写入者在前。
    ordered.reverse();
    ordered.sort_by(|a, b| b.event.ts_ms.cmp(&a.event.ts_ms));
    ordered.truncate(max_events);
    ordered
}

/// 每把锁一条：该锁最新的去重后记录，最新在前。
pub fn per_lock(entries: &[FeedEntry]) -> Vec<&FeedEntry> {
    let mut seen: HashSet<&str> = HashSet::new();
    recent(entries, entries.len())
        .into_iter()
        .filter(|entry| seen.insert(entry.event.lock.as_str()))
        .collect()
}

/// 在原始历史中为无操作者的锁定/解锁事件回溯最近一次带操作者的成功解锁。
///
/// 必须扫描原始历史：被去重折叠的事件可能正是真实操作者。
/// `raw` 按存储顺序（最早在前）。
pub fn last_unlock<'a>(raw: &'a [ActivityEvent], event: &ActivityEvent) -> Option<&'a ActivityEvent> {
    let category = classify(event.action);
    if event.has_actor() || !matches!(category, ActionCategory::Lock | ActionCategory::Unlock) {
        return None;
    }
    raw.iter()
        .filter(|candidate| {
            candidate.lock == event.lock
                && candidate.ts_ms < event.ts_ms
                && classify(candidate.action) == ActionCategory::Unlock
                && candidate.has_actor()
        })
        // 同一时刻取存储顺序中靠后的一条
        .max_by_key(|candidate| candidate.ts_ms)
}

/// 相对时间：渲染时按当前时钟计算，不缓存。
pub fn relative_time(now_ms: i64, ts_ms: i64) -> String {
    let seconds = (now_ms - ts_ms).max(0) / 1_000;
    if seconds < 5 {
        "just now".to_string()
    } else if seconds < 60 {
        format!("{}s ago", seconds)
    } else if seconds < 3_600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3_600)
    } else {
        format!("{}d ago", seconds / 86_400)
    }
}

/// 原始历史 → 卡片行（去重 + 视图 + 回溯 + 相对时间）。
///
/// `raw` 按存储顺序（最早在前）；查询通道返回的最新在前历史需先反转。
pub fn project(
    raw: &[ActivityEvent],
    config: &DedupConfig,
    per_lock_view: bool,
    max_events: usize,
    now_ms: i64,
) -> Vec<FeedItem> {
    let entries = dedup(raw, config);
    let selected = if per_lock_view {
        let mut selected = per_lock(&entries);
        selected.truncate(max_events);
        selected
    } else {
        recent(&entries, max_events)
    };
    selected
        .into_iter()
        .map(|entry| feed_item(raw, entry, now_ms))
        .collect()
}

fn feed_item(raw: &[ActivityEvent], entry: &FeedEntry, now_ms: i64) -> FeedItem {
    let event = &entry.event;
    let category = classify(event.action);
    FeedItem {
        lock: event.lock.clone(),
        action: event.action.as_str().to_string(),
        category,
        icon: category.icon().to_string(),
        description: describe(event),
        source: event.source.as_ref().map(|source| source.as_str().to_string()),
        ts_ms: event.ts_ms,
        time_ago: relative_time(now_ms, event.ts_ms),
        last_unlocked_by: last_unlock(raw, event).and_then(ActivityEvent::actor_label),
        collapsed_by: entry.rule.map(rule_name),
        suppressed: entry.suppressed.len(),
    }
}

fn rule_name(rule: DedupRule) -> &'static str {
    match rule {
        DedupRule::FirmwareEcho => "firmware_echo",
        DedupRule::SameActionRepeat => "same_action_repeat",
        DedupRule::PhysicalOverride => "physical_override",
    }
}
