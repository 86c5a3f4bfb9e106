use std::collections::HashMap;

use domain::{ActionSource, ActivityEvent, LockAction};

use crate::classify::{Direction, classify};

/// 去重窗口（毫秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupConfig {
    pub echo_window_ms: i64,
    pub repeat_window_ms: i64,
    pub override_window_ms: i64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            echo_window_ms: 5_000,
            repeat_window_ms: 5_000,
            override_window_ms: 60_000,
        }
    }
}

/// 折叠规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupRule {
    /// 手动事件紧跟同方向的自动化事件：保留自动化事件。
    FirmwareEcho,
    /// 相同动作的自动化事件重复：保留最早一条。
    SameActionRepeat,
    /// 物理操作后紧跟同方向的自动化事件：保留物理操作。
    PhysicalOverride,
}

/// 去重视图中的一条记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// 代表事件。
    pub event: ActivityEvent,
    pub rule: Option<DedupRule>,
    /// 被折叠的原始事件（仅供审计）。
    pub suppressed: Vec<ActivityEvent>,
}

impl FeedEntry {
    fn single(event: ActivityEvent) -> Self {
        Self {
            event,
            rule: None,
            suppressed: Vec::new(),
        }
    }
}

/// 对原始事件做去重投影，输出按时间升序。
///
/// 输入按存储顺序（最早在前）；同一毫秒的事件以此顺序为准。
/// 每把锁独立处理：按 (时间, 存储位置) 排序后单次从左到右扫描，窄窗口规则先于宽窗口规则，
/// 已归组的事件不再参与后续分组。输入不被修改。
pub fn dedup(events: &[ActivityEvent], config: &DedupConfig) -> Vec<FeedEntry> {
    let mut by_lock: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, event) in events.iter().enumerate() {
        by_lock.entry(event.lock.as_str()).or_default().push(index);
    }

    let mut keyed: Vec<(i64, usize, FeedEntry)> = Vec::with_capacity(events.len());
    for mut indexes in by_lock.into_values() {
        indexes.sort_by_key(|index| (events[*index].ts_ms, *index));
        let ordered: Vec<&ActivityEvent> = indexes.iter().map(|index| &events[*index]).collect();
        let mut cursor = 0;
        while cursor < ordered.len() {
            let (entry, consumed) = group_at(&ordered, cursor, config);
            keyed.push((entry.event.ts_ms, indexes[cursor], entry));
            cursor += consumed;
        }
    }
    keyed.sort_by_key(|(ts_ms, index, _)| (*ts_ms, *index));
    keyed.into_iter().map(|(_, _, entry)| entry).collect()
}

/// 以 `start` 为锚点尝试分组，返回记录与消耗的事件数。
fn group_at(ordered: &[&ActivityEvent], start: usize, config: &DedupConfig) -> (FeedEntry, usize) {
    let anchor = ordered[start];
    let candidates = [
        (DedupRule::FirmwareEcho, config.echo_window_ms),
        (DedupRule::SameActionRepeat, config.repeat_window_ms),
        (DedupRule::PhysicalOverride, config.override_window_ms),
    ];
    for (rule, window_ms) in candidates {
        let members = collect_members(ordered, start, rule, window_ms);
        if members.is_empty() {
            continue;
        }
        let consumed = 1 + members.len();
        let mut raw: Vec<ActivityEvent> = Vec::with_capacity(consumed);
        raw.push(anchor.clone());
        raw.extend(members.iter().map(|event| (*event).clone()));

        let representative = match rule {
            DedupRule::FirmwareEcho => {
                let mut echo = members[0].clone();
                echo.source = Some(ActionSource::Automation);
                raw.remove(1);
                echo
            }
            DedupRule::SameActionRepeat | DedupRule::PhysicalOverride => raw.remove(0),
        };
        return (
            FeedEntry {
                event: representative,
                rule: Some(rule),
                suppressed: raw,
            },
            consumed,
        );
    }
    (FeedEntry::single(anchor.clone()), 1)
}

/// 锚点之后连续满足规则的事件；遇到不匹配的事件或超出窗口即停止。
fn collect_members<'a>(
    ordered: &[&'a ActivityEvent],
    start: usize,
    rule: DedupRule,
    window_ms: i64,
) -> Vec<&'a ActivityEvent> {
    let anchor = ordered[start];
    let accepts: Box<dyn Fn(&ActivityEvent) -> bool> = match rule {
        DedupRule::FirmwareEcho => {
            let Some(direction) = manual_direction(anchor) else {
                return Vec::new();
            };
            Box::new(move |event: &ActivityEvent| {
                event.is_automation() && direction_of(event) == Some(direction)
            })
        }
        DedupRule::SameActionRepeat => {
            if !anchor.is_automation() {
                return Vec::new();
            }
            let action = anchor.action;
            Box::new(move |event: &ActivityEvent| event.is_automation() && event.action == action)
        }
        DedupRule::PhysicalOverride => {
            let Some(direction) = physical_direction(anchor) else {
                return Vec::new();
            };
            Box::new(move |event: &ActivityEvent| {
                event.is_automation() && direction_of(event) == Some(direction)
            })
        }
    };

    ordered[start + 1..]
        .iter()
        .take_while(|event| event.ts_ms - anchor.ts_ms <= window_ms && accepts(**event))
        .copied()
        .collect()
}

fn direction_of(event: &ActivityEvent) -> Option<Direction> {
    classify(event.action).direction()
}

/// 手动上报（固件回显前半段）的方向。
fn manual_direction(event: &ActivityEvent) -> Option<Direction> {
    match event.action {
        LockAction::ManualLock => Some(Direction::Lock),
        LockAction::ManualUnlock => Some(Direction::Unlock),
        LockAction::Lock | LockAction::Unlock
            if event.source == Some(ActionSource::Manual) =>
        {
            direction_of(event)
        }
        _ => None,
    }
}

/// 人在现场的物理操作的方向。
fn physical_direction(event: &ActivityEvent) -> Option<Direction> {
    if event.is_automation() {
        return None;
    }
    match event.action {
        LockAction::OneTouchLock | LockAction::KeyLock | LockAction::ManualLock => {
            Some(Direction::Lock)
        }
        LockAction::KeyUnlock | LockAction::ManualUnlock => Some(Direction::Unlock),
        LockAction::Lock | LockAction::Unlock
            if event.source == Some(ActionSource::Manual) =>
        {
            direction_of(event)
        }
        _ => None,
    }
}
