use serde::{Deserialize, Deserializer};

use crate::ConfigError;

pub const DEFAULT_MAX_EVENTS: usize = 20;
pub const MAX_EVENTS_LIMIT: usize = 100;

/// 活动卡片视图。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityView {
    #[default]
    Recent,
    PerLock,
}

impl ActivityView {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "recent" => Some(Self::Recent),
            "per_lock" => Some(Self::PerLock),
            _ => None,
        }
    }
}

/// 卡片配置。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CardConfig {
    pub entry_id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// 目标门锁覆盖列表；为空时使用条目默认门锁组。
    #[serde(default, deserialize_with = "one_or_many")]
    pub lock_entities: Vec<String>,
    #[serde(default)]
    pub admin_only: bool,
    #[serde(default, deserialize_with = "list_or_csv")]
    pub admin_users: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub show_bulk_actions: bool,
    #[serde(default)]
    pub view: ActivityView,
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

impl CardConfig {
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            title: None,
            lock_entities: Vec::new(),
            admin_only: false,
            admin_users: Vec::new(),
            dry_run: false,
            show_bulk_actions: false,
            view: ActivityView::Recent,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }

    /// 从 JSON 配置解析并校验。
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let mut config: Self =
            serde_json::from_value(value).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.entry_id = config.entry_id.trim().to_string();
        if config.entry_id.is_empty() {
            return Err(ConfigError::Missing("entry_id".to_string()));
        }
        config.title = config
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty());
        config.lock_entities.retain(|entity| !entity.trim().is_empty());
        config.max_events = config.max_events.clamp(1, MAX_EVENTS_LIMIT);
        Ok(config)
    }
}

fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

fn list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => value.split(',').map(str::to_string).collect(),
        Some(OneOrMany::Many(values)) => values,
    };
    Ok(values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = CardConfig::from_value(json!({"entry_id": "abc"})).expect("config");
        assert_eq!(config, CardConfig::new("abc"));
    }

    #[test]
    fn single_lock_entity_string_is_accepted() {
        let config = CardConfig::from_value(json!({
            "entry_id": "abc",
            "lock_entities": "lock.front_door"
        }))
        .expect("config");
        assert_eq!(config.lock_entities, vec!["lock.front_door".to_string()]);
    }

    #[test]
    fn admin_users_accepts_comma_string() {
        let config = CardConfig::from_value(json!({
            "entry_id": "abc",
            "admin_only": true,
            "admin_users": "alice, Bob Smith ,"
        }))
        .expect("config");
        assert_eq!(config.admin_users, vec!["alice".to_string(), "Bob Smith".to_string()]);
    }

    #[test]
    fn max_events_is_clamped() {
        let high = CardConfig::from_value(json!({"entry_id": "abc", "max_events": 500}))
            .expect("config");
        assert_eq!(high.max_events, MAX_EVENTS_LIMIT);
        let low = CardConfig::from_value(json!({"entry_id": "abc", "max_events": 0}))
            .expect("config");
        assert_eq!(low.max_events, 1);
    }

    #[test]
    fn per_lock_view_parses() {
        let config = CardConfig::from_value(json!({"entry_id": "abc", "view": "per_lock"}))
            .expect("config");
        assert_eq!(config.view, ActivityView::PerLock);
        assert!(CardConfig::from_value(json!({"entry_id": "abc", "view": "grid"})).is_err());
    }

    #[test]
    fn blank_entry_id_is_missing() {
        let err = CardConfig::from_value(json!({"entry_id": "  "})).expect_err("missing");
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(CardConfig::from_value(json!({"title": "x"})).is_err());
    }
}
