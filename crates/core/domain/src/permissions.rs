//! 槽位编辑权限判定。
//!
//! 结果决定是否展示修改控件与 PIN 明文，每次渲染都需重新计算。

use crate::ActorContext;

/// 条目级访问策略。
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub admin_only: bool,
    /// 额外管理员：用户 ID 或显示名（片段）。
    pub admin_users: Vec<String>,
}

impl AccessPolicy {
    pub fn new(admin_only: bool, admin_users: Vec<String>) -> Self {
        Self {
            admin_only,
            admin_users,
        }
    }

    /// 当前操作者是否可以查看 PIN 并修改槽位。
    pub fn can_edit(&self, actor: &ActorContext) -> bool {
        if !self.admin_only || actor.is_admin {
            return true;
        }
        let entries: Vec<String> = self
            .admin_users
            .iter()
            .map(|entry| entry.trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();
        if entries.is_empty() {
            return false;
        }
        let hit = |candidate: &str| {
            let candidate = candidate.trim().to_lowercase();
            !candidate.is_empty() && entries.iter().any(|entry| *entry == candidate)
        };
        hit(actor.user_id.as_str())
            || hit(actor.display_name.as_str())
            || actor.display_name.split_whitespace().any(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(user_id: &str, name: &str) -> ActorContext {
        ActorContext::new(user_id, name, false)
    }

    #[test]
    fn open_policy_always_allows() {
        let policy = AccessPolicy::new(false, vec!["someone".to_string()]);
        assert!(policy.can_edit(&member("", "")));
        assert!(policy.can_edit(&member("u-9", "Guest")));
    }

    #[test]
    fn admin_only_allows_platform_admin() {
        let policy = AccessPolicy::new(true, Vec::new());
        assert!(policy.can_edit(&ActorContext::new("u-1", "Owner", true)));
        assert!(!policy.can_edit(&member("u-2", "Guest")));
    }

    #[test]
    fn admin_only_matches_user_id_case_insensitive() {
        let policy = AccessPolicy::new(true, vec!["ABC123".to_string()]);
        assert!(policy.can_edit(&member("abc123", "Somebody")));
    }

    #[test]
    fn admin_only_matches_full_name_or_token() {
        let policy = AccessPolicy::new(true, vec!["alice smith".to_string(), "Bob".to_string()]);
        assert!(policy.can_edit(&member("u-1", "Alice Smith")));
        assert!(policy.can_edit(&member("u-2", "bob jones")));
        assert!(!policy.can_edit(&member("u-3", "Carol Smith")));
    }

    #[test]
    fn blank_entries_never_match_blank_identity() {
        let policy = AccessPolicy::new(true, vec!["  ".to_string()]);
        assert!(!policy.can_edit(&member("", "")));
    }
}
