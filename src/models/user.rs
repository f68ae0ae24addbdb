//! User model and the in-memory mutations applied to its embedded collections.
//!
//! A user document exclusively owns its `plans`, `history`, `records`, and
//! `searchHistory` arrays; the store layer loads the document, applies one of
//! the mutation helpers below, and writes the document back inside a
//! transaction. Keeping the mutations here, pure, makes the policy decisions
//! (upsert vs append, dedup, visibility filtering) unit-testable without a
//! store connection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::plan::{ExtraFields, Plan, PublicType};

/// Search history keeps only the most recent entries per user.
pub const MAX_SEARCH_HISTORY: usize = 50;

/// User document stored in the users collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Globally unique display name
    pub username: String,
    /// Globally unique email address
    pub email: String,
    /// bcrypt password hash
    pub password: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub default_history_public_type: PublicType,
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub history: Vec<HistoryItem>,
    #[serde(default)]
    pub records: Vec<RecordItem>,
    #[serde(default)]
    pub search_history: Vec<SearchHistoryItem>,
    /// Currently valid refresh token, if the user has logged in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
}

/// A workout session log entry. Shape is client-defined beyond id/visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub public_type: PublicType,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A personal record entry. Records keep a boolean visibility flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordItem {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub public: bool,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// One remembered user-search, keyed by the searched-for user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryItem {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// The user this entry points at; unique within one owner's history.
    pub user_id: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Visibility change for one embedded item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityUpdate {
    pub id: String,
    pub public_type: PublicType,
}

/// Sanitized user shape for listings (no password hash, no tokens).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub bio: String,
    pub created_at: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            bio: user.bio.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

/// Search result shape: name + target user id, plus a fresh row id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchResult {
    pub name: String,
    pub user_id: String,
    pub id: String,
}

impl User {
    /// Build a fresh user document for registration.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password: password_hash,
            bio: String::new(),
            default_history_public_type: PublicType::Private,
            plans: Vec::new(),
            history: Vec::new(),
            records: Vec::new(),
            search_history: Vec::new(),
            refresh_token: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    // ─── Plans ───────────────────────────────────────────────────

    /// Add a plan to the user, upsert-style: an id matching an embedded plan
    /// replaces that entry in place; a plan without an id is appended under a
    /// fresh server id; an unknown id is appended as-is.
    pub fn upsert_plan(&mut self, mut plan: Plan) -> Plan {
        if !plan.id.is_empty() {
            if let Some(existing) = self.plans.iter_mut().find(|p| p.id == plan.id) {
                *existing = plan.clone();
                return plan;
            }
        } else {
            plan.id = Uuid::new_v4().to_string();
        }
        self.plans.push(plan.clone());
        plan
    }

    /// Replace the embedded plan with the same id. `None` if absent.
    pub fn replace_plan(&mut self, updated: Plan) -> Option<Plan> {
        let slot = self.plans.iter_mut().find(|p| p.id == updated.id)?;
        *slot = updated.clone();
        Some(updated)
    }

    /// Remove the embedded plan with the given id. `None` if absent.
    pub fn remove_plan(&mut self, plan_id: &str) -> Option<Plan> {
        let index = self.plans.iter().position(|p| p.id == plan_id)?;
        Some(self.plans.remove(index))
    }

    // ─── History & records ───────────────────────────────────────

    /// Prepend a history item under a fresh server id (most-recent-first).
    pub fn push_history_item(&mut self, mut item: HistoryItem) -> HistoryItem {
        item.id = Uuid::new_v4().to_string();
        self.history.insert(0, item.clone());
        item
    }

    /// Apply visibility updates to embedded plans; ids not present in
    /// `updates` are untouched. Returns the resulting public subset.
    pub fn set_plans_public_status(&mut self, updates: &[VisibilityUpdate]) -> Vec<Plan> {
        for plan in &mut self.plans {
            if let Some(update) = updates.iter().find(|u| u.id == plan.id) {
                plan.public_type = update.public_type;
            }
        }
        self.public_plans()
    }

    /// Same as [`Self::set_plans_public_status`], for history items.
    pub fn set_history_public_status(
        &mut self,
        updates: &[VisibilityUpdate],
    ) -> Vec<HistoryItem> {
        for item in &mut self.history {
            if let Some(update) = updates.iter().find(|u| u.id == item.id) {
                item.public_type = update.public_type;
            }
        }
        self.public_history_items()
    }

    pub fn public_plans(&self) -> Vec<Plan> {
        self.plans
            .iter()
            .filter(|p| p.public_type == PublicType::Public)
            .cloned()
            .collect()
    }

    pub fn public_history_items(&self) -> Vec<HistoryItem> {
        self.history
            .iter()
            .filter(|h| h.public_type == PublicType::Public)
            .cloned()
            .collect()
    }

    pub fn public_records(&self) -> Vec<RecordItem> {
        self.records.iter().filter(|r| r.public).cloned().collect()
    }

    // ─── Search history ──────────────────────────────────────────

    /// Record a searched-for user, de-duplicated by target: any existing entry
    /// for the same target is dropped, the new entry is prepended under a
    /// fresh id, and the list is truncated to [`MAX_SEARCH_HISTORY`].
    pub fn upsert_search_entry(&mut self, mut item: SearchHistoryItem) -> SearchHistoryItem {
        self.search_history.retain(|e| e.user_id != item.user_id);
        item.id = Uuid::new_v4().to_string();
        self.search_history.insert(0, item.clone());
        self.search_history.truncate(MAX_SEARCH_HISTORY);
        item
    }

    /// Drop one search history entry by id. Missing ids are a no-op.
    pub fn remove_search_entry(&mut self, item_id: &str) {
        self.search_history.retain(|e| e.id != item_id);
    }

    pub fn clear_search_history(&mut self) {
        self.search_history.clear();
    }
}

/// Case-insensitive substring search over usernames, excluding the requester,
/// capped at `max_results`. Output carries no sensitive fields.
pub fn search_by_username(
    users: &[User],
    query: &str,
    max_results: usize,
    exclude_user_id: &str,
) -> Vec<UserSearchResult> {
    let needle = query.to_lowercase();
    users
        .iter()
        .filter(|u| u.id != exclude_user_id)
        .filter(|u| u.username.to_lowercase().contains(&needle))
        .take(max_results)
        .map(|u| UserSearchResult {
            name: u.username.clone(),
            user_id: u.id.clone(),
            id: Uuid::new_v4().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_user() -> User {
        User::new(
            "lifter".to_string(),
            "lifter@example.com".to_string(),
            "$2b$04$hash".to_string(),
        )
    }

    fn plan_named(id: &str, name: &str) -> Plan {
        let mut value = json!({
            "name": name,
            "publicType": "private",
            "allowedUsers": [],
            "days": []
        });
        if !id.is_empty() {
            value["id"] = json!(id);
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_upsert_plan_without_id_appends_twice() {
        let mut user = test_user();

        let first = user.upsert_plan(plan_named("", "Push"));
        let second = user.upsert_plan(plan_named("", "Push"));

        assert_eq!(user.plans.len(), 2);
        assert!(!first.id.is_empty());
        assert!(!second.id.is_empty());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_upsert_plan_with_existing_id_replaces_in_place() {
        let mut user = test_user();
        let created = user.upsert_plan(plan_named("", "Push"));

        let mut renamed = plan_named(&created.id, "Pull");
        renamed.id = created.id.clone();
        user.upsert_plan(renamed);

        let matching: Vec<_> = user.plans.iter().filter(|p| p.id == created.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].name, "Pull");
    }

    #[test]
    fn test_upsert_plan_with_unknown_id_appends_preserving_id() {
        let mut user = test_user();
        user.upsert_plan(plan_named("imported-1", "Imported"));

        assert_eq!(user.plans.len(), 1);
        assert_eq!(user.plans[0].id, "imported-1");
    }

    #[test]
    fn test_replace_plan_missing_id_is_none() {
        let mut user = test_user();
        user.upsert_plan(plan_named("", "Push"));

        assert!(user.replace_plan(plan_named("nope", "X")).is_none());
        assert_eq!(user.plans[0].name, "Push");
    }

    #[test]
    fn test_remove_plan_missing_id_leaves_list_unchanged() {
        let mut user = test_user();
        user.upsert_plan(plan_named("", "Push"));

        assert!(user.remove_plan("nope").is_none());
        assert_eq!(user.plans.len(), 1);
    }

    #[test]
    fn test_remove_plan_by_id() {
        let mut user = test_user();
        let created = user.upsert_plan(plan_named("", "Push"));

        let removed = user.remove_plan(&created.id).unwrap();
        assert_eq!(removed.id, created.id);
        assert!(user.plans.is_empty());
    }

    #[test]
    fn test_history_items_prepend_with_fresh_ids() {
        let mut user = test_user();
        let older: HistoryItem =
            serde_json::from_value(json!({"workout": "Monday session"})).unwrap();
        let newer: HistoryItem =
            serde_json::from_value(json!({"workout": "Tuesday session"})).unwrap();

        let older = user.push_history_item(older);
        let newer = user.push_history_item(newer);

        assert_ne!(older.id, newer.id);
        assert_eq!(user.history[0].id, newer.id);
        assert_eq!(user.history[1].id, older.id);
    }

    #[test]
    fn test_set_plans_public_status_returns_public_subset() {
        let mut user = test_user();
        user.upsert_plan(plan_named("p1", "A"));
        user.upsert_plan(plan_named("p2", "B"));

        let result = user.set_plans_public_status(&[VisibilityUpdate {
            id: "p1".to_string(),
            public_type: PublicType::Public,
        }]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "p1");
        // p2 untouched
        let p2 = user.plans.iter().find(|p| p.id == "p2").unwrap();
        assert_eq!(p2.public_type, PublicType::Private);
    }

    #[test]
    fn test_set_history_public_status_skips_unknown_ids() {
        let mut user = test_user();
        let item = user.push_history_item(
            serde_json::from_value(json!({"workout": "Leg day"})).unwrap(),
        );

        let result = user.set_history_public_status(&[
            VisibilityUpdate {
                id: item.id.clone(),
                public_type: PublicType::Public,
            },
            VisibilityUpdate {
                id: "ghost".to_string(),
                public_type: PublicType::Public,
            },
        ]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, item.id);
    }

    #[test]
    fn test_public_records_filters_by_flag() {
        let mut user = test_user();
        user.records = vec![
            serde_json::from_value(json!({"id": "r1", "public": true, "lift": "squat"})).unwrap(),
            serde_json::from_value(json!({"id": "r2", "public": false, "lift": "bench"})).unwrap(),
        ];

        let public = user.public_records();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, "r1");
    }

    #[test]
    fn test_search_history_dedup_keeps_latest() {
        let mut user = test_user();
        let first: SearchHistoryItem =
            serde_json::from_value(json!({"userId": "u2", "name": "ada"})).unwrap();
        let second: SearchHistoryItem =
            serde_json::from_value(json!({"userId": "u2", "name": "ada lovelace"})).unwrap();
        let other: SearchHistoryItem =
            serde_json::from_value(json!({"userId": "u3", "name": "grace"})).unwrap();

        user.upsert_search_entry(first);
        user.upsert_search_entry(other);
        let latest = user.upsert_search_entry(second);

        let for_target: Vec<_> = user
            .search_history
            .iter()
            .filter(|e| e.user_id == "u2")
            .collect();
        assert_eq!(for_target.len(), 1);
        assert_eq!(for_target[0].id, latest.id);
        // most recent first
        assert_eq!(user.search_history[0].user_id, "u2");
    }

    #[test]
    fn test_search_history_is_capped() {
        let mut user = test_user();
        for i in 0..(MAX_SEARCH_HISTORY + 10) {
            let item: SearchHistoryItem =
                serde_json::from_value(json!({"userId": format!("u{i}")})).unwrap();
            user.upsert_search_entry(item);
        }

        assert_eq!(user.search_history.len(), MAX_SEARCH_HISTORY);
        // newest entry survived the truncation
        assert_eq!(
            user.search_history[0].user_id,
            format!("u{}", MAX_SEARCH_HISTORY + 9)
        );
    }

    #[test]
    fn test_remove_search_entry_ignores_missing_id() {
        let mut user = test_user();
        let entry = user.upsert_search_entry(
            serde_json::from_value(json!({"userId": "u2"})).unwrap(),
        );

        user.remove_search_entry("ghost");
        assert_eq!(user.search_history.len(), 1);

        user.remove_search_entry(&entry.id);
        assert!(user.search_history.is_empty());
    }

    #[test]
    fn test_search_by_username_excludes_and_caps() {
        let mut users = Vec::new();
        for (id, name) in [
            ("u1", "Annika"),
            ("u2", "anna"),
            ("u3", "Joanna"),
            ("u4", "bob"),
        ] {
            let mut u = test_user();
            u.id = id.to_string();
            u.username = name.to_string();
            users.push(u);
        }

        let results = search_by_username(&users, "AN", 2, "u1");

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.user_id != "u1"));
        assert_eq!(results[0].name, "anna");
        assert_eq!(results[1].name, "Joanna");
    }

    #[test]
    fn test_user_serializes_camel_case_without_secrets_in_summary() {
        let user = test_user();
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("defaultHistoryPublicType").is_some());
        assert!(value.get("searchHistory").is_some());

        let summary = serde_json::to_value(UserSummary::from(&user)).unwrap();
        assert!(summary.get("password").is_none());
        assert!(summary.get("refreshToken").is_none());
    }
}
