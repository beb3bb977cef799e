use std::collections::HashMap;

use tokio::sync::RwLock;

use propquote_core::domain::action::{ActionStatus, ApprovalPolicy, PendingAction, PendingActionId};

use super::{ApprovalPolicyRepository, PendingActionRepository, RepositoryError};

/// Keeps insertion order so priority ties list the same way the SQL twin does.
#[derive(Default)]
pub struct InMemoryApprovalPolicyRepository {
    policies: RwLock<Vec<ApprovalPolicy>>,
}

impl InMemoryApprovalPolicyRepository {
    pub fn with_policies(policies: Vec<ApprovalPolicy>) -> Self {
        Self { policies: RwLock::new(policies) }
    }
}

#[async_trait::async_trait]
impl ApprovalPolicyRepository for InMemoryApprovalPolicyRepository {
    async fn list_active(&self) -> Result<Vec<ApprovalPolicy>, RepositoryError> {
        let policies = self.policies.read().await;
        let mut active: Vec<ApprovalPolicy> =
            policies.iter().filter(|policy| policy.active).cloned().collect();
        active.sort_by_key(|policy| policy.priority);
        Ok(active)
    }

    async fn save(&self, policy: ApprovalPolicy) -> Result<(), RepositoryError> {
        let mut policies = self.policies.write().await;
        match policies.iter_mut().find(|existing| existing.id == policy.id) {
            Some(existing) => *existing = policy,
            None => policies.push(policy),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPendingActionRepository {
    actions: RwLock<HashMap<String, PendingAction>>,
}

#[async_trait::async_trait]
impl PendingActionRepository for InMemoryPendingActionRepository {
    async fn find_by_id(
        &self,
        id: &PendingActionId,
    ) -> Result<Option<PendingAction>, RepositoryError> {
        let actions = self.actions.read().await;
        Ok(actions.get(&id.0).cloned())
    }

    async fn save(&self, action: PendingAction) -> Result<(), RepositoryError> {
        let mut actions = self.actions.write().await;
        actions.insert(action.id.0.clone(), action);
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: ActionStatus,
        limit: u32,
    ) -> Result<Vec<PendingAction>, RepositoryError> {
        let actions = self.actions.read().await;
        let mut matching: Vec<PendingAction> =
            actions.values().filter(|action| action.status == status).cloned().collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use propquote_core::domain::action::{
        ActionRequest, ActionStatus, ApprovalPolicy, PendingAction, PendingActionId,
    };

    use crate::repositories::{
        ApprovalPolicyRepository, InMemoryApprovalPolicyRepository,
        InMemoryPendingActionRepository, PendingActionRepository,
    };

    fn policy(id: &str, priority: i32, active: bool) -> ApprovalPolicy {
        ApprovalPolicy {
            id: id.to_string(),
            name: id.to_string(),
            action_types: vec!["feature_request".to_string()],
            urgency_levels: Vec::new(),
            max_estimated_cost: None,
            applies_to_all_properties: true,
            property_ids: Vec::new(),
            auto_approve: false,
            require_explicit_approval: true,
            required_approvals: 1,
            priority,
            active,
            expires_after_hours: None,
        }
    }

    #[tokio::test]
    async fn in_memory_policy_repo_lists_active_by_priority() {
        let repo = InMemoryApprovalPolicyRepository::with_policies(vec![
            policy("b", 2, true),
            policy("off", 0, false),
            policy("a", 1, true),
        ]);
        repo.save(policy("b", 0, true)).await.expect("upsert");

        let ids: Vec<String> =
            repo.list_active().await.expect("list").into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn in_memory_action_repo_round_trip() {
        let repo = InMemoryPendingActionRepository::default();
        let created = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).single().expect("valid time");
        let action = PendingAction::from_request(
            PendingActionId("act-1".to_string()),
            ActionRequest {
                action_type: "feature_request".to_string(),
                title: "Dark mode".to_string(),
                description: String::new(),
                requested_by: "resident-3".to_string(),
                property_id: None,
                urgency: Default::default(),
                estimated_cost: None,
                payload: serde_json::Value::Null,
            },
            created,
            created + Duration::hours(72),
        );

        repo.save(action.clone()).await.expect("save");
        assert_eq!(repo.find_by_id(&action.id).await.expect("find"), Some(action));
        assert_eq!(repo.list_by_status(ActionStatus::Pending, 10).await.expect("list").len(), 1);
        assert!(repo.list_by_status(ActionStatus::Rejected, 10).await.expect("list").is_empty());
    }
}
