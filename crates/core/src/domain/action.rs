use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingActionId(pub String);

impl std::fmt::Display for PendingActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Only a pending action may move, and only forward.
    pub fn can_transition_to(self, next: ActionStatus) -> bool {
        matches!((self, next), (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected))
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionUrgency {
    Low,
    #[default]
    Normal,
    High,
    Emergency,
}

impl ActionUrgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Emergency => "emergency",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" | "medium" => Some(Self::Normal),
            "high" => Some(Self::High),
            "emergency" | "critical" => Some(Self::Emergency),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub approver: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub approved_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub rejected_by: String,
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
}

/// What a requester asks the workflow to do.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub requested_by: String,
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub urgency: ActionUrgency,
    #[serde(default)]
    pub estimated_cost: Option<Decimal>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: PendingActionId,
    pub action_type: String,
    pub title: String,
    pub description: String,
    pub requested_by: String,
    pub property_id: Option<String>,
    pub urgency: ActionUrgency,
    pub estimated_cost: Option<Decimal>,
    pub payload: serde_json::Value,
    pub status: ActionStatus,
    pub policy_id: Option<String>,
    pub can_auto_approve: bool,
    pub auto_approved: bool,
    pub approval_count_current: u32,
    pub approval_count_required: u32,
    pub approvals: Vec<ApprovalRecord>,
    pub rejection: Option<RejectionRecord>,
    pub executed: bool,
    pub executed_at: Option<DateTime<Utc>>,
    pub execution_result: Option<serde_json::Value>,
    pub execution_error: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn from_request(
        id: PendingActionId,
        request: ActionRequest,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            action_type: request.action_type.trim().to_ascii_lowercase(),
            title: request.title,
            description: request.description,
            requested_by: request.requested_by,
            property_id: request.property_id,
            urgency: request.urgency,
            estimated_cost: request.estimated_cost,
            payload: request.payload,
            status: ActionStatus::Pending,
            policy_id: None,
            can_auto_approve: false,
            auto_approved: false,
            approval_count_current: 0,
            approval_count_required: 1,
            approvals: Vec::new(),
            rejection: None,
            executed: false,
            executed_at: None,
            execution_result: None,
            execution_error: None,
            expires_at,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn transition_to(
        &mut self,
        next: ActionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidActionTransition { from: self.status, to: next });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn has_approval_from(&self, approver: &str) -> bool {
        let approver = approver.trim();
        self.approvals.iter().any(|record| record.approver.trim().eq_ignore_ascii_case(approver))
    }

    /// Rejected, or approved with an execution attempt recorded.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            ActionStatus::Rejected => true,
            ActionStatus::Approved => self.executed_at.is_some(),
            ActionStatus::Pending => false,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ActionStatus::Pending && now >= self.expires_at
    }
}

/// Rule deciding whether an action type may skip human sign-off.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    pub id: String,
    pub name: String,
    pub action_types: Vec<String>,
    #[serde(default)]
    pub urgency_levels: Vec<ActionUrgency>,
    #[serde(default)]
    pub max_estimated_cost: Option<Decimal>,
    #[serde(default = "default_true")]
    pub applies_to_all_properties: bool,
    #[serde(default)]
    pub property_ids: Vec<String>,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default = "default_true")]
    pub require_explicit_approval: bool,
    #[serde(default = "default_required_approvals")]
    pub required_approvals: u32,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub expires_after_hours: Option<i64>,
}

fn default_true() -> bool {
    true
}

fn default_required_approvals() -> u32 {
    1
}

impl ApprovalPolicy {
    pub fn allows_auto_approval(&self) -> bool {
        self.auto_approve && !self.require_explicit_approval
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{ActionRequest, ActionStatus, ActionUrgency, PendingAction, PendingActionId};
    use crate::errors::DomainError;

    fn pending() -> PendingAction {
        let created = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).single().expect("valid time");
        PendingAction::from_request(
            PendingActionId("act-1".to_string()),
            ActionRequest {
                action_type: " Create_Work_Order ".to_string(),
                title: "Fix leaking faucet".to_string(),
                description: String::new(),
                requested_by: "resident-12".to_string(),
                property_id: Some("prop-1".to_string()),
                urgency: ActionUrgency::High,
                estimated_cost: None,
                payload: serde_json::json!({}),
            },
            created,
            created + Duration::hours(72),
        )
    }

    #[test]
    fn new_action_is_pending_with_normalized_type() {
        let action = pending();
        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(action.action_type, "create_work_order");
        assert!(!action.is_terminal());
        assert!(!action.is_expired_at(action.created_at));
        assert!(action.is_expired_at(action.expires_at));
    }

    #[test]
    fn no_reverse_transitions() {
        let mut action = pending();
        let now = action.created_at;
        action.transition_to(ActionStatus::Rejected, now).expect("pending -> rejected");
        assert!(action.is_terminal());

        let error = action.transition_to(ActionStatus::Approved, now).expect_err("terminal");
        assert_eq!(
            error,
            DomainError::InvalidActionTransition {
                from: ActionStatus::Rejected,
                to: ActionStatus::Approved
            }
        );
        assert!(!ActionStatus::Approved.can_transition_to(ActionStatus::Pending));
    }

    #[test]
    fn urgency_accepts_aliases() {
        assert_eq!(ActionUrgency::parse("Critical"), Some(ActionUrgency::Emergency));
        assert_eq!(ActionUrgency::parse("medium"), Some(ActionUrgency::Normal));
        assert_eq!(ActionUrgency::parse("whenever"), None);
    }
}
