use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::approvals::executors::ExecutorRegistry;
use crate::approvals::notify::{Notification, NotificationDispatcher};
use crate::approvals::policy::{select_policy, PolicySource};
use crate::approvals::ApprovalError;
use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::action::{
    ActionRequest, ActionStatus, ApprovalRecord, PendingAction, PendingActionId, RejectionRecord,
};

const ENGINE_ACTOR: &str = "approval-engine";

/// Upper bound for any action lifetime, policy-supplied or configured.
pub const MAX_EXPIRY_HOURS: i64 = 24 * 365;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub default_expiry_hours: i64,
    pub default_required_approvals: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self { default_expiry_hours: 72, default_required_approvals: 1 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApprovalProgress {
    Recorded { current: u32, required: u32 },
    Executed { succeeded: bool },
}

pub struct ApprovalWorkflowEngine<N, A> {
    settings: WorkflowSettings,
    executors: ExecutorRegistry,
    notifier: N,
    audit: A,
}

impl<N, A> ApprovalWorkflowEngine<N, A>
where
    N: NotificationDispatcher,
    A: AuditSink,
{
    pub fn new(settings: WorkflowSettings, executors: ExecutorRegistry, notifier: N, audit: A) -> Self {
        Self { settings, executors, notifier, audit }
    }

    pub fn settings(&self) -> WorkflowSettings {
        self.settings
    }

    /// Creates the action, matches it against `policies` and either
    /// auto-approves and executes it or asks for sign-off.
    pub fn create_pending_action(
        &self,
        request: ActionRequest,
        policies: &dyn PolicySource,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PendingAction, ApprovalError> {
        validate_request(&request)?;

        let policies = match policies.active_policies() {
            Ok(policies) => policies,
            Err(lookup_error) => {
                warn!(
                    event_name = "approval.policy.lookup_failed",
                    correlation_id,
                    error = %lookup_error,
                    "policy lookup failed; using regular approval path"
                );
                Vec::new()
            }
        };
        let matched = select_policy(&policies, &request).cloned();

        let required = matched
            .as_ref()
            .map(|policy| policy.required_approvals)
            .unwrap_or(self.settings.default_required_approvals)
            .max(1);
        let policy_expiry = matched.as_ref().and_then(|policy| policy.expires_after_hours);
        let expires_at = self.expiry_for(policy_expiry, now, correlation_id)?;

        let mut action = PendingAction::from_request(
            PendingActionId(Uuid::new_v4().to_string()),
            request,
            now,
            expires_at,
        );
        action.policy_id = matched.as_ref().map(|policy| policy.id.clone());
        action.can_auto_approve =
            matched.as_ref().map(|policy| policy.allows_auto_approval()).unwrap_or(false);
        action.approval_count_required = required;

        info!(
            event_name = "approval.action.created",
            correlation_id,
            action_id = %action.id,
            action_type = %action.action_type,
            policy_id = action.policy_id.as_deref().unwrap_or("none"),
            can_auto_approve = action.can_auto_approve,
            approvals_required = required,
            "pending action created"
        );
        self.audit.emit(
            self.event(&action, correlation_id, "approval.action.created", &action.requested_by)
                .with_metadata("action_type", action.action_type.clone())
                .with_metadata("policy_id", action.policy_id.clone().unwrap_or_default()),
        );

        if action.can_auto_approve {
            action.transition_to(ActionStatus::Approved, now)?;
            action.auto_approved = true;
            self.audit.emit(self.event(
                &action,
                correlation_id,
                "approval.action.auto_approved",
                ENGINE_ACTOR,
            ));
            self.execute(&mut action, correlation_id, now);
        } else {
            self.notify(Notification::new(
                format!("Approval requested: {}", action.title),
                format!(
                    "{} requested `{}`; {} approval(s) required before {}",
                    action.requested_by,
                    action.action_type,
                    required,
                    action.expires_at.to_rfc3339()
                ),
                action.urgency,
            ));
        }

        Ok(action)
    }

    pub fn approve_action(
        &self,
        action: &mut PendingAction,
        approver: &str,
        comment: Option<String>,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ApprovalProgress, ApprovalError> {
        ensure_actionable(action, now)?;
        let approver = approver.trim();
        if approver.is_empty() {
            return Err(ApprovalError::InvalidRequest("approver must not be empty".to_string()));
        }
        if action.has_approval_from(approver) {
            return Err(ApprovalError::DuplicateApproval {
                action_id: action.id.clone(),
                approver: approver.to_string(),
            });
        }

        action.approvals.push(ApprovalRecord {
            approver: approver.to_string(),
            comment,
            approved_at: now,
        });
        action.approval_count_current = action.approval_count_current.saturating_add(1);
        action.updated_at = now;

        let current = action.approval_count_current;
        let required = action.approval_count_required;
        info!(
            event_name = "approval.action.approved",
            correlation_id,
            action_id = %action.id,
            approver,
            current,
            required,
            "approval recorded"
        );
        self.audit.emit(
            self.event(action, correlation_id, "approval.action.approved", approver)
                .with_metadata("approvals", format!("{current}/{required}")),
        );

        if current < required {
            return Ok(ApprovalProgress::Recorded { current, required });
        }

        action.transition_to(ActionStatus::Approved, now)?;
        let succeeded = self.execute(action, correlation_id, now);
        Ok(ApprovalProgress::Executed { succeeded })
    }

    /// A single rejection is final regardless of approvals already recorded.
    pub fn reject_action(
        &self,
        action: &mut PendingAction,
        rejected_by: &str,
        reason: &str,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApprovalError> {
        ensure_actionable(action, now)?;
        if rejected_by.trim().is_empty() {
            return Err(ApprovalError::InvalidRequest("rejected_by must not be empty".to_string()));
        }

        action.transition_to(ActionStatus::Rejected, now)?;
        action.rejection = Some(RejectionRecord {
            rejected_by: rejected_by.trim().to_string(),
            reason: reason.trim().to_string(),
            rejected_at: now,
        });

        info!(
            event_name = "approval.action.rejected",
            correlation_id,
            action_id = %action.id,
            rejected_by,
            "pending action rejected"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(action.id.clone()),
                correlation_id,
                "approval.action.rejected",
                AuditCategory::Approval,
                rejected_by,
                AuditOutcome::Rejected,
            )
            .with_metadata("reason", reason.trim()),
        );
        self.notify(Notification::new(
            format!("Request rejected: {}", action.title),
            format!(
                "{}, your `{}` request was rejected by {}: {}",
                action.requested_by,
                action.action_type,
                rejected_by.trim(),
                reason.trim()
            ),
            action.urgency,
        ));

        Ok(())
    }

    /// Runs the executor once and records the outcome; returns whether it succeeded.
    fn execute(&self, action: &mut PendingAction, correlation_id: &str, now: DateTime<Utc>) -> bool {
        let outcome = self.executors.execute(action, now);
        action.executed_at = Some(now);
        action.updated_at = now;

        match outcome {
            Ok(result) => {
                action.executed = true;
                action.execution_result = Some(result);
                action.execution_error = None;
                info!(
                    event_name = "approval.action.executed",
                    correlation_id,
                    action_id = %action.id,
                    action_type = %action.action_type,
                    "approved action executed"
                );
                self.audit.emit(self.event(
                    action,
                    correlation_id,
                    "approval.action.executed",
                    ENGINE_ACTOR,
                ));
                self.notify(Notification::new(
                    format!("Completed: {}", action.title),
                    format!("`{}` for {} was carried out", action.action_type, action.requested_by),
                    action.urgency,
                ));
                true
            }
            Err(execution_error) => {
                action.executed = false;
                action.execution_result = None;
                error!(
                    event_name = "approval.action.execution_failed",
                    correlation_id,
                    action_id = %action.id,
                    action_type = %action.action_type,
                    error = %execution_error,
                    "approved action failed to execute"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(action.id.clone()),
                        correlation_id,
                        "approval.action.execution_failed",
                        AuditCategory::Execution,
                        ENGINE_ACTOR,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", execution_error.to_string()),
                );
                action.execution_error = Some(execution_error.to_string());
                false
            }
        }
    }

    /// Policy hours outside `1..=MAX_EXPIRY_HOURS` fall back to the configured default.
    fn expiry_for(
        &self,
        policy_hours: Option<i64>,
        now: DateTime<Utc>,
        correlation_id: &str,
    ) -> Result<DateTime<Utc>, ApprovalError> {
        if let Some(hours) = policy_hours.filter(|hours| *hours > 0) {
            if let Some(expires_at) = expiry_after(now, hours) {
                return Ok(expires_at);
            }
            warn!(
                event_name = "approval.policy.expiry_out_of_range",
                correlation_id,
                expires_after_hours = hours,
                "policy expiry out of range; using default expiry"
            );
        }

        expiry_after(now, self.settings.default_expiry_hours).ok_or_else(|| {
            ApprovalError::InvalidRequest(format!(
                "default expiry of {} hours is outside 1..={MAX_EXPIRY_HOURS}",
                self.settings.default_expiry_hours
            ))
        })
    }

    fn notify(&self, notification: Notification) {
        match self.notifier.dispatch(&notification) {
            Ok(outcomes) => {
                for outcome in outcomes.iter().filter(|outcome| !outcome.delivered) {
                    warn!(
                        event_name = "approval.notification.channel_failed",
                        channel = %outcome.channel,
                        error = outcome.error.as_deref().unwrap_or("unknown"),
                        title = %notification.title,
                        "notification channel failed"
                    );
                }
            }
            Err(dispatch_error) => {
                warn!(
                    event_name = "approval.notification.failed",
                    error = %dispatch_error,
                    title = %notification.title,
                    "notification dispatch failed"
                );
            }
        }
    }

    fn event(
        &self,
        action: &PendingAction,
        correlation_id: &str,
        event_type: &str,
        actor: &str,
    ) -> AuditEvent {
        let category = if event_type.ends_with("executed") {
            AuditCategory::Execution
        } else {
            AuditCategory::Approval
        };
        AuditEvent::new(
            Some(action.id.clone()),
            correlation_id,
            event_type,
            category,
            actor,
            AuditOutcome::Success,
        )
    }
}

fn expiry_after(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    if !(1..=MAX_EXPIRY_HOURS).contains(&hours) {
        return None;
    }
    Duration::try_hours(hours).and_then(|duration| now.checked_add_signed(duration))
}

fn validate_request(request: &ActionRequest) -> Result<(), ApprovalError> {
    if request.action_type.trim().is_empty() {
        return Err(ApprovalError::InvalidRequest("action_type must not be empty".to_string()));
    }
    if request.title.trim().is_empty() {
        return Err(ApprovalError::InvalidRequest("title must not be empty".to_string()));
    }
    if request.requested_by.trim().is_empty() {
        return Err(ApprovalError::InvalidRequest("requested_by must not be empty".to_string()));
    }
    Ok(())
}

fn ensure_actionable(action: &PendingAction, now: DateTime<Utc>) -> Result<(), ApprovalError> {
    if action.status != ActionStatus::Pending {
        return Err(ApprovalError::NotPending { action_id: action.id.clone(), status: action.status });
    }
    if action.is_expired_at(now) {
        return Err(ApprovalError::Expired {
            action_id: action.id.clone(),
            expired_at: action.expires_at,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{ApprovalProgress, ApprovalWorkflowEngine, WorkflowSettings};
    use crate::approvals::executors::{ActionExecutor, ExecutionError, ExecutorRegistry};
    use crate::approvals::notify::RecordingNotificationDispatcher;
    use crate::approvals::policy::LoadedPolicies;
    use crate::approvals::ApprovalError;
    use crate::audit::InMemoryAuditSink;
    use crate::domain::action::{
        ActionRequest, ActionStatus, ActionUrgency, ApprovalPolicy, PendingAction,
    };

    type TestEngine = ApprovalWorkflowEngine<RecordingNotificationDispatcher, InMemoryAuditSink>;

    struct CountingExecutor {
        calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ActionExecutor for CountingExecutor {
        fn action_type(&self) -> &'static str {
            "create_work_order"
        }

        fn execute(
            &self,
            _action: &PendingAction,
            _now: DateTime<Utc>,
        ) -> Result<serde_json::Value, ExecutionError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(json!({"work_order_id": "WO-TEST"}))
        }
    }

    struct FailingExecutor;

    impl ActionExecutor for FailingExecutor {
        fn action_type(&self) -> &'static str {
            "send_payment_link"
        }

        fn execute(
            &self,
            _action: &PendingAction,
            _now: DateTime<Utc>,
        ) -> Result<serde_json::Value, ExecutionError> {
            Err(ExecutionError::Rejected("payment gateway rejected the request".to_string()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 15, 0, 0).single().expect("valid time")
    }

    fn engine() -> (
        TestEngine,
        RecordingNotificationDispatcher,
        InMemoryAuditSink,
        std::sync::Arc<std::sync::atomic::AtomicUsize>,
    ) {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut executors = ExecutorRegistry::new();
        executors.register(CountingExecutor { calls: calls.clone() });
        executors.register(FailingExecutor);
        let notifier = RecordingNotificationDispatcher::default();
        let audit = InMemoryAuditSink::default();
        let engine = ApprovalWorkflowEngine::new(
            WorkflowSettings { default_expiry_hours: 48, default_required_approvals: 1 },
            executors,
            notifier.clone(),
            audit.clone(),
        );
        (engine, notifier, audit, calls)
    }

    fn request(action_type: &str) -> ActionRequest {
        ActionRequest {
            action_type: action_type.to_string(),
            title: "Replace lobby door closer".to_string(),
            description: "Door slams shut".to_string(),
            requested_by: "manager-3".to_string(),
            property_id: Some("prop-1".to_string()),
            urgency: ActionUrgency::Normal,
            estimated_cost: Some(Decimal::new(180, 0)),
            payload: json!({}),
        }
    }

    fn policy(required_approvals: u32, auto: bool) -> ApprovalPolicy {
        ApprovalPolicy {
            id: "pol-1".to_string(),
            name: "Work orders".to_string(),
            action_types: vec!["create_work_order".to_string(), "send_payment_link".to_string()],
            urgency_levels: Vec::new(),
            max_estimated_cost: None,
            applies_to_all_properties: true,
            property_ids: Vec::new(),
            auto_approve: auto,
            require_explicit_approval: !auto,
            required_approvals,
            priority: 1,
            active: true,
            expires_after_hours: Some(24),
        }
    }

    #[test]
    fn quorum_of_two_executes_exactly_once() {
        let (engine, _, audit, calls) = engine();
        let mut action = engine
            .create_pending_action(request("create_work_order"), &vec![policy(2, false)], "req-1", now())
            .expect("action created");
        assert_eq!(action.approval_count_required, 2);
        assert_eq!(action.expires_at, now() + Duration::hours(24));

        let first = engine
            .approve_action(&mut action, "alice", None, "req-2", now())
            .expect("first approval");
        assert_eq!(first, ApprovalProgress::Recorded { current: 1, required: 2 });
        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        let second = engine
            .approve_action(&mut action, "bob", Some("ok".to_string()), "req-3", now())
            .expect("second approval");
        assert_eq!(second, ApprovalProgress::Executed { succeeded: true });
        assert_eq!(action.status, ActionStatus::Approved);
        assert!(action.executed);
        assert!(action.is_terminal());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        assert_eq!(
            audit.event_types(),
            vec![
                "approval.action.created",
                "approval.action.approved",
                "approval.action.approved",
                "approval.action.executed"
            ]
        );
    }

    #[test]
    fn single_rejection_is_final_after_partial_approval() {
        let (engine, notifier, _, calls) = engine();
        let mut action = engine
            .create_pending_action(request("create_work_order"), &vec![policy(3, false)], "req-1", now())
            .expect("action created");
        engine.approve_action(&mut action, "alice", None, "req-2", now()).expect("approval");

        engine
            .reject_action(&mut action, "bob", "out of budget", "req-3", now())
            .expect("rejection");

        assert_eq!(action.status, ActionStatus::Rejected);
        assert_eq!(action.rejection.as_ref().map(|r| r.reason.as_str()), Some("out of budget"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(notifier.sent().iter().any(|n| n.title.starts_with("Request rejected")));

        let error = engine
            .approve_action(&mut action, "carol", None, "req-4", now())
            .expect_err("terminal action");
        assert!(matches!(error, ApprovalError::NotPending { status: ActionStatus::Rejected, .. }));
    }

    #[test]
    fn auto_approval_policy_executes_immediately() {
        let (engine, notifier, audit, calls) = engine();
        let action = engine
            .create_pending_action(request("create_work_order"), &vec![policy(1, true)], "req-1", now())
            .expect("action created");

        assert!(action.can_auto_approve);
        assert!(action.auto_approved);
        assert_eq!(action.status, ActionStatus::Approved);
        assert!(action.executed);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(notifier.sent().iter().all(|n| !n.title.starts_with("Approval requested")));
        assert!(audit.event_types().contains(&"approval.action.auto_approved".to_string()));
    }

    #[test]
    fn policy_lookup_failure_never_auto_approves() {
        let (engine, notifier, _, calls) = engine();
        let action = engine
            .create_pending_action(
                request("create_work_order"),
                &LoadedPolicies(Err("database locked".to_string())),
                "req-1",
                now(),
            )
            .expect("action created");

        assert_eq!(action.status, ActionStatus::Pending);
        assert!(!action.can_auto_approve);
        assert!(action.policy_id.is_none());
        assert_eq!(action.approval_count_required, 1);
        assert_eq!(action.expires_at, now() + Duration::hours(48));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn execution_failure_is_recorded_not_raised() {
        let (engine, _, audit, _) = engine();
        let mut action = engine
            .create_pending_action(request("send_payment_link"), &vec![policy(1, false)], "req-1", now())
            .expect("action created");

        let progress = engine
            .approve_action(&mut action, "alice", None, "req-2", now())
            .expect("approval succeeds even though execution fails");

        assert_eq!(progress, ApprovalProgress::Executed { succeeded: false });
        assert_eq!(action.status, ActionStatus::Approved);
        assert!(!action.executed);
        assert!(action.is_terminal());
        assert_eq!(action.execution_error.as_deref(), Some("payment gateway rejected the request"));
        assert!(audit.event_types().contains(&"approval.action.execution_failed".to_string()));
    }

    #[test]
    fn unknown_action_type_fails_execution() {
        let (engine, _, _, _) = engine();
        let mut action = engine
            .create_pending_action(request("repaint_garage"), &Vec::<ApprovalPolicy>::new(), "req-1", now())
            .expect("action created");

        engine.approve_action(&mut action, "alice", None, "req-2", now()).expect("approval");

        assert!(!action.executed);
        assert!(action
            .execution_error
            .as_deref()
            .is_some_and(|error| error.contains("no executor registered")));
    }

    #[test]
    fn same_approver_cannot_approve_twice() {
        let (engine, _, _, _) = engine();
        let mut action = engine
            .create_pending_action(request("create_work_order"), &vec![policy(2, false)], "req-1", now())
            .expect("action created");
        engine.approve_action(&mut action, "alice", None, "req-2", now()).expect("approval");

        let error = engine
            .approve_action(&mut action, " ALICE ", None, "req-3", now())
            .expect_err("duplicate approver");
        assert!(matches!(error, ApprovalError::DuplicateApproval { .. }));
        assert_eq!(action.approval_count_current, 1);
    }

    #[test]
    fn expired_actions_refuse_decisions() {
        let (engine, _, _, _) = engine();
        let mut action = engine
            .create_pending_action(request("create_work_order"), &vec![policy(1, false)], "req-1", now())
            .expect("action created");
        let later = now() + Duration::hours(25);

        assert!(matches!(
            engine.approve_action(&mut action, "alice", None, "req-2", later),
            Err(ApprovalError::Expired { .. })
        ));
        assert!(matches!(
            engine.reject_action(&mut action, "alice", "late", "req-3", later),
            Err(ApprovalError::Expired { .. })
        ));
        assert_eq!(action.status, ActionStatus::Pending);
    }

    #[test]
    fn blank_request_fields_are_rejected() {
        let (engine, _, _, _) = engine();
        let mut blank = request("create_work_order");
        blank.title = "  ".to_string();

        let error = engine
            .create_pending_action(blank, &Vec::<ApprovalPolicy>::new(), "req-1", now())
            .expect_err("blank title");
        assert!(matches!(error, ApprovalError::InvalidRequest(_)));
    }

    #[test]
    fn notification_failure_does_not_block_creation() {
        let engine = ApprovalWorkflowEngine::new(
            WorkflowSettings::default(),
            ExecutorRegistry::standard(None),
            RecordingNotificationDispatcher::failing("smtp down"),
            InMemoryAuditSink::default(),
        );

        let action = engine
            .create_pending_action(request("create_work_order"), &Vec::<ApprovalPolicy>::new(), "req-1", now())
            .expect("action created");

        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(action.expires_at, now() + Duration::hours(72));
    }

    #[test]
    fn oversized_policy_expiry_falls_back_to_default() {
        let (engine, _, _, _) = engine();
        let mut huge = policy(1, false);
        huge.expires_after_hours = Some(10_000_000_000);

        let action = engine
            .create_pending_action(request("create_work_order"), &vec![huge], "req-1", now())
            .expect("action created");

        assert_eq!(action.expires_at, now() + Duration::hours(48));
        assert_eq!(action.status, ActionStatus::Pending);
    }

    #[test]
    fn out_of_range_default_expiry_is_an_error_not_a_panic() {
        let engine: TestEngine = ApprovalWorkflowEngine::new(
            WorkflowSettings { default_expiry_hours: i64::MAX, default_required_approvals: 1 },
            ExecutorRegistry::standard(None),
            RecordingNotificationDispatcher::default(),
            InMemoryAuditSink::default(),
        );

        let error = engine
            .create_pending_action(request("create_work_order"), &Vec::<ApprovalPolicy>::new(), "req-1", now())
            .expect_err("expiry out of range");
        assert!(matches!(error, ApprovalError::InvalidRequest(_)));
    }

    #[test]
    fn blank_rejecter_is_refused() {
        let (engine, notifier, _, _) = engine();
        let mut action = engine
            .create_pending_action(request("create_work_order"), &vec![policy(1, false)], "req-1", now())
            .expect("action created");

        let error = engine
            .reject_action(&mut action, "   ", "no reason", "req-2", now())
            .expect_err("blank rejecter");

        assert!(matches!(error, ApprovalError::InvalidRequest(_)));
        assert_eq!(action.status, ActionStatus::Pending);
        assert!(action.rejection.is_none());
        assert_eq!(notifier.sent().len(), 1);
    }
}
