//! Approval workflow for resident and staff action requests.
//!
//! `pending -> {approved, rejected}`; an approved action is executed once and
//! the outcome is recorded on it. There are no reverse transitions and no
//! automatic retries.

pub mod engine;
pub mod executors;
pub mod notify;
pub mod policy;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::action::{ActionStatus, PendingActionId};
use crate::errors::DomainError;

pub use engine::{ApprovalProgress, ApprovalWorkflowEngine, WorkflowSettings, MAX_EXPIRY_HOURS};
pub use executors::{ActionExecutor, ExecutionError, ExecutorRegistry};
pub use notify::{
    DeliveryOutcome, Notification, NotificationDispatcher, RecordingNotificationDispatcher,
    TracingNotificationDispatcher,
};
pub use policy::{select_policy, LoadedPolicies, PolicySource};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("invalid action request: {0}")]
    InvalidRequest(String),
    #[error("action `{action_id}` is not pending (status: {})", status.as_str())]
    NotPending { action_id: PendingActionId, status: ActionStatus },
    #[error("`{approver}` has already approved action `{action_id}`")]
    DuplicateApproval { action_id: PendingActionId, approver: String },
    #[error("action `{action_id}` expired at {expired_at}")]
    Expired { action_id: PendingActionId, expired_at: DateTime<Utc> },
    #[error(transparent)]
    Transition(#[from] DomainError),
}
