use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use propquote_core::approvals::LoadedPolicies;
use propquote_core::domain::action::{ActionRequest, PendingAction, PendingActionId};
use propquote_core::errors::ApplicationError;

use super::{
    application_failure, bad_request, correlation_id, not_found, repository_failure, ApiResult,
    ApiState,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub approver: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RejectRequest {
    pub rejected_by: String,
    pub reason: String,
}

pub async fn create_action(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<ActionRequest>,
) -> ApiResult<(StatusCode, Json<PendingAction>)> {
    let correlation_id = correlation_id(&headers);

    let policies =
        LoadedPolicies(state.policies.list_active().await.map_err(|error| error.to_string()));
    let action = state
        .engine
        .create_pending_action(request, &policies, &correlation_id, Utc::now())
        .map_err(|error| application_failure(ApplicationError::from(error), &correlation_id))?;

    state.actions.save(action.clone()).await.map_err(|e| repository_failure(e, &correlation_id))?;
    Ok((StatusCode::CREATED, Json(action)))
}

pub async fn get_action(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<PendingAction>> {
    let correlation_id = correlation_id(&headers);
    let action = load_action(&state, &id, &correlation_id).await?;
    Ok(Json(action))
}

pub async fn approve_action(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ApproveRequest>,
) -> ApiResult<Json<PendingAction>> {
    let correlation_id = correlation_id(&headers);
    let _guard = state.action_lock.lock().await;

    let mut action = load_action(&state, &id, &correlation_id).await?;
    let progress = state
        .engine
        .approve_action(&mut action, &body.approver, body.comment, &correlation_id, Utc::now())
        .map_err(|error| application_failure(ApplicationError::from(error), &correlation_id))?;

    state.actions.save(action.clone()).await.map_err(|e| repository_failure(e, &correlation_id))?;
    info!(
        event_name = "api.action.approval_recorded",
        correlation_id = %correlation_id,
        action_id = %action.id,
        progress = ?progress,
        "approval request handled"
    );
    Ok(Json(action))
}

pub async fn reject_action(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> ApiResult<Json<PendingAction>> {
    let correlation_id = correlation_id(&headers);
    if body.rejected_by.trim().is_empty() {
        return Err(bad_request("rejected_by must not be empty", &correlation_id));
    }
    let _guard = state.action_lock.lock().await;

    let mut action = load_action(&state, &id, &correlation_id).await?;
    state
        .engine
        .reject_action(&mut action, &body.rejected_by, &body.reason, &correlation_id, Utc::now())
        .map_err(|error| application_failure(ApplicationError::from(error), &correlation_id))?;

    state.actions.save(action.clone()).await.map_err(|e| repository_failure(e, &correlation_id))?;
    Ok(Json(action))
}

async fn load_action(
    state: &ApiState,
    id: &str,
    correlation_id: &str,
) -> ApiResult<PendingAction> {
    state
        .actions
        .find_by_id(&PendingActionId(id.to_string()))
        .await
        .map_err(|error| repository_failure(error, correlation_id))?
        .ok_or_else(|| not_found(format!("action `{id}` not found"), correlation_id))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::{Path, State},
        http::{HeaderMap, Request, StatusCode},
        Json,
    };
    use tower::ServiceExt;

    use propquote_core::domain::action::{ActionRequest, ActionStatus, ApprovalPolicy};

    use super::{
        approve_action, create_action, get_action, reject_action, ApproveRequest, RejectRequest,
    };
    use crate::api::test_support::harness;
    use crate::api::{router, ApiError};
    use crate::documents::images::tests::StubImageFetcher;

    fn request(action_type: &str) -> ActionRequest {
        ActionRequest {
            action_type: action_type.to_string(),
            title: "Add package lockers".to_string(),
            description: "Lobby package lockers for building B".to_string(),
            requested_by: "resident-12".to_string(),
            property_id: Some("prop-b".to_string()),
            urgency: Default::default(),
            estimated_cost: None,
            payload: serde_json::Value::Null,
        }
    }

    fn policy(id: &str, auto_approve: bool, required_approvals: u32) -> ApprovalPolicy {
        ApprovalPolicy {
            id: id.to_string(),
            name: id.to_string(),
            action_types: vec!["feature_request".to_string()],
            urgency_levels: Vec::new(),
            max_estimated_cost: None,
            applies_to_all_properties: true,
            property_ids: Vec::new(),
            auto_approve,
            require_explicit_approval: !auto_approve,
            required_approvals,
            priority: 0,
            active: true,
            expires_after_hours: None,
        }
    }

    #[tokio::test]
    async fn auto_approved_actions_execute_on_creation() {
        let h = harness(vec![policy("auto-fr", true, 1)], StubImageFetcher::default());

        let (status, Json(action)) =
            create_action(State(h.state.clone()), HeaderMap::new(), Json(request("feature_request")))
                .await
                .expect("create should succeed");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(action.status, ActionStatus::Approved);
        assert!(action.auto_approved);
        assert!(action.executed);
        assert!(h.audit.event_types().contains(&"approval.action.auto_approved".to_string()));
    }

    #[tokio::test]
    async fn two_approvals_execute_and_persist_the_action() {
        let h = harness(vec![policy("board", false, 2)], StubImageFetcher::default());
        let (_, Json(created)) =
            create_action(State(h.state.clone()), HeaderMap::new(), Json(request("feature_request")))
                .await
                .expect("create should succeed");
        assert_eq!(created.status, ActionStatus::Pending);
        assert_eq!(h.notifications.sent().len(), 1);

        let id = created.id.0.clone();
        let Json(first) = approve_action(
            State(h.state.clone()),
            HeaderMap::new(),
            Path(id.clone()),
            Json(ApproveRequest { approver: "manager-1".to_string(), comment: None }),
        )
        .await
        .expect("first approval");
        assert_eq!(first.status, ActionStatus::Pending);
        assert_eq!(first.approval_count_current, 1);

        let duplicate = approve_action(
            State(h.state.clone()),
            HeaderMap::new(),
            Path(id.clone()),
            Json(ApproveRequest { approver: "manager-1".to_string(), comment: None }),
        )
        .await;
        assert_eq!(duplicate.expect_err("duplicate approver").0, StatusCode::BAD_REQUEST);

        let Json(second) = approve_action(
            State(h.state.clone()),
            HeaderMap::new(),
            Path(id.clone()),
            Json(ApproveRequest {
                approver: "manager-2".to_string(),
                comment: Some("ok for Q3".to_string()),
            }),
        )
        .await
        .expect("second approval");
        assert_eq!(second.status, ActionStatus::Approved);
        assert!(second.executed);

        let Json(stored) = get_action(State(h.state), HeaderMap::new(), Path(id))
            .await
            .expect("stored action");
        assert_eq!(stored, second);
    }

    #[tokio::test]
    async fn unknown_action_types_record_the_execution_error() {
        let h = harness(Vec::new(), StubImageFetcher::default());
        let (_, Json(created)) =
            create_action(State(h.state.clone()), HeaderMap::new(), Json(request("repaint_lobby")))
                .await
                .expect("create should succeed");

        let Json(approved) = approve_action(
            State(h.state),
            HeaderMap::new(),
            Path(created.id.0.clone()),
            Json(ApproveRequest { approver: "manager-1".to_string(), comment: None }),
        )
        .await
        .expect("approval is not an HTTP error");

        assert_eq!(approved.status, ActionStatus::Approved);
        assert!(!approved.executed);
        assert!(approved
            .execution_error
            .as_deref()
            .is_some_and(|error| error.contains("no executor registered")));
    }

    #[tokio::test]
    async fn rejected_actions_cannot_be_approved_afterwards() {
        let h = harness(Vec::new(), StubImageFetcher::default());
        let (_, Json(created)) =
            create_action(State(h.state.clone()), HeaderMap::new(), Json(request("feature_request")))
                .await
                .expect("create should succeed");
        let id = created.id.0.clone();

        let Json(rejected) = reject_action(
            State(h.state.clone()),
            HeaderMap::new(),
            Path(id.clone()),
            Json(RejectRequest {
                rejected_by: "board-chair".to_string(),
                reason: "Out of budget".to_string(),
            }),
        )
        .await
        .expect("reject should succeed");
        assert_eq!(rejected.status, ActionStatus::Rejected);
        assert_eq!(rejected.rejection.as_ref().map(|r| r.reason.as_str()), Some("Out of budget"));

        let late = approve_action(
            State(h.state),
            HeaderMap::new(),
            Path(id),
            Json(ApproveRequest { approver: "manager-1".to_string(), comment: None }),
        )
        .await;
        let (status, Json(body)) = late.expect_err("rejected action is final");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.message.contains("not pending"));
    }

    #[tokio::test]
    async fn missing_actions_are_not_found_through_the_router() {
        let h = harness(Vec::new(), StubImageFetcher::default());
        let response = router(h.state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/actions/does-not-exist")
                    .header("x-correlation-id", "req-404")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: ApiError = serde_json::from_slice(&bytes).expect("json error body");
        assert_eq!(body.correlation_id, "req-404");
        assert_eq!(body.error, "not_found");
    }
}
