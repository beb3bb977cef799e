//! JSON API for estimates, proposal documents and the approval workflow.
//!
//! - `POST /api/v1/estimates`: labor estimate for a device selection
//! - `POST /api/v1/quotes/document`: proposal as PDF (or HTML without a converter)
//! - `POST /api/v1/actions`: submit an action for approval
//! - `GET  /api/v1/actions/{id}`: fetch an action
//! - `POST /api/v1/actions/{id}/approve`: record one approval
//! - `POST /api/v1/actions/{id}/reject`: reject a pending action

pub mod actions;
pub mod estimates;
pub mod quotes;

use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, warn};
use uuid::Uuid;

use propquote_core::approvals::{ApprovalWorkflowEngine, NotificationDispatcher};
use propquote_core::audit::AuditSink;
use propquote_core::errors::{ApplicationError, InterfaceError};
use propquote_core::estimation::{
    FallbackProvider, InstallationRuleSet, LaborEstimator, StaticDefaults,
};
use propquote_db::repositories::{
    ApprovalPolicyRepository, PendingActionRepository, RepositoryError,
};

use crate::documents::{DocumentRenderer, ImageFetcher};

pub const CORRELATION_HEADER: &str = "x-correlation-id";

pub type RuleProvider = Arc<FallbackProvider<InstallationRuleSet, StaticDefaults>>;
pub type Estimator = LaborEstimator<RuleProvider>;
pub type WorkflowEngine =
    ApprovalWorkflowEngine<Arc<dyn NotificationDispatcher>, Arc<dyn AuditSink>>;

#[derive(Clone)]
pub struct ApiState {
    pub estimator: Arc<Estimator>,
    pub renderer: Arc<DocumentRenderer>,
    pub image_fetcher: Arc<dyn ImageFetcher>,
    pub policies: Arc<dyn ApprovalPolicyRepository>,
    pub actions: Arc<dyn PendingActionRepository>,
    pub engine: Arc<WorkflowEngine>,
    /// Serializes read-modify-write cycles on pending actions.
    pub action_lock: Arc<Mutex<()>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

pub type ApiFailure = (StatusCode, Json<ApiError>);
pub type ApiResult<T> = Result<T, ApiFailure>;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/estimates", post(estimates::create_estimate))
        .route("/api/v1/quotes/document", post(quotes::render_quote_document))
        .route("/api/v1/actions", post(actions::create_action))
        .route("/api/v1/actions/{id}", get(actions::get_action))
        .route("/api/v1/actions/{id}/approve", post(actions::approve_action))
        .route("/api/v1/actions/{id}/reject", post(actions::reject_action))
        .with_state(state)
}

/// Caller-supplied `x-correlation-id`, or a fresh one.
pub fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("req-{}", Uuid::new_v4()))
}

pub fn interface_failure(error: InterfaceError) -> ApiFailure {
    let user_message = error.user_message().to_string();
    match error {
        InterfaceError::BadRequest { message, correlation_id } => (
            StatusCode::BAD_REQUEST,
            Json(ApiError { error: user_message, message, correlation_id }),
        ),
        InterfaceError::ServiceUnavailable { message, correlation_id } => {
            warn!(
                event_name = "api.request.unavailable",
                correlation_id = %correlation_id,
                error = %message,
                "request failed on an unavailable dependency"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError { error: user_message.clone(), message: user_message, correlation_id }),
            )
        }
        InterfaceError::Internal { message, correlation_id } => {
            error!(
                event_name = "api.request.internal_error",
                correlation_id = %correlation_id,
                error = %message,
                "request failed with an internal error"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError { error: user_message.clone(), message: user_message, correlation_id }),
            )
        }
    }
}

pub fn application_failure(error: ApplicationError, correlation_id: &str) -> ApiFailure {
    interface_failure(error.into_interface(correlation_id))
}

pub fn repository_failure(error: RepositoryError, correlation_id: &str) -> ApiFailure {
    application_failure(ApplicationError::Persistence(error.to_string()), correlation_id)
}

pub fn bad_request(message: impl Into<String>, correlation_id: &str) -> ApiFailure {
    interface_failure(InterfaceError::BadRequest {
        message: message.into(),
        correlation_id: correlation_id.to_string(),
    })
}

pub fn not_found(message: impl Into<String>, correlation_id: &str) -> ApiFailure {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            error: "not_found".to_string(),
            message: message.into(),
            correlation_id: correlation_id.to_string(),
        }),
    )
}
