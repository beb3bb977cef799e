use axum::{extract::State, http::HeaderMap, Json};
use tracing::info;

use propquote_core::domain::labor::EstimationResult;
use propquote_core::errors::ApplicationError;
use propquote_core::estimation::EstimateRequest;

use super::{application_failure, correlation_id, ApiResult, ApiState};

pub async fn create_estimate(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<EstimateRequest>,
) -> ApiResult<Json<EstimationResult>> {
    let correlation_id = correlation_id(&headers);

    request
        .validate()
        .map_err(|error| application_failure(ApplicationError::from(error), &correlation_id))?;

    let result = state.estimator.estimate_request(&request);
    info!(
        event_name = "api.estimate.served",
        correlation_id = %correlation_id,
        selections = request.selections.len(),
        items = result.labor_items.len(),
        total_cost = %result.total_cost,
        "estimate served"
    );
    Ok(Json(result))
}
