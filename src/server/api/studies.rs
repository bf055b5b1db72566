use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::CurrentUser;
use crate::server::AppState;
use crate::server::dto::{RecordStudyDataRequest, StudyDataResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;

/// GET /studies - Studies the caller participates in
pub async fn list_studies(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let studies = state
        .store
        .get_studies(&session, None)
        .api_err("Failed to list studies")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(studies)))
}

/// GET /studies/{id} - The study with the caller's ordered steps
pub async fn get_study_steps(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let steps = state
        .store
        .get_steps(id, &session, None)
        .api_err("Failed to get study steps")?
        .or_not_found("Study not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(steps)))
}

/// POST /studies/{id}/steps/{step_id}/data - Record events the caller logged
/// on one of their steps
pub async fn record_study_data(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path((study_id, step_id)): Path<(i64, i64)>,
    Json(req): Json<RecordStudyDataRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    let steps = store
        .get_steps(study_id, &session, None)
        .api_err("Failed to get study steps")?
        .or_not_found("Study not found")?;
    if !steps.steps.iter().any(|step| step.id == step_id) {
        return Err(ApiError::not_found("Step not found in this study"));
    }
    if req.data.is_empty() {
        return Err(ApiError::bad_request("No events to record"));
    }

    let data = serde_json::to_string(&req.data).map_err(|e| {
        tracing::error!(error = %e, study_id, step_id, "failed to encode study events");
        ApiError::internal("Failed to record study data")
    })?;
    let study_data_id = store
        .add_study_data(steps.study.participant_id, step_id, &data)
        .api_err("Failed to record study data")?;

    tracing::debug!(study_id, step_id, study_data_id, events = req.data.len(), "study data recorded");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(StudyDataResponse { study_data_id })),
    ))
}
