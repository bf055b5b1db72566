use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::access::{require_annotation, require_text};
use crate::access::level_allows;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{ForkAnnotationRequest, UpdateAnnotationRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::{Store, annotations};
use crate::types::{AnnotationSummary, AnnotationUpdate, NewAnnotation, PermissionLevel, Session};

/// Method recorded on annotations forked by hand from another one.
const MANUAL_METHOD: &str = "manual";

fn visible(session: &Session, summary: &AnnotationSummary) -> bool {
    let stored = if session.user_id == Some(summary.user_id) {
        Some(PermissionLevel::Owner)
    } else {
        summary.permission
    };
    level_allows(session, summary.is_public, stored, PermissionLevel::Read)
}

/// GET /annotations - Every annotation the caller may read
pub async fn list_annotations(
    MaybeUser(session): MaybeUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let annotations = state
        .store
        .lookup_annotations(&session, None)
        .api_err("Failed to list annotations")?
        .into_iter()
        .filter(|a| visible(&session, a))
        .collect::<Vec<_>>();

    Ok::<_, ApiError>(Json(ApiResponse::success(annotations)))
}

/// GET /texts/{id}/annotations
pub async fn list_text_annotations(
    MaybeUser(session): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(text_id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_text(store, &session, text_id, PermissionLevel::Read)?;

    let annotations = store
        .lookup_annotations(&session, Some(text_id))
        .api_err("Failed to list annotations")?
        .into_iter()
        .filter(|a| visible(&session, a))
        .collect::<Vec<_>>();

    Ok::<_, ApiError>(Json(ApiResponse::success(annotations)))
}

/// GET /annotations/{id} - Metadata and graph
pub async fn get_annotation(
    MaybeUser(session): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let annotation = require_annotation(&*state.store, &session, id, PermissionLevel::Read)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(annotation)))
}

/// POST /texts/{id}/annotations/{parent} - Start a manual annotation from a
/// copy of `parent`'s graph
pub async fn fork_annotation(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path((text_id, parent_id)): Path<(i64, i64)>,
    Query(req): Query<ForkAnnotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.resolve_user(None)?;
    let store = state.store.as_ref();

    require_text(store, &session, text_id, PermissionLevel::Read)?;
    let parent = require_annotation(store, &session, parent_id, PermissionLevel::Read)?;
    if parent.summary.text_id != text_id {
        return Err(ApiError::not_found("Annotation not found for this text"));
    }

    let annotation = state
        .store
        .transaction(|conn, _| {
            let id = annotations::add_annotation(
                conn,
                &NewAnnotation {
                    user_id,
                    text_id,
                    parent_annotation_id: Some(parent_id),
                    graph: &parent.annotation,
                    method: MANUAL_METHOD,
                    method_metadata: None,
                    label: req.label.as_deref(),
                    automated_method_in_progress: false,
                },
            )?;
            annotations::add_annotation_permission(conn, user_id, id, PermissionLevel::Owner)?;
            annotations::lookup_annotation(conn, id)?.ok_or(Error::NotFound)
        })
        .api_err("Failed to create annotation")?;

    tracing::info!(
        annotation_id = annotation.summary.annotation_id,
        parent_id,
        user_id,
        "annotation forked"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(annotation))))
}

/// PATCH /annotations/{id} - Apply a graph patch and/or change visibility
/// or label (WRITE required)
pub async fn update_annotation(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAnnotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.resolve_user(None)?;
    require_annotation(&*state.store, &session, id, PermissionLevel::Write)?;

    if req.patch.is_none() && req.is_public.is_none() && req.label.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    // Read, patch and write under one transaction.
    let annotation = state
        .store
        .transaction(|conn, _| {
            let current = annotations::lookup_annotation(conn, id)?.ok_or(Error::NotFound)?;

            let graph = match &req.patch {
                Some(patch) => {
                    let mut graph = current.annotation;
                    graph.apply_patch(patch)?;
                    Some(graph)
                }
                None => None,
            };

            let update = AnnotationUpdate {
                graph,
                is_public: req.is_public,
                label: req.label.clone(),
            };
            annotations::update_annotation(conn, id, user_id, &update)?;
            annotations::lookup_annotation(conn, id)?.ok_or(Error::NotFound)
        })
        .api_err("Failed to update annotation")?;

    Ok(Json(ApiResponse::success(annotation)))
}
