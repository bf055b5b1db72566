use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::access::{require_annotation, require_text, resolve_grantee};
use crate::auth::CurrentUser;
use crate::server::AppState;
use crate::server::dto::{CreatePermissionRequest, UpdatePermissionRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{AnnotationPermission, PermissionLevel, TextPermission};

// Text permissions. Managing them requires OWNER on the text.

pub async fn list_text_permissions(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(text_id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_text(store, &session, text_id, PermissionLevel::Owner)?;

    let permissions = store
        .list_text_permissions(text_id)
        .api_err("Failed to list text permissions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(permissions)))
}

pub async fn add_text_permission(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(text_id): Path<i64>,
    Json(req): Json<CreatePermissionRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_text(store, &session, text_id, PermissionLevel::Owner)?;

    let level = req.permission.level().map_err(ApiError::from)?;
    let grantee = resolve_grantee(store, req.user_id, req.username.as_deref())?;

    let id = store
        .add_text_permission(grantee, text_id, level)
        .api_err("Failed to add text permission")?;
    let permission = store
        .get_text_permission_by_id(id)
        .api_err("Failed to get text permission")?
        .or_not_found("Permission not found")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(permission))))
}

fn text_permission_of(
    store: &dyn Store,
    text_id: i64,
    permission_id: i64,
) -> Result<TextPermission, ApiError> {
    store
        .get_text_permission_by_id(permission_id)
        .api_err("Failed to get text permission")?
        .filter(|p| p.text_id == text_id)
        .or_not_found("Permission not found")
}

pub async fn update_text_permission(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path((text_id, permission_id)): Path<(i64, i64)>,
    Json(req): Json<UpdatePermissionRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_text(store, &session, text_id, PermissionLevel::Owner)?;
    text_permission_of(store, text_id, permission_id)?;

    let level = req.permission.level().map_err(ApiError::from)?;
    store
        .set_text_permission(permission_id, level)
        .api_err("Failed to update text permission")?;

    let permission = text_permission_of(store, text_id, permission_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(permission)))
}

pub async fn delete_text_permission(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path((text_id, permission_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_text(store, &session, text_id, PermissionLevel::Owner)?;
    text_permission_of(store, text_id, permission_id)?;

    store
        .delete_text_permission(permission_id)
        .api_err("Failed to delete text permission")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

// Annotation permissions. Managing them requires OWNER on the annotation,
// which its creator always has.

pub async fn list_annotation_permissions(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(annotation_id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_annotation(store, &session, annotation_id, PermissionLevel::Owner)?;

    let permissions = store
        .list_annotation_permissions(annotation_id)
        .api_err("Failed to list annotation permissions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(permissions)))
}

pub async fn add_annotation_permission(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(annotation_id): Path<i64>,
    Json(req): Json<CreatePermissionRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_annotation(store, &session, annotation_id, PermissionLevel::Owner)?;

    let level = req.permission.level().map_err(ApiError::from)?;
    let grantee = resolve_grantee(store, req.user_id, req.username.as_deref())?;

    let id = store
        .add_annotation_permission(grantee, annotation_id, level)
        .api_err("Failed to add annotation permission")?;
    let permission = store
        .get_annotation_permission_by_id(id)
        .api_err("Failed to get annotation permission")?
        .or_not_found("Permission not found")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(permission))))
}

fn annotation_permission_of(
    store: &dyn Store,
    annotation_id: i64,
    permission_id: i64,
) -> Result<AnnotationPermission, ApiError> {
    store
        .get_annotation_permission_by_id(permission_id)
        .api_err("Failed to get annotation permission")?
        .filter(|p| p.annotation_id == annotation_id)
        .or_not_found("Permission not found")
}

pub async fn update_annotation_permission(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path((annotation_id, permission_id)): Path<(i64, i64)>,
    Json(req): Json<UpdatePermissionRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_annotation(store, &session, annotation_id, PermissionLevel::Owner)?;
    annotation_permission_of(store, annotation_id, permission_id)?;

    let level = req.permission.level().map_err(ApiError::from)?;
    store
        .set_annotation_permission(permission_id, level)
        .api_err("Failed to update annotation permission")?;

    let permission = annotation_permission_of(store, annotation_id, permission_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(permission)))
}

pub async fn delete_annotation_permission(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path((annotation_id, permission_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_annotation(store, &session, annotation_id, PermissionLevel::Owner)?;
    annotation_permission_of(store, annotation_id, permission_id)?;

    store
        .delete_annotation_permission(permission_id)
        .api_err("Failed to delete annotation permission")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
