use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::access::require_text;
use crate::auth::{CurrentUser, MaybeUser};
use crate::server::AppState;
use crate::server::dto::{ListTextsParams, TextListResponse, UploadResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_title;
use crate::store::{Store, annotations, texts};
use crate::types::{
    AnnotationGraph, NewAnnotation, NewText, PermissionLevel, TextQuery, TextUpdate,
};

pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Method recorded on the root annotation of every uploaded text.
const BLANK_SLATE_METHOD: &str = "unannotated";

/// GET /texts - Texts the caller may read, in id order
pub async fn list_texts(
    MaybeUser(session): MaybeUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTextsParams>,
) -> impl IntoResponse {
    let query = TextQuery {
        start_id: params.start_id.unwrap_or(0),
        end_id: params.end_id,
        count: params.count,
    };

    let upload_count = state.store.count_texts().api_err("Failed to count texts")?;
    let texts = state
        .store
        .list_texts(&session, &query)
        .api_err("Failed to list texts")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(TextListResponse {
        upload_count,
        start_id: query.start_id,
        end_id: texts.last().map(|t| t.text.id),
        returned_count: texts.len(),
        texts,
    })))
}

async fn parse_multipart_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    let mut title: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
                if data.len() > MAX_UPLOAD_SIZE {
                    return Err(ApiError::payload_too_large(format!(
                        "File size ({} bytes) exceeds maximum allowed size ({MAX_UPLOAD_SIZE} bytes)",
                        data.len()
                    )));
                }
                content = Some(data.to_vec());
            }
            Some("title") => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read title: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let content = content.ok_or_else(|| ApiError::bad_request("File field is required"))?;
    if content.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    let title = title.ok_or_else(|| ApiError::bad_request("Title field is required"))?;

    Ok((title, content))
}

/// POST /texts - Upload a text as multipart `title` + `file`
///
/// The text row, the uploader's OWNER grants and the blank-slate annotation
/// are created in one transaction. Content that was already stored under the
/// same hash is shared rather than written again.
pub async fn upload_text(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.resolve_user(None)?;
    let (title, content) = parse_multipart_upload(&mut multipart).await?;
    validate_title(&title)?;

    let md5sum = hex::encode(Sha256::digest(&content));

    let upload_dir = state.config.upload_dir();
    tokio::fs::create_dir_all(&upload_dir).await.map_err(|e| {
        tracing::error!(error = %e, dir = %upload_dir.display(), "failed to create upload dir");
        ApiError::internal("Failed to store upload")
    })?;
    let spool = upload_dir.join(format!("{}.txt", Uuid::new_v4()));
    tokio::fs::write(&spool, &content).await.map_err(|e| {
        tracing::error!(error = %e, path = %spool.display(), "failed to spool upload");
        ApiError::internal("Failed to store upload")
    })?;

    let result = state.store.transaction(|conn, storage| {
        let added = texts::add_text(
            conn,
            storage,
            &NewText {
                md5sum: &md5sum,
                source: &spool,
                title: title.trim(),
                uploaded_by: user_id,
            },
        )?;
        let text_id = added.text.id;
        texts::add_text_permission(conn, user_id, text_id, PermissionLevel::Owner)?;

        let graph = AnnotationGraph::blank_slate();
        let annotation_id = annotations::add_annotation(
            conn,
            &NewAnnotation {
                user_id,
                text_id,
                parent_annotation_id: None,
                graph: &graph,
                method: BLANK_SLATE_METHOD,
                method_metadata: None,
                label: None,
                automated_method_in_progress: false,
            },
        )?;
        annotations::add_annotation_permission(
            conn,
            user_id,
            annotation_id,
            PermissionLevel::Owner,
        )?;

        Ok(UploadResponse {
            text: added.text,
            annotation_id,
            needs_processing: added.needs_processing,
        })
    });

    remove_spool(&spool).await;
    let uploaded = result.api_err("Failed to add text")?;

    if uploaded.needs_processing {
        tracing::info!(text_id = uploaded.text.id, md5sum = %uploaded.text.md5sum, "text awaits tokenization");
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::success(uploaded))))
}

/// Placement moves the spooled file away; it is only still there when the
/// content was already stored or the upload failed.
async fn remove_spool(spool: &FsPath) {
    match tokio::fs::remove_file(spool).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(error = %e, path = %spool.display(), "failed to remove spooled upload");
        }
    }
}

/// GET /texts/{id}
pub async fn get_text(
    MaybeUser(session): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let text = require_text(&*state.store, &session, id, PermissionLevel::Read)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(text)))
}

/// GET /texts/{id}/tokens - The tokenized form of a text, once it exists
pub async fn get_text_tokens(
    MaybeUser(session): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_text(store, &session, id, PermissionLevel::Read)?;

    let path = store
        .text_content_path(id)
        .api_err("Failed to locate text content")?
        .or_not_found("Text not found")?;

    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Text has not been tokenized yet"));
        }
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "failed to read tokens");
            return Err(ApiError::internal("Failed to read text content"));
        }
    };
    let tokens: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
        tracing::error!(error = %e, path = %path.display(), "malformed tokens file");
        ApiError::internal("Failed to read text content")
    })?;

    Ok(Json(ApiResponse::success(tokens)))
}

/// PATCH /texts/{id} - Change the title or visibility (WRITE required)
pub async fn update_text(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(mut update): Json<TextUpdate>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    require_text(store, &session, id, PermissionLevel::Write)?;

    if let Some(title) = update.title.take() {
        validate_title(&title)?;
        update.title = Some(title.trim().to_string());
    }

    store
        .update_text(id, &update)
        .api_err("Failed to update text")?;

    let text = store
        .get_text(id)
        .api_err("Failed to get text")?
        .or_not_found("Text not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(text)))
}
