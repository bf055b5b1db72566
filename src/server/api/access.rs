use crate::access::{has_annotation_permission, has_text_permission};
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{Annotation, PermissionLevel, Session, Text};

/// Anonymous callers are asked to sign in; signed-in callers are refused.
fn denied(session: &Session, message: &'static str) -> ApiError {
    match session.user_id {
        None => ApiError::unauthorized("Authentication required"),
        Some(_) => ApiError::forbidden(message),
    }
}

/// Loads a text and checks the session holds `required` on it.
pub fn require_text(
    store: &dyn Store,
    session: &Session,
    text_id: i64,
    required: PermissionLevel,
) -> Result<Text, ApiError> {
    let text = store
        .get_text(text_id)
        .api_err("Failed to get text")?
        .or_not_found("Text not found")?;

    if !has_text_permission(store, session, text_id, required)
        .api_err("Failed to check text permission")?
    {
        return Err(denied(session, "Insufficient text permissions"));
    }
    Ok(text)
}

/// Loads an annotation and checks the session holds `required` on it.
pub fn require_annotation(
    store: &dyn Store,
    session: &Session,
    annotation_id: i64,
    required: PermissionLevel,
) -> Result<Annotation, ApiError> {
    let annotation = store
        .lookup_annotation(annotation_id)
        .api_err("Failed to get annotation")?
        .or_not_found("Annotation not found")?;

    if !has_annotation_permission(store, session, annotation_id, required)
        .api_err("Failed to check annotation permission")?
    {
        return Err(denied(session, "Insufficient annotation permissions"));
    }
    Ok(annotation)
}

/// Resolves the grantee of a permission request to a user id.
pub fn resolve_grantee(
    store: &dyn Store,
    user_id: Option<i64>,
    username: Option<&str>,
) -> Result<i64, ApiError> {
    let user = match (user_id, username) {
        (Some(id), _) => store.get_user(id).api_err("Failed to get user")?,
        (None, Some(name)) => store
            .get_user_by_name(name)
            .api_err("Failed to get user")?,
        (None, None) => return Err(ApiError::bad_request("user_id or username is required")),
    };
    Ok(user.or_not_found("User not found")?.id)
}
