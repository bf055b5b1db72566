use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::server::AppState;
use crate::store::Store;
use crate::types::Session;

/// Extractor that requires a signed-in user.
pub struct CurrentUser(pub Session);

/// Extractor that accepts anonymous requests. A token that is present but
/// unknown is still rejected.
pub struct MaybeUser(pub Session);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"entities\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingAuth)?;
        let user_id = resolve_token(state, token)?;
        Ok(CurrentUser(Session::for_user(user_id)))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => {
                let user_id = resolve_token(state, token)?;
                Ok(MaybeUser(Session::for_user(user_id)))
            }
            None => Ok(MaybeUser(Session::anonymous())),
        }
    }
}

/// Returns the token from an `Authorization: Bearer ...` header, or `None`
/// when the header is absent.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|_| AuthError::InvalidToken)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidScheme)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(Some(token))
}

fn resolve_token(state: &AppState, token: &str) -> Result<i64, AuthError> {
    let user = state
        .store
        .get_user_by_auth_token(token)
        .map_err(|e| {
            tracing::error!(error = %e, "failed to look up auth token");
            AuthError::InternalError
        })?
        .ok_or(AuthError::InvalidToken)?;
    Ok(user.id)
}
