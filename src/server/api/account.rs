use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::{CurrentUser, PasswordHasher, generate_auth_token};
use crate::server::AppState;
use crate::server::dto::{LoginRequest, SignupRequest, TokenResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_password, validate_username};
use crate::store::Store;

const BAD_CREDENTIALS: &str = "Invalid username or password";

/// POST /account/signup - Create an account and sign it in
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_username(&req.username).map_err(ApiError::bad_request)?;
    validate_password(&req.password).map_err(ApiError::bad_request)?;

    let hash = PasswordHasher::new()
        .hash(&req.password)
        .api_err("Failed to hash password")?;
    let user_id = store
        .create_user(&req.username, &hash)
        .api_err("Failed to create user")?;

    let auth_token = generate_auth_token();
    store
        .set_auth_token(user_id, &auth_token)
        .api_err("Failed to store auth token")?;

    let user = store
        .get_user(user_id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    tracing::info!(user_id, username = %user.username, "account created");

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(TokenResponse { user, auth_token })),
    ))
}

/// POST /account/login - Exchange credentials for a fresh auth token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let user = store
        .get_user_by_name(&req.username)
        .api_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized(BAD_CREDENTIALS))?;

    if !PasswordHasher::new()
        .verify(&req.password, &user.password)
        .api_err("Failed to verify password")?
    {
        tracing::warn!(username = %req.username, "failed login attempt");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    let auth_token = generate_auth_token();
    store
        .set_auth_token(user.id, &auth_token)
        .api_err("Failed to store auth token")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(TokenResponse { user, auth_token })))
}

/// POST /account/logout - Invalidate the caller's auth token
pub async fn logout(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = session.resolve_user(None).map_err(ApiError::from)?;
    state
        .store
        .set_auth_token(user_id, "")
        .api_err("Failed to clear auth token")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

/// GET /account - The signed-in user
pub async fn me(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = session.resolve_user(None).map_err(ApiError::from)?;
    let user = state
        .store
        .get_user(user_id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

/// GET /account/annotations - Annotations the signed-in user created
pub async fn my_annotations(
    CurrentUser(session): CurrentUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = session.resolve_user(None).map_err(ApiError::from)?;
    let annotations = state
        .store
        .lookup_annotations_by_user(user_id)
        .api_err("Failed to list annotations")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(annotations)))
}
