mod access;
mod account;
mod annotations;
mod permissions;
mod studies;
mod texts;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::server::AppState;

pub use texts::MAX_UPLOAD_SIZE;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Account
        .route("/account/signup", post(account::signup))
        .route("/account/login", post(account::login))
        .route("/account/logout", post(account::logout))
        .route("/account", get(account::me))
        .route("/account/annotations", get(account::my_annotations))
        // Texts
        .route("/texts", get(texts::list_texts).post(texts::upload_text))
        .route("/texts/{id}", get(texts::get_text).patch(texts::update_text))
        .route("/texts/{id}/tokens", get(texts::get_text_tokens))
        .route(
            "/texts/{id}/permissions",
            get(permissions::list_text_permissions).post(permissions::add_text_permission),
        )
        .route(
            "/texts/{id}/permissions/{pid}",
            patch(permissions::update_text_permission).delete(permissions::delete_text_permission),
        )
        // Annotations
        .route("/annotations", get(annotations::list_annotations))
        .route("/texts/{id}/annotations", get(annotations::list_text_annotations))
        .route(
            "/texts/{id}/annotations/{parent}",
            post(annotations::fork_annotation),
        )
        .route(
            "/annotations/{id}",
            get(annotations::get_annotation).patch(annotations::update_annotation),
        )
        .route(
            "/annotations/{id}/permissions",
            get(permissions::list_annotation_permissions)
                .post(permissions::add_annotation_permission),
        )
        .route(
            "/annotations/{id}/permissions/{pid}",
            patch(permissions::update_annotation_permission)
                .delete(permissions::delete_annotation_permission),
        )
        // Studies
        .route("/studies", get(studies::list_studies))
        .route("/studies/{id}", get(studies::get_study_steps))
        .route(
            "/studies/{id}/steps/{step_id}/data",
            post(studies::record_study_data),
        )
}
