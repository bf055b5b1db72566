use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::api::{MAX_UPLOAD_SIZE, api_router};
use crate::config::ServerConfig;
use crate::store::SqliteStore;

/// Shared handler state. The store is concrete so handlers can compose
/// several operations in one transaction.
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub config: ServerConfig,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<SqliteStore>, config: ServerConfig) -> Self {
        Self { store, config }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
