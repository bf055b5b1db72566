#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

use entities::config::ServerConfig;
use entities::server::{AppState, create_router};
use entities::store::{SqliteStore, Store};

const BOUNDARY: &str = "entities-test-boundary";

/// The router over a fresh database and text store in a temp dir.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub config: ServerConfig,
    router: Router,
}

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let store = SqliteStore::new(config.db_path(), config.text_storage_dir())
            .expect("open store");
        store.initialize().expect("initialize store");
        let store = Arc::new(store);

        let router = create_router(Arc::new(AppState::new(store.clone(), config.clone())));

        Self {
            temp_dir,
            store,
            config,
            router,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn upload(&self, token: &str, title: &str, content: &str) -> (StatusCode, Value) {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             {title}\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"text.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/texts")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("build upload request");

        self.send(request).await
    }

    pub async fn signup(&self, username: &str) -> TestUser {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/account/signup",
                None,
                Some(json!({ "username": username, "password": "correct horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");

        TestUser {
            id: body["data"]["user"]["id"].as_i64().expect("user id"),
            token: body["data"]["auth_token"]
                .as_str()
                .expect("auth token")
                .to_string(),
        }
    }

    /// Uploads a text and returns `(text_id, blank_slate_annotation_id)`.
    pub async fn upload_text(&self, user: &TestUser, title: &str, content: &str) -> (i64, i64) {
        let (status, body) = self.upload(&user.token, title, content).await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {body}");
        (
            body["data"]["text"]["id"].as_i64().expect("text id"),
            body["data"]["annotation_id"].as_i64().expect("annotation id"),
        )
    }
}
