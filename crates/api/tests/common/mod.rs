#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::Notify;
use tower::ServiceExt;

use eduboard_api::auth::jwt::{generate_access_token, JwtConfig};
use eduboard_api::config::{NotifyConfig, ServerConfig, StoreBackend};
use eduboard_api::router::build_app_router;
use eduboard_api::state::AppState;
use eduboard_core::authz::Principal;
use eduboard_core::roles::{ROLE_ADMIN, ROLE_HR, ROLE_TEACHER};
use eduboard_db::repositories::SequenceStrategy;
use eduboard_db::MemoryStore;

const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults and the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        store_backend: StoreBackend::Memory,
        database_url: None,
        sequence_strategy: SequenceStrategy::Counter,
        expose_internal_errors: false,
        home_tuition_retention_days: 30,
        notify: NotifyConfig {
            batch_size: 100,
            poll_secs: 15,
            max_attempts: 5,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// A router over a fresh in-memory store, plus handles for assertions.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub outbox_signal: Arc<Notify>,
}

impl TestApp {
    /// A clone of the router for one `oneshot` request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router (same middleware stack as `main.rs`).
pub fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let outbox_signal = Arc::new(Notify::new());

    let state = AppState {
        documents: store.clone(),
        outbox: store.clone(),
        config: Arc::new(test_config()),
        outbox_signal: outbox_signal.clone(),
    };

    TestApp {
        router: build_app_router(state),
        store,
        outbox_signal,
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

pub fn token(user_id: &str, role: &str, email: Option<&str>) -> String {
    let principal = Principal {
        user_id: user_id.into(),
        role: role.into(),
        email: email.map(Into::into),
    };
    generate_access_token(&principal, &test_config().jwt).unwrap()
}

pub fn admin_token() -> String {
    token("admin-1", ROLE_ADMIN, Some("admin@eduboard.example"))
}

pub fn hr_token() -> String {
    token("hr-1", ROLE_HR, Some("hr@eduboard.example"))
}

pub fn teacher_token(user_id: &str, email: &str) -> String {
    token(user_id, ROLE_TEACHER, Some(email))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn teacher_body(name: &str, email: &str) -> Value {
    serde_json::json!({
        "name": name,
        "email": email,
        "phone": "9876543210",
        "city": "Pune",
        "subjects": ["Maths", "Physics"]
    })
}

pub fn vacancy_body(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "organization": "Green Valley School",
        "organization_type": "school",
        "contact_email": "hr@gvs.example",
        "city": "Pune",
        "subject": "Maths"
    })
}

/// Create a record and return its `data` object, asserting 201.
pub async fn create(app: &TestApp, uri: &str, body: Value, token: &str) -> Value {
    let response = post_json_auth(app.app(), uri, body, token).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}
