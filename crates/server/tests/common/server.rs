//! Server test utilities.

use super::mocks::ScriptedBackend;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use revalidator_cache::CacheInvalidator;
use revalidator_core::config::AppConfig;
use revalidator_server::{AppState, create_router};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Secret accepted by `AppConfig::for_testing()`.
#[allow(dead_code)]
pub const SECRET: &str = "correct";

/// A test server wrapper with its backend.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub backend: Arc<ScriptedBackend>,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server backed by a recording backend.
    pub fn new() -> Self {
        Self::with_backend(ScriptedBackend::new(), |_| {})
    }

    /// Create a test server with custom config modifications.
    pub fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::with_backend(ScriptedBackend::new(), modifier)
    }

    /// Create a test server around a scripted backend.
    pub fn with_backend<F>(backend: ScriptedBackend, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let backend = Arc::new(backend);
        let (router, state) = Self::build(backend.clone(), modifier);
        Self {
            router,
            state,
            backend,
        }
    }

    /// Build a router around any backend.
    pub fn build<F>(backend: Arc<dyn CacheInvalidator>, modifier: F) -> (axum::Router, AppState)
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = AppConfig::for_testing();
        modifier(&mut config);

        let state = AppState::new(config, backend).expect("Failed to build app state");
        (create_router(state.clone()), state)
    }
}

/// Helper to make JSON requests.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    send(router, request).await
}

/// Send a prepared request and decode the JSON body.
#[allow(dead_code)]
pub async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}
