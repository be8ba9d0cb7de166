//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::routing::get;
use axum::{Json, Router};
use http::{HeaderMap, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use quill_api::AppState;
use quill_core::config::AppConfig;
use quill_core::traits::PluginStateStore;
use quill_plugin::loader::{LoadReport, StaticSource};
use quill_plugin::store::MemoryStateStore;
use quill_plugin::{PluginBuilder, PluginDescriptor, PluginManager};

/// Test application context
pub struct TestApp {
    /// The Axum app for making test requests
    pub router: Router,
    /// Shared state behind the router
    pub state: AppState,
}

impl TestApp {
    /// Create a host offering `descriptors`, with in-memory plugin state.
    pub fn new(descriptors: Vec<PluginDescriptor>) -> Self {
        Self::with_store(descriptors, Arc::new(MemoryStateStore::new()))
    }

    /// Create a host persisting plugin state to `store`.
    pub fn with_store(
        descriptors: Vec<PluginDescriptor>,
        store: Arc<dyn PluginStateStore>,
    ) -> Self {
        let config = AppConfig::default();
        let manager = Arc::new(PluginManager::from_config(&config.plugins, store));
        let source = Arc::new(StaticSource::new(descriptors));
        let state = AppState::new(config, manager, source);
        let router = quill_api::build_app(state.clone());
        Self { router, state }
    }

    /// Discover and load every offered plugin, as the server does on boot.
    pub async fn load(&self) -> LoadReport {
        let discovered = self
            .state
            .loader
            .discover(self.state.source.as_ref())
            .await
            .expect("Failed to discover plugins");
        self.state
            .loader
            .load_all(discovered)
            .await
            .expect("Failed to load plugins")
    }

    /// The plugin manager.
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.state.manager
    }

    /// Make a request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Test response wrapper
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body, or the raw text when not JSON
    pub body: Value,
}

/// A router answering `GET /` and `GET /hello` with the owning plugin's id.
pub fn echo_router(id: &str) -> Router {
    let root_id = id.to_string();
    let hello_id = id.to_string();
    Router::new()
        .route(
            "/",
            get(move || {
                let id = root_id.clone();
                async move { Json(json!({ "plugin": id, "path": "/" })) }
            }),
        )
        .route(
            "/hello",
            get(move || {
                let id = hello_id.clone();
                async move { Json(json!({ "plugin": id, "path": "/hello" })) }
            }),
        )
}

/// A described plugin mounting [`echo_router`] under `prefix`.
pub fn routed_plugin(id: &str, prefix: &str) -> PluginBuilder {
    PluginBuilder::new(id, "1.0.0")
        .description(format!("{id} test plugin"))
        .route(prefix, echo_router(id), 100)
}

/// A described plugin with no contributions.
pub fn bare_plugin(id: &str) -> PluginBuilder {
    PluginBuilder::new(id, "1.0.0").description(format!("{id} test plugin"))
}
