//! HTTP integration tests: plugin routes, middleware, and the admin API.

mod helpers;

use async_trait::async_trait;
use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};

use quill_plugin::{BoxError, HookPoint, PluginMiddleware};

use helpers::{TestApp, bare_plugin, routed_plugin};

const BEFORE: &str = "x-before";
const AFTER: &str = "x-after";

fn append(headers: &mut HeaderMap, name: &'static str, value: &str) {
    let joined = match headers.get(name).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing},{value}"),
        None => value.to_string(),
    };
    headers.insert(name, HeaderValue::from_str(&joined).unwrap());
}

/// Records its name on the way in and on the way out; optionally blocks a path.
#[derive(Debug)]
struct Trace {
    name: &'static str,
    block: Option<&'static str>,
}

#[async_trait]
impl PluginMiddleware for Trace {
    async fn before(&self, request: &mut Request) -> Option<Response> {
        if self.block.is_some_and(|path| request.uri().path() == path) {
            return Some((StatusCode::FORBIDDEN, "blocked").into_response());
        }
        append(request.headers_mut(), BEFORE, self.name);
        None
    }

    async fn after(&self, response: &mut Response) {
        append(response.headers_mut(), AFTER, self.name);
    }
}

fn echo_headers_router() -> Router {
    Router::new().route(
        "/",
        get(|headers: HeaderMap| async move {
            headers
                .get(BEFORE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        }),
    )
}

#[tokio::test]
async fn test_seo_routes_mount_and_unmount() {
    let app = TestApp::new(vec![plugin_seo::descriptor()]);
    app.load().await;

    let res = app.request("GET", "/seo/slug?text=Hello%20Quill", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["slug"], "hello-quill");
    assert_eq!(res.headers[plugin_seo::middleware::ROBOTS_HEADER], "index, follow");

    let res = app.request("GET", "/seo/robots.txt", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.as_str().unwrap().starts_with("User-agent"));

    let res = app
        .request("POST", "/api/admin/plugins/seo/deactivate", None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "inactive");

    let res = app.request("GET", "/seo/robots.txt", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "NOT_FOUND");
    assert!(!res.headers.contains_key(plugin_seo::middleware::ROBOTS_HEADER));
}

#[tokio::test]
async fn test_longest_prefix_wins_on_segment_boundary() {
    let app = TestApp::new(vec![
        routed_plugin("shop", "/shop").build(),
        routed_plugin("shop-admin", "/shop/manage").build(),
    ]);
    app.load().await;

    let res = app.request("GET", "/shop/manage/hello", None).await;
    assert_eq!(res.body["plugin"], "shop-admin");
    assert_eq!(res.body["path"], "/hello");

    let res = app.request("GET", "/shop/hello", None).await;
    assert_eq!(res.body["plugin"], "shop");

    let res = app.request("GET", "/shop", None).await;
    assert_eq!(res.body["plugin"], "shop");
    assert_eq!(res.body["path"], "/");

    let res = app.request("GET", "/shopping", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_middleware_wraps_requests_in_priority_order() {
    let app = TestApp::new(vec![
        bare_plugin("outer")
            .middleware(Trace { name: "outer", block: None }, 10)
            .build(),
        bare_plugin("inner")
            .middleware(Trace { name: "inner", block: Some("/echo/private") }, 20)
            .route("/echo", echo_headers_router(), 100)
            .build(),
    ]);
    app.load().await;

    let res = app.request("GET", "/echo", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!("outer,inner"));
    assert_eq!(res.headers[AFTER], "inner,outer");

    let res = app.request("GET", "/echo/private", None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.headers[AFTER], "outer");
}

#[tokio::test]
async fn test_install_and_activate_over_http() {
    let app = TestApp::new(vec![plugin_seo::descriptor()]);
    app.state
        .loader
        .discover(app.state.source.as_ref())
        .await
        .unwrap();

    let res = app
        .request(
            "POST",
            "/api/admin/plugins/seo/install",
            Some(json!({ "config": { "default_description": "From the API" } })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "installed");

    let res = app.request("POST", "/api/admin/plugins/seo/activate", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "active");

    let res = app.request("GET", "/api/admin/plugins/seo", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["id"], "seo");
    assert_eq!(res.body["data"]["extensions"].as_array().unwrap().len(), 6);

    let res = app.request("POST", "/api/admin/plugins/seo/uninstall", None).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], "CONFLICT");

    let res = app.request("POST", "/api/admin/plugins/ghost/install", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.request("POST", "/api/admin/plugins/ghost/activate", None).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_plugin_reports_every_error() {
    let app = TestApp::new(vec![
        routed_plugin("squatter", "/admin/tools")
            .depends_on("missing")
            .build(),
    ]);
    app.state
        .loader
        .discover(app.state.source.as_ref())
        .await
        .unwrap();

    let res = app
        .request("POST", "/api/admin/plugins/squatter/install", None)
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "VALIDATION_ERROR");
    let codes: Vec<&str> = res.body["details"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["code"].as_str().unwrap())
        .collect();
    assert!(codes.contains(&"reserved_prefix"));
    assert!(codes.contains(&"missing_dependency"));

    let res = app.request("GET", "/api/admin/plugins/squatter", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_menu_runs_through_hook_pipeline() {
    let app = TestApp::new(vec![
        plugin_seo::descriptor(),
        bare_plugin("dashboard")
            .on(HookPoint::AdminMenu, 0, |_hook, _ctx, mut menu: Value| async move {
                menu.as_array_mut()
                    .ok_or("menu is not a list")?
                    .push(json!({ "label": "Dashboard", "path": "/admin", "plugin_id": "dashboard" }));
                Ok::<Value, BoxError>(menu)
            })
            .build(),
    ]);
    app.load().await;

    let res = app.request("GET", "/api/admin/menu", None).await;
    assert_eq!(res.status, StatusCode::OK);
    let labels: Vec<&str> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["SEO", "Dashboard"]);
    assert_eq!(res.body["data"][0]["plugin_id"], "seo");

    let res = app.request("GET", "/api/admin/pages", None).await;
    assert_eq!(res.body["data"][0]["path"], "/admin/seo");
    assert_eq!(res.body["data"][0]["required_permission"], "seo.manage");

    let res = app.request("GET", "/api/admin/models", None).await;
    assert_eq!(res.body["data"][0]["name"], "seo_meta");
    assert_eq!(res.body["data"][0]["plugin_id"], "seo");
}

#[tokio::test]
async fn test_health_and_listing_reflect_plugins() {
    let app = TestApp::new(vec![
        plugin_seo::descriptor(),
        routed_plugin("gallery", "/gallery").build(),
    ]);
    app.load().await;
    app.manager().deactivate("gallery").await.unwrap();

    let res = app.request("GET", "/api/health", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "ok");
    assert_eq!(res.body["data"]["plugins"]["total"], 2);
    assert_eq!(res.body["data"]["plugins"]["active"], 1);

    let res = app.request("GET", "/api/admin/plugins", None).await;
    let listed: Vec<(&str, &str)> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| (p["id"].as_str().unwrap(), p["status"].as_str().unwrap()))
        .collect();
    assert_eq!(listed, vec![("gallery", "inactive"), ("seo", "active")]);
}

#[tokio::test]
async fn test_reload_and_rescan_endpoints() {
    let app = TestApp::new(vec![routed_plugin("gallery", "/gallery").build()]);

    let res = app.request("POST", "/api/admin/plugins/rescan", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["load"]["activated"], json!(["gallery"]));
    assert_eq!(res.body["data"]["deactivated"], json!([]));

    let res = app.request("POST", "/api/admin/plugins/gallery/reload", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "active");

    let res = app.request("GET", "/gallery/hello", None).await;
    assert_eq!(res.body["plugin"], "gallery");
}
