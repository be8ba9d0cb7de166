//! Route definitions for the Quill HTTP API.
//!
//! Host routes are mounted under `/api`. Anything they do not match falls
//! through to the routers of active plugins.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware;
use crate::mount;
use crate::state::AppState;

/// Build the Axum router with host routes, plugin mounting, and the plugin
/// middleware chain.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health_routes())
        .merge(plugin_routes())
        .merge(admin_routes());

    Router::new()
        .nest("/api", api_routes)
        .fallback(mount::dispatch)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::plugin::plugin_middleware,
        ))
        .with_state(state)
}

/// Health endpoint
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Plugin lifecycle administration
fn plugin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/plugins", get(handlers::plugins::list_plugins))
        .route("/admin/plugins/rescan", post(handlers::plugins::rescan_plugins))
        .route("/admin/plugins/{id}", get(handlers::plugins::get_plugin))
        .route(
            "/admin/plugins/{id}/install",
            post(handlers::plugins::install_plugin),
        )
        .route(
            "/admin/plugins/{id}/activate",
            post(handlers::plugins::activate_plugin),
        )
        .route(
            "/admin/plugins/{id}/deactivate",
            post(handlers::plugins::deactivate_plugin),
        )
        .route(
            "/admin/plugins/{id}/uninstall",
            post(handlers::plugins::uninstall_plugin),
        )
        .route(
            "/admin/plugins/{id}/reload",
            post(handlers::plugins::reload_plugin),
        )
}

/// Admin UI composed from plugin contributions
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/menu", get(handlers::admin::menu))
        .route("/admin/pages", get(handlers::admin::pages))
        .route("/admin/models", get(handlers::admin::models))
}
