//! Application builder: wires router + middleware + state into an Axum app,
//! and runs the server.

use std::time::Duration;

use axum::Router;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use quill_core::error::AppError;
use quill_plugin::HookPoint;

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_logging))
}

/// Serves the app until a shutdown signal, then unloads every plugin
/// within the configured grace period.
///
/// Fires `server.start` before accepting connections and `server.shutdown`
/// once the listener has drained.
pub async fn run_server(state: AppState) -> Result<(), AppError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    let hooks = state.manager.hooks().clone();
    hooks
        .execute(HookPoint::ServerStart, json!({ "addr": addr }))
        .await;

    info!(addr = %addr, "Quill server listening");

    let app = build_app(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("Shutting down");
    hooks.execute(HookPoint::ServerShutdown, json!({})).await;

    let grace = Duration::from_secs(state.config.server.shutdown_grace_seconds);
    if tokio::time::timeout(grace, state.loader.unload_all()).await.is_err() {
        warn!(grace_seconds = grace.as_secs(), "Plugin unload did not finish within grace period");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
