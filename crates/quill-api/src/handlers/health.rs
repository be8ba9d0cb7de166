//! Health check handler.

use axum::Json;
use axum::extract::State;

use quill_core::types::PluginStatus;

use crate::dto::response::{ApiResponse, HealthResponse, PluginCounts};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let records = state.manager.list().await;
    let active = records
        .iter()
        .filter(|r| r.status == PluginStatus::Active)
        .count();

    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        plugins: PluginCounts {
            total: records.len(),
            active,
        },
    }))
}
