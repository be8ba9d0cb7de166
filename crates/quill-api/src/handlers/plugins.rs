//! Plugin administration handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};

use quill_core::error::AppError;
use quill_plugin::PluginSummary;
use quill_plugin::extension::ExtensionSummary;
use quill_plugin::loader::SyncReport;

use crate::dto::request::InstallRequest;
use crate::dto::response::{ApiResponse, PluginDetailResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/admin/plugins
pub async fn list_plugins(State(state): State<AppState>) -> Json<ApiResponse<Vec<PluginSummary>>> {
    Json(ApiResponse::ok(state.manager.summaries().await))
}

/// GET /api/admin/plugins/{id}
pub async fn get_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PluginDetailResponse>>> {
    let record = state
        .manager
        .get(&id)
        .await
        .ok_or_else(|| AppError::not_found(format!("Plugin '{id}' not found")))?;

    let extensions = state
        .manager
        .registry()
        .components_of(&id)
        .await
        .iter()
        .map(ExtensionSummary::from)
        .collect();

    Ok(Json(ApiResponse::ok(PluginDetailResponse {
        plugin: record.summary(),
        extensions,
    })))
}

/// POST /api/admin/plugins/{id}/install
///
/// The body is optional; `{"config": {...}}` overrides configured settings.
pub async fn install_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<PluginSummary>>> {
    let request: InstallRequest = if body.is_empty() {
        InstallRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::validation(format!("Invalid install request: {e}")))?
    };

    if state.loader.known(&id).await.is_none() {
        return Err(AppError::not_found(format!("No plugin package offers '{id}'")).into());
    }

    let record = state.loader.install_known(&id, request.config).await?;
    Ok(Json(ApiResponse::ok(record.summary())))
}

/// POST /api/admin/plugins/{id}/activate
pub async fn activate_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PluginSummary>>> {
    let record = state.manager.activate(&id).await?;
    Ok(Json(ApiResponse::ok(record.summary())))
}

/// POST /api/admin/plugins/{id}/deactivate
pub async fn deactivate_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PluginSummary>>> {
    let record = state.manager.deactivate(&id).await?;
    Ok(Json(ApiResponse::ok(record.summary())))
}

/// POST /api/admin/plugins/{id}/uninstall
pub async fn uninstall_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PluginSummary>>> {
    let record = state.manager.uninstall(&id).await?;
    Ok(Json(ApiResponse::ok(record.summary())))
}

/// POST /api/admin/plugins/{id}/reload
pub async fn reload_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PluginSummary>>> {
    let record = state.loader.reload(&id).await?;
    Ok(Json(ApiResponse::ok(record.summary())))
}

/// POST /api/admin/plugins/rescan
pub async fn rescan_plugins(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<SyncReport>>> {
    let report = state.loader.sync(state.source.as_ref()).await?;
    Ok(Json(ApiResponse::ok(report)))
}
