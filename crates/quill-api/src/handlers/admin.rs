//! Admin UI composition from plugin contributions.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::Value;

use quill_plugin::extension::{AdminPage, ExtensionPointRecord, ModelDefinition};
use quill_plugin::{ExtensionKind, ExtensionPoint, HookPoint};

use crate::dto::response::{ApiResponse, OwnedItem};
use crate::state::AppState;

fn owned<T: Serialize>(record: &ExtensionPointRecord, item: T) -> OwnedItem<T> {
    OwnedItem {
        plugin_id: record.owner.clone(),
        item,
    }
}

/// GET /api/admin/menu
///
/// Menu items of active plugins in priority order, piped through `admin.menu`.
pub async fn menu(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let items: Vec<Value> = state
        .manager
        .registry()
        .get_components(ExtensionKind::MenuItem)
        .await
        .iter()
        .filter_map(|record| match &record.point {
            ExtensionPoint::MenuItem(item) => serde_json::to_value(owned(record, item)).ok(),
            _ => None,
        })
        .collect();

    let menu = state
        .manager
        .hooks()
        .execute(HookPoint::AdminMenu, Value::Array(items))
        .await;

    Json(ApiResponse::ok(menu))
}

/// GET /api/admin/pages
pub async fn pages(State(state): State<AppState>) -> Json<ApiResponse<Vec<OwnedItem<AdminPage>>>> {
    let pages = state
        .manager
        .registry()
        .get_components(ExtensionKind::AdminPage)
        .await
        .iter()
        .filter_map(|record| match &record.point {
            ExtensionPoint::AdminPage(page) => Some(owned(record, page.clone())),
            _ => None,
        })
        .collect();

    Json(ApiResponse::ok(pages))
}

/// GET /api/admin/models
pub async fn models(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<OwnedItem<ModelDefinition>>>> {
    let models = state
        .manager
        .registry()
        .get_components(ExtensionKind::Model)
        .await
        .iter()
        .filter_map(|record| match &record.point {
            ExtensionPoint::Model(model) => Some(owned(record, model.clone())),
            _ => None,
        })
        .collect();

    Json(ApiResponse::ok(models))
}
