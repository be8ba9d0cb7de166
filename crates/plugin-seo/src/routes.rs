//! HTTP routes mounted under `/seo` while the plugin is active.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::service::SlugService;

/// Query for `GET /slug`.
#[derive(Debug, Deserialize)]
pub struct SlugQuery {
    /// Text to slugify.
    pub text: String,
}

/// Builds the plugin router. Paths are relative to the mount prefix.
pub fn router(slugs: Arc<SlugService>) -> Router {
    Router::new()
        .route("/robots.txt", get(robots))
        .route("/slug", get(slug))
        .with_state(slugs)
}

/// GET /seo/robots.txt
async fn robots() -> &'static str {
    "User-agent: *\nAllow: /\n"
}

/// GET /seo/slug?text=...
async fn slug(
    State(slugs): State<Arc<SlugService>>,
    Query(query): Query<SlugQuery>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "slug": slugs.slugify(&query.text) }))
}
