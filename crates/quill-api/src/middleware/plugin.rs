//! Runs middleware contributed by active plugins around every request.
//!
//! `before` hooks run in ascending priority order; the first one to return
//! a response short-circuits the request. `after` hooks run in reverse
//! order over every middleware whose `before` ran to completion.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use quill_plugin::{ExtensionKind, ExtensionPoint, PluginMiddleware};

use crate::state::AppState;

/// Axum middleware function wrapping the plugin middleware chain.
pub async fn plugin_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let chain: Vec<(String, Arc<dyn PluginMiddleware>)> = state
        .manager
        .registry()
        .get_components(ExtensionKind::Middleware)
        .await
        .into_iter()
        .filter_map(|record| match record.point {
            ExtensionPoint::Middleware(mw) => Some((record.owner, mw)),
            _ => None,
        })
        .collect();

    if chain.is_empty() {
        return next.run(request).await;
    }

    for (index, (owner, mw)) in chain.iter().enumerate() {
        if let Some(mut response) = mw.before(&mut request).await {
            debug!(plugin_id = %owner, "Plugin middleware short-circuited request");
            for (_, entered) in chain[..index].iter().rev() {
                entered.after(&mut response).await;
            }
            return response;
        }
    }

    let mut response = next.run(request).await;
    for (_, mw) in chain.iter().rev() {
        mw.after(&mut response).await;
    }
    response
}
