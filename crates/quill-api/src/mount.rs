//! Dynamic dispatch of unmatched requests to active plugin routers.
//!
//! The route table is read from the registry on every request, so plugins
//! mount and unmount without rebuilding the host router.

use axum::extract::{Request, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tracing::debug;

use quill_core::error::AppError;
use quill_plugin::extension::RouteExtension;
use quill_plugin::{ExtensionKind, ExtensionPoint};

use crate::error::ApiError;
use crate::state::AppState;

/// Whether `path` is `prefix` or lies under it on a segment boundary.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Rewrites the request URI to be relative to `prefix`, keeping the query.
fn strip_prefix(mut request: Request, prefix: &str) -> Result<Request, AppError> {
    let uri = request.uri();
    let rest = &uri.path()[prefix.len()..];
    let rest = if rest.is_empty() { "/" } else { rest };
    let path_and_query = match uri.query() {
        Some(query) => format!("{rest}?{query}"),
        None => rest.to_string(),
    };

    let stripped: Uri = path_and_query
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid request path: {e}")))?;
    *request.uri_mut() = stripped;
    Ok(request)
}

/// Host router fallback: forwards to the active plugin whose prefix is the
/// longest match for the request path.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    let routes = state
        .manager
        .registry()
        .get_components(ExtensionKind::Route)
        .await;

    let best: Option<(String, RouteExtension)> = routes
        .into_iter()
        .filter_map(|record| match record.point {
            ExtensionPoint::Route(route) => Some((record.owner, route)),
            _ => None,
        })
        .filter(|(_, route)| matches_prefix(&path, &route.prefix))
        .max_by_key(|(_, route)| route.prefix.len());

    let Some((owner, route)) = best else {
        return ApiError(AppError::not_found(format!("No route matches '{path}'"))).into_response();
    };

    debug!(plugin_id = %owner, prefix = %route.prefix, path = %path, "Dispatching to plugin router");

    let request = match strip_prefix(request, &route.prefix) {
        Ok(request) => request,
        Err(e) => return ApiError(e).into_response(),
    };

    match route.router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_matches_prefix_on_segment_boundary() {
        assert!(matches_prefix("/seo", "/seo"));
        assert!(matches_prefix("/seo/robots.txt", "/seo"));
        assert!(!matches_prefix("/seotools", "/seo"));
        assert!(!matches_prefix("/blog", "/seo"));
    }

    #[test]
    fn test_strip_prefix_keeps_query() {
        let request = Request::builder()
            .uri("/seo/slug?text=a")
            .body(Body::empty())
            .unwrap();
        let stripped = strip_prefix(request, "/seo").unwrap();
        assert_eq!(stripped.uri().path(), "/slug");
        assert_eq!(stripped.uri().query(), Some("text=a"));

        let request = Request::builder().uri("/seo").body(Body::empty()).unwrap();
        assert_eq!(strip_prefix(request, "/seo").unwrap().uri().path(), "/");
    }
}
