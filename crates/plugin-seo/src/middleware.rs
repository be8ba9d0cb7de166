//! Response middleware for the SEO plugin.

use async_trait::async_trait;
use axum::http::HeaderValue;
use axum::response::Response;

use quill_plugin::PluginMiddleware;

/// Header stamped on every response.
pub const ROBOTS_HEADER: &str = "x-robots-tag";

/// Stamps `X-Robots-Tag` unless a handler already set it.
#[derive(Debug, Clone)]
pub struct RobotsHeader {
    value: HeaderValue,
}

impl RobotsHeader {
    /// Create the middleware with a static directive such as `index, follow`.
    pub fn new(directive: &'static str) -> Self {
        Self {
            value: HeaderValue::from_static(directive),
        }
    }
}

#[async_trait]
impl PluginMiddleware for RobotsHeader {
    async fn after(&self, response: &mut Response) {
        response
            .headers_mut()
            .entry(ROBOTS_HEADER)
            .or_insert_with(|| self.value.clone());
    }
}
