//! SEO plugin for Quill.
//!
//! Compiled into the host and declared with the plugin builder. While
//! active it contributes:
//!
//! - `/seo` routes (`robots.txt`, slug preview)
//! - a middleware stamping `X-Robots-Tag` on every response
//! - the `seo_meta` content model and the `seo.slugs` service
//! - an admin page and menu entry
//! - a `content.before_save` hook that fills in missing slugs

pub mod hooks;
pub mod middleware;
pub mod plugin;
pub mod routes;
pub mod service;

pub use plugin::{PLUGIN_ID, PLUGIN_VERSION, descriptor};
pub use service::SlugService;
