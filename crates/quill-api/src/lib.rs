//! # quill-api
//!
//! HTTP host for Quill built on Axum.
//!
//! Provides the plugin administration endpoints, mounts the routes of
//! active plugins under their declared prefixes, runs active plugin
//! middleware around every request, and maps errors to JSON bodies.

pub mod app;
pub mod builtin;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod mount;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
