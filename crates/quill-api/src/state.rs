//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use quill_core::config::AppConfig;
use quill_plugin::{PluginLoader, PluginManager, PluginSource};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Plugin lifecycle manager
    pub manager: Arc<PluginManager>,
    /// Bulk loader driving the manager
    pub loader: Arc<PluginLoader>,
    /// Where rescans discover plugins
    pub source: Arc<dyn PluginSource>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Wires the loader around `manager`.
    pub fn new(
        config: AppConfig,
        manager: Arc<PluginManager>,
        source: Arc<dyn PluginSource>,
    ) -> Self {
        let loader = Arc::new(PluginLoader::new(Arc::clone(&manager), &config.plugins));
        Self {
            config: Arc::new(config),
            manager,
            loader,
            source,
            started_at: Instant::now(),
        }
    }
}
