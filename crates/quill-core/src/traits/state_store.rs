//! Persistence interface for plugin lifecycle state.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::plugin::PluginState;

/// Durable key/value store for plugin state, keyed by plugin id.
///
/// Implementations exist for PostgreSQL (`quill-database`) and in-memory
/// use (`quill-plugin`).
#[async_trait]
pub trait PluginStateStore: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch the stored state for a plugin.
    async fn get(&self, plugin_id: &str) -> AppResult<Option<PluginState>>;

    /// Insert or replace the stored state for a plugin.
    async fn put(&self, state: &PluginState) -> AppResult<()>;

    /// Delete the stored state. Returns `true` if a row existed.
    async fn delete(&self, plugin_id: &str) -> AppResult<bool>;

    /// List every stored state.
    async fn list(&self) -> AppResult<Vec<PluginState>>;
}
