//! Plugin context: the capability bundle handed to every lifecycle callback
//! and hook handler.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

/// Context passed to plugins providing access to Quill services.
///
/// Everything a plugin may touch goes through this value: its own config,
/// a key-value store scoped to the plugin, a logger stamped with the plugin
/// id, and the host's auth/content/media facades.
#[derive(Clone)]
pub struct PluginContext {
    /// Owning plugin.
    plugin_id: Arc<str>,
    /// Config passed to `install`.
    config: Arc<serde_json::Value>,
    /// Storage scoped to this plugin.
    pub storage: Arc<dyn PluginStorage>,
    /// Logger stamped with this plugin's id.
    pub logger: PluginLogger,
    /// Host facades.
    pub services: PluginServices,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.plugin_id)
            .field("config", &self.config)
            .finish()
    }
}

impl PluginContext {
    /// Builds the context for `plugin_id`, scoping the shared storage backend.
    pub fn new(plugin_id: &str, config: serde_json::Value, services: PluginServices) -> Self {
        let storage: Arc<dyn PluginStorage> =
            Arc::new(ScopedStorage::new(services.storage.clone(), plugin_id));
        Self {
            plugin_id: Arc::from(plugin_id),
            config: Arc::new(config),
            storage,
            logger: PluginLogger::new(plugin_id),
            services,
        }
    }

    /// The owning plugin's id.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// The plugin's configuration.
    pub fn config(&self) -> &serde_json::Value {
        &self.config
    }

    /// Looks up one configuration value by key.
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.config.get(key)
    }
}

/// Key-value storage available to plugins.
#[async_trait]
pub trait PluginStorage: Send + Sync {
    /// Gets a value.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;
    /// Sets a value.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), String>;
    /// Deletes a value. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> Result<bool, String>;
}

/// Storage view that prefixes every key with `plugin:{id}:`.
pub struct ScopedStorage {
    inner: Arc<dyn PluginStorage>,
    prefix: String,
}

impl ScopedStorage {
    /// Scopes `inner` to one plugin.
    pub fn new(inner: Arc<dyn PluginStorage>, plugin_id: &str) -> Self {
        Self {
            inner,
            prefix: format!("plugin:{}:", plugin_id),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl PluginStorage for ScopedStorage {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.get(&self.key(key)).await
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), String> {
        self.inner.set(&self.key(key), value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, String> {
        self.inner.delete(&self.key(key)).await
    }
}

/// Logger handed to plugins. Every event carries the plugin id.
#[derive(Debug, Clone)]
pub struct PluginLogger {
    plugin_id: Arc<str>,
}

impl PluginLogger {
    /// Creates a logger for `plugin_id`.
    pub fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: Arc::from(plugin_id),
        }
    }

    /// Logs at debug level.
    pub fn debug(&self, message: &str) {
        tracing::debug!(plugin_id = %self.plugin_id, "{}", message);
    }

    /// Logs at info level.
    pub fn info(&self, message: &str) {
        tracing::info!(plugin_id = %self.plugin_id, "{}", message);
    }

    /// Logs at warn level.
    pub fn warn(&self, message: &str) {
        tracing::warn!(plugin_id = %self.plugin_id, "{}", message);
    }

    /// Logs at error level.
    pub fn error(&self, message: &str) {
        tracing::error!(plugin_id = %self.plugin_id, "{}", message);
    }
}

/// Authorization checks available to plugins.
#[async_trait]
pub trait PluginAuthService: Send + Sync {
    /// Whether `user_id` holds `permission`. Anonymous callers pass `None`.
    async fn has_permission(&self, user_id: Option<Uuid>, permission: &str) -> bool;
}

/// Content operations available to plugins.
#[async_trait]
pub trait PluginContentService: Send + Sync {
    /// Loads one entry.
    async fn find(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, String>;
    /// Creates or replaces an entry and returns what was stored.
    async fn save(
        &self,
        collection: &str,
        id: &str,
        entry: serde_json::Value,
    ) -> Result<serde_json::Value, String>;
    /// Deletes an entry. Returns `false` if it did not exist or deletion was vetoed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, String>;
}

/// Media lookups available to plugins.
#[async_trait]
pub trait PluginMediaService: Send + Sync {
    /// Resolves a public URL for a media asset.
    async fn url_for(&self, media_id: &str) -> Result<Option<String>, String>;
}

/// Host facades shared by all plugin contexts.
#[derive(Clone)]
pub struct PluginServices {
    /// Authorization.
    pub auth: Arc<dyn PluginAuthService>,
    /// Content access.
    pub content: Arc<dyn PluginContentService>,
    /// Media access.
    pub media: Arc<dyn PluginMediaService>,
    /// Shared storage backend; each context sees a scoped view.
    pub storage: Arc<dyn PluginStorage>,
}

impl std::fmt::Debug for PluginServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginServices").finish()
    }
}
