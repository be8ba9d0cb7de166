//! Default implementations of the plugin service traits.
//!
//! These back database-less hosts and tests. A production host supplies its
//! own facades through [`PluginServices`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::context::{
    PluginAuthService, PluginContentService, PluginMediaService, PluginServices, PluginStorage,
};
use crate::hooks::{HookContext, HookPoint, HookSystem};

/// Storage backend on a concurrent in-memory map.
#[derive(Debug, Default)]
pub struct MemoryPluginStorage {
    entries: DashMap<String, serde_json::Value>,
}

impl MemoryPluginStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys across all plugins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PluginStorage for MemoryPluginStorage {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), String> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, String> {
        Ok(self.entries.remove(key).is_some())
    }
}

/// Auth facade that grants every permission to a fixed set of users.
#[derive(Debug, Default)]
pub struct StaticAuthService {
    admins: HashSet<Uuid>,
}

impl StaticAuthService {
    /// Grants all permissions to `admins`; everyone else is denied.
    pub fn new(admins: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PluginAuthService for StaticAuthService {
    async fn has_permission(&self, user_id: Option<Uuid>, _permission: &str) -> bool {
        user_id.is_some_and(|id| self.admins.contains(&id))
    }
}

/// In-memory content store that runs the content hook points.
///
/// - `save` pipes the entry through `content.before_save`, stores the result,
///   then fires `content.after_save`.
/// - `delete` fires `content.before_delete`; a handler that cancels vetoes it.
#[derive(Debug)]
pub struct MemoryContentService {
    hooks: HookSystem,
    entries: DashMap<(String, String), serde_json::Value>,
}

impl MemoryContentService {
    /// Creates an empty store bound to `hooks`.
    pub fn new(hooks: HookSystem) -> Self {
        Self {
            hooks,
            entries: DashMap::new(),
        }
    }
}

#[async_trait]
impl PluginContentService for MemoryContentService {
    async fn find(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, String> {
        Ok(self
            .entries
            .get(&(collection.to_string(), id.to_string()))
            .map(|e| e.value().clone()))
    }

    async fn save(
        &self,
        collection: &str,
        id: &str,
        entry: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        let metadata = json!({ "collection": collection, "id": id });

        let ctx = HookContext::new(HookPoint::BeforeContentSave).with_metadata(metadata.clone());
        let entry = self.hooks.execute_with(&ctx, entry).await;

        self.entries
            .insert((collection.to_string(), id.to_string()), entry.clone());
        debug!(collection, id, "Content entry saved");

        let ctx = HookContext::new(HookPoint::AfterContentSave).with_metadata(metadata);
        self.hooks.execute_with(&ctx, entry.clone()).await;

        Ok(entry)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, String> {
        let key = (collection.to_string(), id.to_string());
        let Some(existing) = self.entries.get(&key).map(|e| e.value().clone()) else {
            return Ok(false);
        };

        let ctx = HookContext::new(HookPoint::BeforeContentDelete)
            .with_metadata(json!({ "collection": collection, "id": id }));
        self.hooks.execute_with(&ctx, existing).await;

        if ctx.is_cancelled() {
            debug!(collection, id, "Content deletion vetoed by plugin");
            return Ok(false);
        }

        Ok(self.entries.remove(&key).is_some())
    }
}

/// Media facade that builds URLs under a fixed base.
#[derive(Debug, Clone)]
pub struct BaseUrlMediaService {
    base_url: String,
}

impl BaseUrlMediaService {
    /// Creates a facade serving media from `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PluginMediaService for BaseUrlMediaService {
    async fn url_for(&self, media_id: &str) -> Result<Option<String>, String> {
        if media_id.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("{}/{}", self.base_url, media_id)))
    }
}

impl PluginServices {
    /// Bundles explicit facades.
    pub fn new(
        auth: Arc<dyn PluginAuthService>,
        content: Arc<dyn PluginContentService>,
        media: Arc<dyn PluginMediaService>,
        storage: Arc<dyn PluginStorage>,
    ) -> Self {
        Self {
            auth,
            content,
            media,
            storage,
        }
    }

    /// In-memory facades; content saves run through `hooks`.
    pub fn in_memory(hooks: HookSystem) -> Self {
        Self::new(
            Arc::new(StaticAuthService::default()),
            Arc::new(MemoryContentService::new(hooks)),
            Arc::new(BaseUrlMediaService::new("/media")),
            Arc::new(MemoryPluginStorage::new()),
        )
    }
}
