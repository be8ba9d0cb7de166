//! In-memory plugin state store.

use async_trait::async_trait;
use dashmap::DashMap;

use quill_core::result::AppResult;
use quill_core::traits::PluginStateStore;
use quill_core::types::PluginState;

/// `PluginStateStore` backed by a concurrent map. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: DashMap<String, PluginState>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginStateStore for MemoryStateStore {
    async fn get(&self, plugin_id: &str) -> AppResult<Option<PluginState>> {
        Ok(self.states.get(plugin_id).map(|s| s.value().clone()))
    }

    async fn put(&self, state: &PluginState) -> AppResult<()> {
        self.states.insert(state.plugin_id.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, plugin_id: &str) -> AppResult<bool> {
        Ok(self.states.remove(plugin_id).is_some())
    }

    async fn list(&self) -> AppResult<Vec<PluginState>> {
        let mut states: Vec<PluginState> = self.states.iter().map(|s| s.value().clone()).collect();
        states.sort_by(|a, b| a.plugin_id.cmp(&b.plugin_id));
        Ok(states)
    }
}
