//! Compiled-in plugin catalog.
//!
//! Plugins are Rust code linked into the host binary; a catalog maps plugin
//! ids to factories that build fresh descriptors. Directory manifests select
//! and enable entries from it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::PluginDescriptor;

/// Builds a descriptor for one compiled-in plugin.
pub type PluginFactory = Arc<dyn Fn() -> PluginDescriptor + Send + Sync>;

/// Id → factory map of compiled-in plugins.
#[derive(Clone, Default)]
pub struct PluginCatalog {
    factories: BTreeMap<String, PluginFactory>,
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("ids", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory under `id`.
    pub fn with<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> PluginDescriptor + Send + Sync + 'static,
    {
        self.insert(id, factory);
        self
    }

    /// Adds a factory under `id`, replacing any previous one.
    pub fn insert<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> PluginDescriptor + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
    }

    /// Builds the descriptor registered under `id`.
    pub fn get(&self, id: &str) -> Option<PluginDescriptor> {
        self.factories.get(id).map(|factory| factory())
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds every registered descriptor, sorted by id.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.factories.values().map(|factory| factory()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
