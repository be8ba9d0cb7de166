//! Plugins compiled into the host.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use quill_core::config::PluginConfig;
use quill_plugin::loader::{DirectorySource, StaticSource};
use quill_plugin::{PluginCatalog, PluginSource};

/// Factories for every plugin compiled into this binary.
pub fn builtin_catalog() -> PluginCatalog {
    PluginCatalog::new().with(plugin_seo::PLUGIN_ID, plugin_seo::descriptor)
}

/// The discovery source for this host.
///
/// When `plugins.directory` exists, only packages with a manifest there are
/// offered; otherwise every built-in plugin is.
pub fn plugin_source(config: &PluginConfig) -> Arc<dyn PluginSource> {
    let catalog = builtin_catalog();
    if Path::new(&config.directory).is_dir() {
        info!(directory = %config.directory, "Discovering plugins from directory");
        Arc::new(DirectorySource::new(&config.directory, catalog))
    } else {
        info!(
            directory = %config.directory,
            count = catalog.len(),
            "Plugin directory not found, offering built-in plugins"
        );
        Arc::new(StaticSource::from_catalog(&catalog))
    }
}
