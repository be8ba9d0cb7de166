//! Plugin runtime configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Plugin runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Directory scanned for `*/plugin.toml` package manifests.
    #[serde(default = "default_plugin_directory")]
    pub directory: String,
    /// Whether to load discovered plugins on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
    /// Optional per-handler hook timeout in milliseconds.
    #[serde(default)]
    pub hook_timeout_ms: Option<u64>,
    /// Plugin ids reserved for host-core namespaces.
    #[serde(default = "default_reserved_ids")]
    pub reserved_ids: Vec<String>,
    /// Route prefixes plugins may not claim (or nest under).
    #[serde(default = "default_reserved_prefixes")]
    pub reserved_prefixes: Vec<String>,
    /// Per-plugin configuration passed to `install`, keyed by plugin id.
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl PluginConfig {
    /// Returns the configuration for a plugin, or an empty object.
    pub fn settings_for(&self, plugin_id: &str) -> serde_json::Value {
        self.settings
            .get(plugin_id)
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            auto_load: true,
            hook_timeout_ms: None,
            reserved_ids: default_reserved_ids(),
            reserved_prefixes: default_reserved_prefixes(),
            settings: HashMap::new(),
        }
    }
}

fn default_plugin_directory() -> String {
    "./plugins".to_string()
}

fn default_true() -> bool {
    true
}

fn default_reserved_ids() -> Vec<String> {
    ["core", "admin", "api", "auth", "content", "media", "system", "quill"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_reserved_prefixes() -> Vec<String> {
    ["/api/admin", "/api/health", "/api/auth", "/admin"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
