//! Response DTOs.

use serde::{Deserialize, Serialize};

use quill_plugin::PluginSummary;
use quill_plugin::extension::ExtensionSummary;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Plugin counts.
    pub plugins: PluginCounts,
}

/// Plugin counts for the health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginCounts {
    /// Records known to the registry, including tombstones.
    pub total: usize,
    /// Active plugins.
    pub active: usize,
}

/// One plugin with its live extension points.
#[derive(Debug, Clone, Serialize)]
pub struct PluginDetailResponse {
    /// Plugin summary.
    #[serde(flatten)]
    pub plugin: PluginSummary,
    /// Extension points currently mounted for it.
    pub extensions: Vec<ExtensionSummary>,
}

/// An admin-facing item tagged with its contributing plugin.
#[derive(Debug, Clone, Serialize)]
pub struct OwnedItem<T: Serialize> {
    /// Contributing plugin.
    pub plugin_id: String,
    /// The item.
    #[serde(flatten)]
    pub item: T,
}
