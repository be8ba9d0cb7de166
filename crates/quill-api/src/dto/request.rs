//! Request DTOs.

use serde::Deserialize;

/// Body of `POST /api/admin/plugins/{id}/install`. Optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallRequest {
    /// Configuration passed to the install callback. Falls back to
    /// `plugins.settings.<id>` when omitted.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}
