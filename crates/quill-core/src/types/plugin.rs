//! Plugin lifecycle status and its persisted form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a plugin record.
///
/// Legal moves between these states are defined by the transition table in
/// `quill-plugin`; this type only names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// Package found by a loader source, not yet validated.
    Discovered,
    /// Passed validation; install callback pending.
    Validated,
    /// Install callback completed.
    Installed,
    /// Extension points and hooks are mounted.
    Active,
    /// Deactivated; durable install side effects remain.
    Inactive,
    /// Uninstall callback completed; the record is a tombstone.
    Uninstalled,
    /// A lifecycle transition failed.
    Error,
}

impl PluginStatus {
    /// Returns the snake_case name used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Validated => "validated",
            Self::Installed => "installed",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Uninstalled => "uninstalled",
            Self::Error => "error",
        }
    }

    /// Whether the plugin currently holds durable install side effects.
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed | Self::Active | Self::Inactive)
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovered" => Ok(Self::Discovered),
            "validated" => Ok(Self::Validated),
            "installed" => Ok(Self::Installed),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "uninstalled" => Ok(Self::Uninstalled),
            "error" => Ok(Self::Error),
            other => Err(format!("Unknown plugin status '{other}'")),
        }
    }
}

/// Durable snapshot of a plugin's lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginState {
    /// Plugin identifier.
    pub plugin_id: String,
    /// Installed version.
    pub version: String,
    /// Current lifecycle status.
    pub status: PluginStatus,
    /// Configuration the plugin was installed with.
    pub config: serde_json::Value,
    /// Last lifecycle error, if any.
    pub last_error: Option<String>,
    /// When the plugin was installed.
    pub installed_at: Option<DateTime<Utc>>,
    /// When the state last changed.
    pub updated_at: DateTime<Utc>,
}
