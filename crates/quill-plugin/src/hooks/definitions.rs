//! Hook point names, the per-execution hook context, and registration handles.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named moment at which the host runs a hook pipeline.
///
/// The well-known points are fired by the host and the plugin manager;
/// plugins may define their own with [`HookPoint::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum HookPoint {
    // ── Host lifecycle ──
    /// Fired once the HTTP server is about to accept connections.
    ServerStart,
    /// Fired when the server begins graceful shutdown.
    ServerShutdown,

    // ── Plugin lifecycle ──
    /// Fired after a plugin becomes Active. Data: `{"plugin_id": ..}`.
    PluginActivated,
    /// Fired after a plugin becomes Inactive. Data: `{"plugin_id": ..}`.
    PluginDeactivated,

    // ── Content ──
    /// Fired before a content entry is persisted. Handlers may rewrite it.
    BeforeContentSave,
    /// Fired after a content entry is persisted.
    AfterContentSave,
    /// Fired before a content entry is deleted. Handlers may cancel.
    BeforeContentDelete,

    // ── Admin ──
    /// Pipeline over the rendered admin menu (a JSON array of items).
    AdminMenu,

    /// Any plugin-defined event name.
    Custom(String),
}

impl HookPoint {
    /// Returns the canonical dotted name of this hook point.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ServerStart => "server.start",
            Self::ServerShutdown => "server.shutdown",
            Self::PluginActivated => "plugin.activated",
            Self::PluginDeactivated => "plugin.deactivated",
            Self::BeforeContentSave => "content.before_save",
            Self::AfterContentSave => "content.after_save",
            Self::BeforeContentDelete => "content.before_delete",
            Self::AdminMenu => "admin.menu",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HookPoint {
    fn from(name: &str) -> Self {
        match name {
            "server.start" => Self::ServerStart,
            "server.shutdown" => Self::ServerShutdown,
            "plugin.activated" => Self::PluginActivated,
            "plugin.deactivated" => Self::PluginDeactivated,
            "content.before_save" => Self::BeforeContentSave,
            "content.after_save" => Self::AfterContentSave,
            "content.before_delete" => Self::BeforeContentDelete,
            "admin.menu" => Self::AdminMenu,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for HookPoint {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<HookPoint> for String {
    fn from(point: HookPoint) -> Self {
        point.as_str().to_string()
    }
}

impl FromStr for HookPoint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Opaque identifier of one hook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HookHandle(pub(crate) u64);

impl HookHandle {
    /// Returns the registration sequence number backing this handle.
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook#{}", self.0)
    }
}

/// Per-execution context shared by every handler in one pipeline run.
///
/// Cloning is cheap and clones share the cancellation flag, so a handler
/// that calls [`HookContext::cancel`] stops the pipeline it belongs to.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// The hook point being executed.
    event: HookPoint,
    /// Set by a handler to skip the remaining handlers.
    cancelled: Arc<AtomicBool>,
    /// User who triggered the action, if any.
    user_id: Option<Uuid>,
    /// Free-form caller metadata (request path, content collection, ...).
    metadata: serde_json::Value,
}

impl HookContext {
    /// Creates a fresh context for one execution of `event`.
    pub fn new(event: impl Into<HookPoint>) -> Self {
        Self {
            event: event.into(),
            cancelled: Arc::new(AtomicBool::new(false)),
            user_id: None,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Sets the triggering user.
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets caller metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// The hook point being executed.
    pub fn event(&self) -> &HookPoint {
        &self.event
    }

    /// The triggering user, if any.
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    /// Caller metadata.
    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    /// Stops the pipeline after the calling handler returns.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether a handler has cancelled this execution.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
