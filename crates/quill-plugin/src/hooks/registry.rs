//! Hook registry: handlers registered by hook point with priority ordering.
//!
//! Within one hook point, handlers are kept sorted by `(priority, sequence)`:
//! lower priority runs first, and equal priorities run in registration order.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::definitions::{HookContext, HookHandle, HookPoint};
use crate::error::BoxError;

/// Trait for hook handler implementations.
///
/// A handler receives the pipeline value produced by the previous handler
/// and returns the value for the next one.
#[async_trait]
pub trait HookHandler: Send + Sync + std::fmt::Debug {
    /// Handles one hook invocation.
    async fn handle(
        &self,
        ctx: &HookContext,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, BoxError>;
}

/// One registered handler.
#[derive(Debug, Clone)]
pub struct HookRegistration {
    /// Handle returned to the registrant.
    pub handle: HookHandle,
    /// Hook point name.
    pub event: HookPoint,
    /// The handler.
    pub handler: Arc<dyn HookHandler>,
    /// Priority (lower = earlier execution).
    pub priority: i32,
    /// Plugin that registered this handler.
    pub owner: String,
}

impl HookRegistration {
    /// Registration sequence number (tie-break for equal priorities).
    pub fn sequence(&self) -> u64 {
        self.handle.0
    }
}

/// Registry of hook handlers organized by hook point.
#[derive(Debug)]
pub struct HookRegistry {
    /// Hook point name → handlers sorted by (priority, sequence).
    handlers: RwLock<HashMap<String, Vec<HookRegistration>>>,
    /// Next registration sequence number.
    sequence: AtomicU64,
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(1),
        }
    }

    /// Registers a handler for a hook point and returns its handle.
    pub async fn register(
        &self,
        event: HookPoint,
        handler: Arc<dyn HookHandler>,
        priority: i32,
        owner: &str,
    ) -> HookHandle {
        let event = HookPoint::from(event.as_str());
        let handle = HookHandle(self.sequence.fetch_add(1, Ordering::SeqCst));

        let mut handlers = self.handlers.write().await;
        let entries = handlers.entry(event.as_str().to_string()).or_default();

        entries.push(HookRegistration {
            handle,
            event: event.clone(),
            handler,
            priority,
            owner: owner.to_string(),
        });

        // Stable: equal priorities keep registration order.
        entries.sort_by_key(|e| (e.priority, e.sequence()));

        info!(
            hook = %event,
            plugin_id = %owner,
            priority = priority,
            handle = %handle,
            "Hook handler registered"
        );

        handle
    }

    /// Removes one registration. Returns `true` if it existed.
    pub async fn unregister(&self, handle: HookHandle) -> bool {
        let mut handlers = self.handlers.write().await;
        let mut removed = false;

        for entries in handlers.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.handle != handle);
            removed |= entries.len() != before;
        }
        handlers.retain(|_, entries| !entries.is_empty());

        debug!(handle = %handle, removed, "Hook handler unregistered");
        removed
    }

    /// Unregisters all handlers owned by a plugin. Returns the count removed.
    pub async fn unregister_plugin(&self, owner: &str) -> usize {
        let mut handlers = self.handlers.write().await;
        let mut removed = 0;

        for entries in handlers.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.owner != owner);
            removed += before - entries.len();
        }

        // Remove empty hook entries
        handlers.retain(|_, entries| !entries.is_empty());

        info!(plugin_id = %owner, removed, "All hooks unregistered for plugin");
        removed
    }

    /// Returns a snapshot of the handlers for a hook point, in execution order.
    pub async fn get_handlers(&self, event: &HookPoint) -> Vec<HookRegistration> {
        let handlers = self.handlers.read().await;
        handlers.get(event.as_str()).cloned().unwrap_or_default()
    }

    /// Returns the number of handlers registered for a hook point.
    pub async fn handler_count(&self, event: &HookPoint) -> usize {
        let handlers = self.handlers.read().await;
        handlers.get(event.as_str()).map(Vec::len).unwrap_or(0)
    }

    /// Returns the number of handlers owned by a plugin across all hook points.
    pub async fn count_for_owner(&self, owner: &str) -> usize {
        let handlers = self.handlers.read().await;
        handlers
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|e| e.owner == owner)
            .count()
    }

    /// Returns all hook points that currently have handlers.
    pub async fn registered_hooks(&self) -> Vec<HookPoint> {
        let handlers = self.handlers.read().await;
        handlers.keys().map(|k| HookPoint::from(k.as_str())).collect()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
