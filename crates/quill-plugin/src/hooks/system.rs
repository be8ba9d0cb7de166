//! Hook system facade: the surface the manager, the host and tests use.

use std::sync::Arc;
use std::time::Duration;

use super::definitions::{HookContext, HookHandle, HookPoint};
use super::dispatcher::{HookDispatcher, PipelineOutcome};
use super::registry::{HookHandler, HookRegistry};

/// Registry plus dispatcher behind one handle.
#[derive(Debug, Clone)]
pub struct HookSystem {
    registry: Arc<HookRegistry>,
    dispatcher: Arc<HookDispatcher>,
}

impl HookSystem {
    /// Creates an empty hook system without a handler timeout.
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Creates an empty hook system whose handlers are cut off after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let registry = Arc::new(HookRegistry::new());
        let dispatcher = Arc::new(HookDispatcher::new(registry.clone()).with_timeout(timeout));
        Self {
            registry,
            dispatcher,
        }
    }

    /// Registers `handler` on `event` for `owner`.
    pub async fn register(
        &self,
        event: impl Into<HookPoint>,
        handler: Arc<dyn HookHandler>,
        priority: i32,
        owner: &str,
    ) -> HookHandle {
        self.registry
            .register(event.into(), handler, priority, owner)
            .await
    }

    /// Removes one registration.
    pub async fn unregister(&self, handle: HookHandle) -> bool {
        self.registry.unregister(handle).await
    }

    /// Removes every registration owned by `owner`.
    pub async fn unregister_all(&self, owner: &str) -> usize {
        self.registry.unregister_plugin(owner).await
    }

    /// Runs the pipeline for `event` with a fresh context.
    pub async fn execute(
        &self,
        event: impl Into<HookPoint>,
        data: serde_json::Value,
    ) -> serde_json::Value {
        self.dispatcher.execute(event, data).await
    }

    /// Runs the pipeline for `ctx.event()` using the caller's context.
    pub async fn execute_with(
        &self,
        ctx: &HookContext,
        data: serde_json::Value,
    ) -> serde_json::Value {
        self.dispatcher.execute_with(ctx, data).await
    }

    /// Runs the pipeline and returns the full outcome.
    pub async fn run(&self, ctx: &HookContext, data: serde_json::Value) -> PipelineOutcome {
        self.dispatcher.run(ctx, data).await
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }
}

impl Default for HookSystem {
    fn default() -> Self {
        Self::new()
    }
}
