//! Plugin-facing handler traits.
//!
//! Plugin authors implement [`PluginHookHandler`] (or use [`ClosureHandler`]);
//! the manager binds each one to its plugin's [`PluginContext`] with
//! [`ScopedHandlerAdapter`] when the plugin is activated.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::context::PluginContext;
use crate::error::BoxError;
use crate::hooks::definitions::HookContext;
use crate::hooks::registry::HookHandler;

/// Hook handler trait for plugin code.
///
/// Receives the per-execution hook context, the plugin's own capability
/// context, and the pipeline value; returns the value for the next handler.
#[async_trait]
pub trait PluginHookHandler: Send + Sync + std::fmt::Debug {
    /// Handles the hook invocation.
    async fn handle(
        &self,
        ctx: &HookContext,
        plugin: &PluginContext,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, BoxError>;
}

/// Wrapper that adapts a `PluginHookHandler` to the raw `HookHandler` trait.
#[derive(Debug)]
pub struct ScopedHandlerAdapter {
    /// The inner handler.
    inner: Arc<dyn PluginHookHandler>,
    /// Context of the owning plugin.
    context: PluginContext,
}

impl ScopedHandlerAdapter {
    /// Creates a new adapter binding `handler` to `context`.
    pub fn new(handler: Arc<dyn PluginHookHandler>, context: PluginContext) -> Self {
        Self {
            inner: handler,
            context,
        }
    }

    /// Wraps a plugin handler into an `Arc<dyn HookHandler>`.
    pub fn wrap(handler: Arc<dyn PluginHookHandler>, context: PluginContext) -> Arc<dyn HookHandler> {
        Arc::new(Self::new(handler, context))
    }
}

#[async_trait]
impl HookHandler for ScopedHandlerAdapter {
    async fn handle(
        &self,
        ctx: &HookContext,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, BoxError> {
        self.inner.handle(ctx, &self.context, data).await
    }
}

type BoxedHandlerFn = Arc<
    dyn Fn(
            HookContext,
            PluginContext,
            serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, BoxError>> + Send>>
        + Send
        + Sync,
>;

/// A closure-based hook handler for quick handler creation.
#[derive(Clone)]
pub struct ClosureHandler {
    /// Handler function.
    handler: BoxedHandlerFn,
}

impl std::fmt::Debug for ClosureHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureHandler")
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureHandler {
    /// Creates a new closure-based handler.
    ///
    /// The closure receives owned clones of both contexts; clones of the hook
    /// context share its cancellation flag.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(HookContext, PluginContext, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, BoxError>> + Send + 'static,
    {
        let handler: BoxedHandlerFn = Arc::new(
            move |ctx: HookContext,
                  plugin: PluginContext,
                  data: serde_json::Value|
                  -> Pin<Box<dyn Future<Output = Result<serde_json::Value, BoxError>> + Send>> {
                Box::pin(handler(ctx, plugin, data))
            },
        );
        Self { handler }
    }
}

#[async_trait]
impl PluginHookHandler for ClosureHandler {
    async fn handle(
        &self,
        ctx: &HookContext,
        plugin: &PluginContext,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, BoxError> {
        (self.handler)(ctx.clone(), plugin.clone(), data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::context::PluginServices;
    use crate::hooks::{HookPoint, HookSystem};
    use serde_json::json;

    #[tokio::test]
    async fn test_adapter_passes_owning_plugin_context() {
        let hooks = HookSystem::new();
        let context = PluginContext::new(
            "greeter",
            json!({ "greeting": "hello" }),
            PluginServices::in_memory(hooks.clone()),
        );
        let handler = ClosureHandler::new(|_ctx, plugin, mut data| async move {
            data["greeting"] = plugin.setting("greeting").cloned().unwrap_or_default();
            data["by"] = json!(plugin.plugin_id());
            Ok(data)
        });

        hooks
            .register(
                HookPoint::AdminMenu,
                ScopedHandlerAdapter::wrap(Arc::new(handler), context),
                0,
                "greeter",
            )
            .await;

        let out = hooks.execute(HookPoint::AdminMenu, json!({})).await;
        assert_eq!(out, json!({ "greeting": "hello", "by": "greeter" }));
    }

    #[tokio::test]
    async fn test_closure_cancel_reaches_pipeline() {
        let hooks = HookSystem::new();
        let context = PluginContext::new("guard", json!({}), PluginServices::in_memory(hooks.clone()));
        let veto = ClosureHandler::new(|ctx, _plugin, data| async move {
            ctx.cancel();
            Ok(data)
        });
        hooks
            .register("x", ScopedHandlerAdapter::wrap(Arc::new(veto), context), 0, "guard")
            .await;

        let ctx = HookContext::new("x");
        hooks.execute_with(&ctx, json!(null)).await;
        assert!(ctx.is_cancelled());
    }
}
