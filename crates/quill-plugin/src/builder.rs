//! Fluent builder for plugin descriptors.
//!
//! ```ignore
//! let descriptor = PluginBuilder::new("seo", "1.0.0")
//!     .description("Search engine metadata")
//!     .route("/seo", router, 100)
//!     .on(HookPoint::BeforeContentSave, 50, |_ctx, _plugin, data| async move { Ok(data) })
//!     .on_activate(|plugin| async move { plugin.logger.info("ready"); Ok(()) })
//!     .build();
//! ```

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use axum::Router;
use futures::future::BoxFuture;

use crate::api::context::PluginContext;
use crate::api::events::HookSubscription;
use crate::descriptor::{Dependency, LifecycleCallback, LifecycleCallbacks, PluginDescriptor};
use crate::error::{BoxError, LifecyclePhase};
use crate::extension::{
    AdminPage, Contribution, ExtensionPoint, MenuItem, ModelDefinition, PluginMiddleware,
    RouteExtension, ServiceExtension,
};
use crate::hooks::HookContext;
use crate::hooks::definitions::HookPoint;
use crate::traits::{ClosureHandler, PluginHookHandler};

/// Builder for constructing plugin descriptors incrementally.
///
/// Every call appends; nothing is validated until the manager installs the
/// descriptor.
#[derive(Debug)]
pub struct PluginBuilder {
    descriptor: PluginDescriptor,
}

impl PluginBuilder {
    /// Creates a new builder for `id` at `version`.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            descriptor: PluginDescriptor {
                id: id.into(),
                version: version.into(),
                description: String::new(),
                author: None,
                dependencies: Vec::new(),
                contributions: Vec::new(),
                hooks: Vec::new(),
                callbacks: LifecycleCallbacks::default(),
            },
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = description.into();
        self
    }

    /// Sets the author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.descriptor.author = Some(author.into());
        self
    }

    /// Declares a dependency on any version of `id`.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.descriptor.dependencies.push(Dependency {
            id: id.into(),
            requirement: None,
        });
        self
    }

    /// Declares a dependency on `id` matching a semver requirement.
    pub fn depends_on_version(mut self, id: impl Into<String>, requirement: impl Into<String>) -> Self {
        self.descriptor.dependencies.push(Dependency {
            id: id.into(),
            requirement: Some(requirement.into()),
        });
        self
    }

    fn contribute(mut self, point: ExtensionPoint, priority: i32) -> Self {
        self.descriptor
            .contributions
            .push(Contribution { priority, point });
        self
    }

    /// Mounts `router` under `prefix`.
    pub fn route(self, prefix: impl Into<String>, router: Router, priority: i32) -> Self {
        self.contribute(
            ExtensionPoint::Route(RouteExtension {
                prefix: prefix.into(),
                router,
            }),
            priority,
        )
    }

    /// Adds request middleware.
    pub fn middleware(self, middleware: impl PluginMiddleware + 'static, priority: i32) -> Self {
        self.contribute(ExtensionPoint::Middleware(Arc::new(middleware)), priority)
    }

    /// Adds a content model.
    pub fn model(self, model: ModelDefinition, priority: i32) -> Self {
        self.contribute(ExtensionPoint::Model(model), priority)
    }

    /// Adds a named service.
    pub fn service<T>(self, name: impl Into<String>, instance: Arc<T>, priority: i32) -> Self
    where
        T: Any + Send + Sync,
    {
        self.contribute(
            ExtensionPoint::Service(ServiceExtension {
                name: name.into(),
                instance,
            }),
            priority,
        )
    }

    /// Adds an admin page.
    pub fn admin_page(self, page: AdminPage, priority: i32) -> Self {
        self.contribute(ExtensionPoint::AdminPage(page), priority)
    }

    /// Adds an admin menu item.
    pub fn menu_item(self, item: MenuItem, priority: i32) -> Self {
        self.contribute(ExtensionPoint::MenuItem(item), priority)
    }

    /// Subscribes a handler to a hook point.
    pub fn hook(
        mut self,
        event: impl Into<HookPoint>,
        priority: i32,
        handler: impl PluginHookHandler + 'static,
    ) -> Self {
        self.descriptor
            .hooks
            .push(HookSubscription::new(event, priority, Arc::new(handler)));
        self
    }

    /// Subscribes a closure to a hook point.
    pub fn on<F, Fut>(self, event: impl Into<HookPoint>, priority: i32, handler: F) -> Self
    where
        F: Fn(HookContext, PluginContext, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, BoxError>> + Send + 'static,
    {
        self.hook(event, priority, ClosureHandler::new(handler))
    }

    fn callback<F, Fut>(mut self, phase: LifecyclePhase, f: F) -> Self
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let callback: LifecycleCallback =
            Arc::new(move |ctx: PluginContext| -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(f(ctx))
            });
        *self.descriptor.callbacks.slot(phase) = Some(callback);
        self
    }

    /// Sets the install callback.
    pub fn on_install<F, Fut>(self, f: F) -> Self
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.callback(LifecyclePhase::Install, f)
    }

    /// Sets the activate callback.
    pub fn on_activate<F, Fut>(self, f: F) -> Self
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.callback(LifecyclePhase::Activate, f)
    }

    /// Sets the deactivate callback.
    pub fn on_deactivate<F, Fut>(self, f: F) -> Self
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.callback(LifecyclePhase::Deactivate, f)
    }

    /// Sets the uninstall callback.
    pub fn on_uninstall<F, Fut>(self, f: F) -> Self
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.callback(LifecyclePhase::Uninstall, f)
    }

    /// Builds the final descriptor.
    pub fn build(self) -> PluginDescriptor {
        self.descriptor
    }
}
