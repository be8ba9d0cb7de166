//! # quill-plugin
//!
//! Extensibility runtime for Quill. Provides:
//!
//! - Hook pipeline with priority ordering, cancellation and fault isolation
//! - Plugin registry of typed extension points (routes, middleware, models,
//!   services, admin pages, menu items)
//! - Static validation of plugin descriptors
//! - Lifecycle manager driving install → activate → deactivate → uninstall
//! - Loader that discovers packages and loads them in dependency order
//! - Fluent [`PluginBuilder`] for declaring plugins

pub mod api;
pub mod builder;
pub mod descriptor;
pub mod error;
pub mod extension;
pub mod graph;
pub mod hooks;
pub mod lifecycle;
pub mod loader;
pub mod manager;
pub mod prelude;
pub mod registry;
pub mod store;
pub mod traits;
pub mod validator;

pub use api::context::{PluginContext, PluginServices};
pub use builder::PluginBuilder;
pub use descriptor::{PluginDescriptor, PluginInfo};
pub use error::{
    BoxError, HookExecutionError, LifecycleError, PluginError, RegistryError, ValidationError,
    ValidationWarning,
};
pub use extension::{ExtensionKind, ExtensionPoint, PluginMiddleware};
pub use hooks::{HookContext, HookHandle, HookPoint, HookSystem};
pub use loader::{PluginCatalog, PluginLoader, PluginSource};
pub use manager::PluginManager;
pub use registry::{PluginRecord, PluginRegistry, PluginSummary};
pub use validator::{PluginValidator, ValidationResult};
