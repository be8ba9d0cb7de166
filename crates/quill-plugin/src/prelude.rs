//! Prelude for plugin authors.

pub use async_trait::async_trait;

pub use crate::api::context::{
    PluginAuthService, PluginContentService, PluginContext, PluginLogger, PluginMediaService,
    PluginStorage,
};
pub use crate::api::events::HookSubscription;
pub use crate::builder::PluginBuilder;
pub use crate::descriptor::PluginDescriptor;
pub use crate::error::BoxError;
pub use crate::extension::{AdminPage, MenuItem, ModelDefinition, ModelField, PluginMiddleware};
pub use crate::hooks::{HookContext, HookPoint};
pub use crate::traits::PluginHookHandler;
