//! Plugin descriptors: immutable, fully assembled plugin definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::api::context::PluginContext;
use crate::api::events::HookSubscription;
use crate::builder::PluginBuilder;
use crate::error::{BoxError, LifecyclePhase};
use crate::extension::{Contribution, ExtensionKind};

/// A lifecycle callback. Receives the plugin's capability context.
pub type LifecycleCallback =
    Arc<dyn Fn(PluginContext) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// The four optional lifecycle callbacks.
#[derive(Clone, Default)]
pub struct LifecycleCallbacks {
    pub(crate) install: Option<LifecycleCallback>,
    pub(crate) activate: Option<LifecycleCallback>,
    pub(crate) deactivate: Option<LifecycleCallback>,
    pub(crate) uninstall: Option<LifecycleCallback>,
}

impl LifecycleCallbacks {
    /// Returns the callback for `phase`, if set.
    pub fn get(&self, phase: LifecyclePhase) -> Option<&LifecycleCallback> {
        match phase {
            LifecyclePhase::Install => self.install.as_ref(),
            LifecyclePhase::Activate => self.activate.as_ref(),
            LifecyclePhase::Deactivate => self.deactivate.as_ref(),
            LifecyclePhase::Uninstall => self.uninstall.as_ref(),
        }
    }

    pub(crate) fn slot(&mut self, phase: LifecyclePhase) -> &mut Option<LifecycleCallback> {
        match phase {
            LifecyclePhase::Install => &mut self.install,
            LifecyclePhase::Activate => &mut self.activate,
            LifecyclePhase::Deactivate => &mut self.deactivate,
            LifecyclePhase::Uninstall => &mut self.uninstall,
        }
    }
}

impl fmt::Debug for LifecycleCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCallbacks")
            .field("install", &self.install.is_some())
            .field("activate", &self.activate.is_some())
            .field("deactivate", &self.deactivate.is_some())
            .field("uninstall", &self.uninstall.is_some())
            .finish()
    }
}

/// A declared dependency on another plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Dependency plugin id.
    pub id: String,
    /// Semver requirement, e.g. `^1.2`. `None` accepts any version.
    pub requirement: Option<String>,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.requirement {
            Some(req) => write!(f, "{} {}", self.id, req),
            None => f.write_str(&self.id),
        }
    }
}

/// An immutable plugin definition produced by [`PluginBuilder`].
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub(crate) id: String,
    pub(crate) version: String,
    pub(crate) description: String,
    pub(crate) author: Option<String>,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) contributions: Vec<Contribution>,
    pub(crate) hooks: Vec<HookSubscription>,
    pub(crate) callbacks: LifecycleCallbacks,
}

impl PluginDescriptor {
    /// Starts building a descriptor.
    pub fn builder(id: impl Into<String>, version: impl Into<String>) -> PluginBuilder {
        PluginBuilder::new(id, version)
    }

    /// Plugin id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Parsed version, if valid semver.
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version).ok()
    }

    /// Description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Author.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Declared dependencies.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Declared dependency ids.
    pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.id.as_str())
    }

    /// Declared extension-point contributions.
    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    /// Declared route prefixes.
    pub fn route_prefixes(&self) -> impl Iterator<Item = &str> {
        self.contributions
            .iter()
            .filter_map(|c| c.point.route_prefix())
    }

    /// Declared hook subscriptions.
    pub fn hooks(&self) -> &[HookSubscription] {
        &self.hooks
    }

    /// Lifecycle callbacks.
    pub fn callbacks(&self) -> &LifecycleCallbacks {
        &self.callbacks
    }

    /// Serializable summary of the descriptor.
    pub fn info(&self) -> PluginInfo {
        let mut contributions = BTreeMap::new();
        for c in &self.contributions {
            *contributions.entry(c.point.kind()).or_insert(0usize) += 1;
        }
        PluginInfo {
            id: self.id.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            dependencies: self.dependencies.clone(),
            route_prefixes: self.route_prefixes().map(str::to_string).collect(),
            contributions,
            hooks: self.hooks.iter().map(|h| h.hook.to_string()).collect(),
        }
    }
}

/// Metadata about a plugin, as shown by the admin API and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    /// Unique plugin identifier.
    pub id: String,
    /// Plugin version string.
    pub version: String,
    /// Plugin description.
    pub description: String,
    /// Author or maintainer.
    pub author: Option<String>,
    /// Declared dependencies.
    pub dependencies: Vec<Dependency>,
    /// Declared route prefixes.
    pub route_prefixes: Vec<String>,
    /// Number of contributions per kind.
    pub contributions: BTreeMap<ExtensionKind, usize>,
    /// Hook points subscribed to.
    pub hooks: Vec<String>,
}
