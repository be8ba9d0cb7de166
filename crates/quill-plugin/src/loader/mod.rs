//! Plugin loader: discovery, dependency ordering, and bulk (re)loading.

pub mod catalog;
pub mod source;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use quill_core::config::PluginConfig;
use quill_core::types::PluginStatus;

use crate::descriptor::PluginDescriptor;
use crate::error::{PluginError, ValidationError};
use crate::graph::DependencyGraph;
use crate::manager::PluginManager;
use crate::registry::PluginRecord;

pub use catalog::{PluginCatalog, PluginFactory};
pub use source::{DirectorySource, PluginManifest, PluginSource, StaticSource, parse_manifest};

/// What `load_all` did with each plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Installed (if needed) and activated, in load order.
    pub activated: Vec<String>,
    /// Installed but left unactivated because they were persisted inactive.
    pub installed: Vec<String>,
    /// Already active or persisted as uninstalled.
    pub skipped: Vec<String>,
}

/// What `sync` changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Result of loading the discovered set.
    pub load: LoadReport,
    /// Active plugins no longer discovered, deactivated.
    pub deactivated: Vec<String>,
}

/// Orders `descriptors` so every dependency precedes its dependents.
///
/// Dependencies outside the set are assumed to be installed already.
pub fn resolve_order(descriptors: &[PluginDescriptor]) -> Result<Vec<String>, PluginError> {
    DependencyGraph::from_descriptors(descriptors)
        .topological_order()
        .map_err(|cycle| PluginError::validation(ValidationError::CyclicDependency(cycle)))
}

/// Drives the manager over sets of discovered plugins.
#[derive(Debug)]
pub struct PluginLoader {
    manager: Arc<PluginManager>,
    settings: HashMap<String, serde_json::Value>,
    known: RwLock<BTreeMap<String, PluginDescriptor>>,
}

impl PluginLoader {
    /// Creates a loader; per-plugin install config comes from `config.settings`.
    pub fn new(manager: Arc<PluginManager>, config: &PluginConfig) -> Self {
        Self {
            manager,
            settings: config.settings.clone(),
            known: RwLock::new(BTreeMap::new()),
        }
    }

    /// The manager this loader drives.
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    /// Enumerates `source` and remembers what it offered.
    pub async fn discover(
        &self,
        source: &dyn PluginSource,
    ) -> Result<Vec<PluginDescriptor>, PluginError> {
        let descriptors = source.discover().await?;
        self.remember(&descriptors).await;
        info!(source = source.name(), count = descriptors.len(), "Plugins discovered");
        Ok(descriptors)
    }

    async fn remember(&self, descriptors: &[PluginDescriptor]) {
        let mut known = self.known.write().await;
        for d in descriptors {
            known.insert(d.id().to_string(), d.clone());
        }
    }

    /// A descriptor previously seen by this loader.
    pub async fn known(&self, id: &str) -> Option<PluginDescriptor> {
        self.known.read().await.get(id).cloned()
    }

    /// Ids of every descriptor previously seen by this loader.
    pub async fn known_ids(&self) -> Vec<String> {
        self.known.read().await.keys().cloned().collect()
    }

    /// Install config for `id`: configured settings, else the persisted
    /// config, else an empty object.
    async fn config_for(&self, id: &str) -> Result<serde_json::Value, PluginError> {
        if let Some(settings) = self.settings.get(id) {
            return Ok(settings.clone());
        }
        let persisted = self.manager.store().get(id).await?;
        Ok(persisted
            .map(|s| s.config)
            .unwrap_or_else(|| serde_json::json!({})))
    }

    /// Installs a previously discovered plugin.
    ///
    /// Without an explicit `config` the configured settings are used.
    pub async fn install_known(
        &self,
        id: &str,
        config: Option<serde_json::Value>,
    ) -> Result<PluginRecord, PluginError> {
        let descriptor = self
            .known(id)
            .await
            .ok_or_else(|| PluginError::Source(format!("no package offers plugin '{id}'")))?;
        let config = match config {
            Some(config) => config,
            None => self.config_for(id).await?,
        };
        self.manager.install(descriptor, config).await
    }

    /// Installs and activates `descriptors` in dependency order.
    ///
    /// The dependency graph is checked before anything is installed. Loading
    /// stops at the first failure; later plugins are not attempted.
    /// Persisted state is honored: uninstalled plugins are skipped and
    /// inactive ones are installed without being activated.
    pub async fn load_all(
        &self,
        descriptors: Vec<PluginDescriptor>,
    ) -> Result<LoadReport, PluginError> {
        let order = resolve_order(&descriptors)?;
        self.remember(&descriptors).await;

        let mut by_id: HashMap<String, PluginDescriptor> = descriptors
            .into_iter()
            .map(|d| (d.id().to_string(), d))
            .collect();

        let mut report = LoadReport::default();
        for id in order {
            let Some(descriptor) = by_id.remove(&id) else {
                continue;
            };

            if let Err(source) = self.load_one(descriptor, &mut report).await {
                error!(plugin_id = %id, error = %source, "Plugin load failed, stopping");
                return Err(PluginError::LoadFailed {
                    plugin_id: id,
                    loaded: report.activated,
                    source: Box::new(source),
                });
            }
        }

        info!(
            activated = report.activated.len(),
            installed = report.installed.len(),
            skipped = report.skipped.len(),
            "Plugins loaded"
        );
        Ok(report)
    }

    async fn load_one(
        &self,
        descriptor: PluginDescriptor,
        report: &mut LoadReport,
    ) -> Result<(), PluginError> {
        let id = descriptor.id().to_string();
        let persisted = self.manager.store().get(&id).await?.map(|s| s.status);
        let current = self.manager.get(&id).await.map(|r| r.status);

        match (current, persisted) {
            (Some(PluginStatus::Active), _) => {
                report.skipped.push(id);
            }
            (_, Some(PluginStatus::Uninstalled)) | (Some(PluginStatus::Uninstalled), _) => {
                info!(plugin_id = %id, "Plugin was uninstalled, skipping");
                report.skipped.push(id);
            }
            (Some(PluginStatus::Inactive), _) => {
                report.installed.push(id);
            }
            (Some(PluginStatus::Installed), _) => {
                self.manager.activate(&id).await?;
                report.activated.push(id);
            }
            (_, Some(PluginStatus::Inactive)) => {
                let config = self.config_for(&id).await?;
                self.manager.restore(descriptor, config).await?;
                info!(plugin_id = %id, "Plugin restored as inactive");
                report.installed.push(id);
            }
            _ => {
                let config = self.config_for(&id).await?;
                self.manager.install(descriptor, config).await?;
                self.manager.activate(&id).await?;
                report.activated.push(id);
            }
        }
        Ok(())
    }

    /// Deactivates every active plugin, dependents before their dependencies.
    ///
    /// Failures are logged and do not stop the sweep.
    pub async fn unload_all(&self) -> Vec<String> {
        let active: Vec<PluginDescriptor> = self
            .manager
            .list()
            .await
            .into_iter()
            .filter(|r| r.status == PluginStatus::Active)
            .map(|r| r.descriptor.as_ref().clone())
            .collect();

        let ids: HashSet<String> = active.iter().map(|d| d.id().to_string()).collect();
        self.deactivate_in_reverse(&active, &ids).await
    }

    async fn deactivate_in_reverse(
        &self,
        descriptors: &[PluginDescriptor],
        ids: &HashSet<String>,
    ) -> Vec<String> {
        // Active plugins cannot form a cycle; fall back to id order if they somehow do.
        let order = resolve_order(descriptors).unwrap_or_else(|_| {
            let mut ids: Vec<String> = ids.iter().cloned().collect();
            ids.sort();
            ids
        });

        let mut deactivated = Vec::new();
        for id in order.into_iter().rev().filter(|id| ids.contains(id)) {
            match self.manager.deactivate(&id).await {
                Ok(_) => deactivated.push(id),
                Err(e) => error!(plugin_id = %id, error = %e, "Failed to deactivate plugin"),
            }
        }

        info!(count = deactivated.len(), "Plugins unloaded");
        deactivated
    }

    /// Deactivates then re-activates one plugin.
    pub async fn reload(&self, id: &str) -> Result<PluginRecord, PluginError> {
        self.manager.deactivate(id).await?;
        let record = self.manager.activate(id).await?;
        info!(plugin_id = %id, "Plugin reloaded");
        Ok(record)
    }

    /// Re-scans `source` without a restart.
    ///
    /// Newly discovered plugins are loaded; active plugins the source no
    /// longer offers are deactivated.
    pub async fn sync(&self, source: &dyn PluginSource) -> Result<SyncReport, PluginError> {
        let discovered = self.discover(source).await?;
        let offered: HashSet<String> = discovered.iter().map(|d| d.id().to_string()).collect();

        let gone: Vec<PluginDescriptor> = self
            .manager
            .list()
            .await
            .into_iter()
            .filter(|r| r.status == PluginStatus::Active && !offered.contains(r.id()))
            .map(|r| r.descriptor.as_ref().clone())
            .collect();

        let deactivated = if gone.is_empty() {
            Vec::new()
        } else {
            let ids: HashSet<String> = gone.iter().map(|d| d.id().to_string()).collect();
            warn!(plugins = ?ids, "Active plugins no longer offered by source");
            self.deactivate_in_reverse(&gone, &ids).await
        };

        let load = self.load_all(discovered).await?;
        Ok(SyncReport { load, deactivated })
    }
}
