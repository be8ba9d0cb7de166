//! Plugin manager: drives the lifecycle state machine.
//!
//! Every mutating operation holds a per-plugin lock for its full duration,
//! so two transitions of the same plugin never interleave. Lifecycle hooks
//! (`plugin.activated`, `plugin.deactivated`) fire after the lock is released.
//!
//! A status change is written to the state store before the registry sees
//! it. If the store rejects the write, the in-memory record keeps its
//! previous status and any partial mounting is undone.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use quill_core::config::PluginConfig;
use quill_core::traits::PluginStateStore;
use quill_core::types::PluginStatus;

use crate::api::context::{PluginContext, PluginServices};
use crate::descriptor::PluginDescriptor;
use crate::error::{LifecycleError, LifecyclePhase, PluginError};
use crate::hooks::definitions::HookPoint;
use crate::hooks::system::HookSystem;
use crate::lifecycle::{can_transition, ensure_transition};
use crate::registry::{PluginRecord, PluginRegistry, PluginSummary};
use crate::store::MemoryStateStore;
use crate::traits::ScopedHandlerAdapter;
use crate::validator::PluginValidator;

/// Manages the full lifecycle of plugins: install, activate, deactivate, uninstall.
#[derive(Debug)]
pub struct PluginManager {
    /// Plugin registry.
    registry: Arc<PluginRegistry>,
    /// Hook system.
    hooks: HookSystem,
    /// Static acceptance checks.
    validator: PluginValidator,
    /// Durable status.
    store: Arc<dyn PluginStateStore>,
    /// Capability facades handed to plugin code.
    services: PluginServices,
    /// Per-plugin transition locks.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PluginManager {
    /// Creates a manager from explicit collaborators.
    pub fn new(
        registry: Arc<PluginRegistry>,
        hooks: HookSystem,
        validator: PluginValidator,
        store: Arc<dyn PluginStateStore>,
        services: PluginServices,
    ) -> Self {
        Self {
            registry,
            hooks,
            validator,
            store,
            services,
            locks: DashMap::new(),
        }
    }

    /// Creates a manager configured from `config`, persisting to `store`,
    /// with in-memory capability facades.
    pub fn from_config(config: &PluginConfig, store: Arc<dyn PluginStateStore>) -> Self {
        let hooks = HookSystem::with_timeout(config.hook_timeout_ms.map(Duration::from_millis));
        let services = PluginServices::in_memory(hooks.clone());
        Self::new(
            Arc::new(PluginRegistry::new()),
            hooks,
            PluginValidator::from_config(config),
            store,
            services,
        )
    }

    /// Creates a fully in-memory manager with default configuration.
    pub fn in_memory() -> Self {
        Self::from_config(&PluginConfig::default(), Arc::new(MemoryStateStore::new()))
    }

    /// Replaces the capability facades.
    pub fn with_services(mut self, services: PluginServices) -> Self {
        self.services = services;
        self
    }

    async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(id.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    fn context(&self, record: &PluginRecord) -> PluginContext {
        PluginContext::new(record.id(), record.config.clone(), self.services.clone())
    }

    async fn persist(&self, record: &PluginRecord) -> Result<(), PluginError> {
        self.store.put(&record.to_state()).await.map_err(|e| {
            error!(plugin_id = %record.id(), error = %e, "Failed to persist plugin state");
            PluginError::Persistence(e)
        })
    }

    /// Moves `current` to `to`: checks the transition table, persists the
    /// new state, and only then replaces the in-memory record.
    async fn commit(
        &self,
        current: &PluginRecord,
        to: PluginStatus,
        last_error: Option<String>,
    ) -> Result<PluginRecord, PluginError> {
        ensure_transition(current.id(), current.status, to)?;

        let now = chrono::Utc::now();
        let mut next = current.clone();
        next.status = to;
        next.last_error = last_error;
        next.updated_at = now;
        if current.status == PluginStatus::Validated && to != PluginStatus::Error {
            next.installed_at = Some(now);
        }

        self.persist(&next).await?;
        self.registry.replace_plugin(next.clone()).await;
        Ok(next)
    }

    async fn run_callback(
        &self,
        descriptor: &PluginDescriptor,
        phase: LifecyclePhase,
        ctx: PluginContext,
    ) -> Result<(), LifecycleError> {
        let Some(callback) = descriptor.callbacks().get(phase) else {
            return Ok(());
        };

        let message = match AssertUnwindSafe(callback(ctx)).catch_unwind().await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.to_string(),
            Err(_) => "callback panicked".to_string(),
        };

        Err(LifecycleError::CallbackFailed {
            id: descriptor.id().to_string(),
            phase,
            message,
        })
    }

    /// Moves `record` to `Error` and returns `err`.
    ///
    /// A failure to record the error state is logged; the caller always
    /// gets the lifecycle error that caused it.
    async fn fail(&self, record: &PluginRecord, err: LifecycleError) -> PluginError {
        let id = record.id();
        error!(plugin_id = %id, error = %err, "Plugin lifecycle operation failed");
        if let Err(commit_err) = self
            .commit(record, PluginStatus::Error, Some(err.to_string()))
            .await
        {
            error!(
                plugin_id = %id,
                error = %commit_err,
                "Could not record error state, keeping previous status"
            );
        }
        err.into()
    }

    // ── install ──

    /// Validates and installs a plugin.
    ///
    /// On validation failure nothing is mutated. On install-callback failure
    /// the record is left in `Error`.
    pub async fn install(
        &self,
        descriptor: PluginDescriptor,
        config: serde_json::Value,
    ) -> Result<PluginRecord, PluginError> {
        let _guard = self.lock(descriptor.id()).await;
        self.install_locked(Arc::new(descriptor), config, PluginStatus::Installed)
            .await
    }

    /// Reinstalls a plugin an operator left deactivated before a restart.
    ///
    /// The record comes back `Inactive`, matching its stored status, so it
    /// can be activated or uninstalled directly.
    pub async fn restore(
        &self,
        descriptor: PluginDescriptor,
        config: serde_json::Value,
    ) -> Result<PluginRecord, PluginError> {
        let _guard = self.lock(descriptor.id()).await;
        self.install_locked(Arc::new(descriptor), config, PluginStatus::Inactive)
            .await
    }

    async fn install_locked(
        &self,
        descriptor: Arc<PluginDescriptor>,
        config: serde_json::Value,
        target: PluginStatus,
    ) -> Result<PluginRecord, PluginError> {
        let id = descriptor.id().to_string();
        let existing = self.registry.get(&id).await;

        if let Some(existing) = &existing {
            if !matches!(existing.status, PluginStatus::Error | PluginStatus::Uninstalled) {
                return Err(LifecycleError::AlreadyInstalled(id).into());
            }
        }

        let result = self
            .validator
            .validate(&descriptor, &self.registry.snapshot().await);
        for warning in &result.warnings {
            warn!(plugin_id = %id, warning = %warning, "Plugin validation warning");
        }
        if !result.is_valid() {
            warn!(plugin_id = %id, errors = result.errors.len(), "Plugin failed validation");
            return Err(PluginError::Validation(result));
        }

        let from = existing
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(PluginStatus::Discovered);
        ensure_transition(&id, from, PluginStatus::Validated)?;

        let mut record = PluginRecord::new(descriptor.clone(), PluginStatus::Validated, config);
        if let Some(existing) = &existing {
            record.installed_at = existing.installed_at;
        }
        if existing.is_some() {
            self.registry.replace_plugin(record.clone()).await;
        } else {
            self.registry.add_plugin(record.clone()).await?;
        }

        if let Err(e) = self
            .run_callback(&descriptor, LifecyclePhase::Install, self.context(&record))
            .await
        {
            let err = self.fail(&record, e).await;
            let stranded = self
                .registry
                .get(&id)
                .await
                .is_some_and(|r| r.status == PluginStatus::Validated);
            if stranded {
                self.discard_validated(&id, existing).await;
            }
            return Err(err);
        }

        let record = match self.commit(&record, target, None).await {
            Ok(record) => record,
            Err(e) => {
                self.discard_validated(&id, existing).await;
                return Err(e);
            }
        };

        info!(
            plugin_id = %id,
            version = %descriptor.version(),
            status = %record.status,
            "Plugin installed"
        );
        Ok(record)
    }

    /// Puts back the record the store still describes after an install
    /// attempt could not be persisted.
    async fn discard_validated(&self, id: &str, previous: Option<PluginRecord>) {
        match previous {
            Some(previous) => {
                self.registry.replace_plugin(previous).await;
            }
            None => {
                self.registry.remove_plugin(id).await.ok();
            }
        }
        warn!(plugin_id = %id, "Discarded unpersisted install");
    }

    // ── activate ──

    /// Activates an installed or inactive plugin. A no-op if already active.
    pub async fn activate(&self, id: &str) -> Result<PluginRecord, PluginError> {
        let (record, changed) = {
            let _guard = self.lock(id).await;
            self.activate_locked(id).await?
        };

        if changed {
            self.hooks
                .execute(
                    HookPoint::PluginActivated,
                    serde_json::json!({ "plugin_id": id }),
                )
                .await;
        }
        Ok(record)
    }

    async fn activate_locked(&self, id: &str) -> Result<(PluginRecord, bool), PluginError> {
        let record = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| LifecycleError::NotInstalled(id.to_string()))?;

        if record.status == PluginStatus::Active {
            return Ok((record, false));
        }
        if !can_transition(record.status, PluginStatus::Active) {
            return Err(LifecycleError::NotInstalled(id.to_string()).into());
        }

        for dependency in record.descriptor.dependency_ids() {
            let active = self
                .registry
                .get(dependency)
                .await
                .is_some_and(|d| d.status == PluginStatus::Active);
            if !active {
                return Err(LifecycleError::DependencyNotActive {
                    id: id.to_string(),
                    dependency: dependency.to_string(),
                }
                .into());
            }
        }

        let descriptor = record.descriptor.clone();
        let ctx = self.context(&record);

        if let Err(e) = self
            .run_callback(&descriptor, LifecyclePhase::Activate, ctx.clone())
            .await
        {
            self.rollback(id).await;
            return Err(self.fail(&record, e).await);
        }

        if let Err(source) = self
            .registry
            .add_extension_points(id, descriptor.contributions())
            .await
        {
            self.rollback(id).await;
            let err = LifecycleError::Registration {
                id: id.to_string(),
                source,
            };
            return Err(self.fail(&record, err).await);
        }

        for subscription in descriptor.hooks() {
            self.hooks
                .register(
                    subscription.hook.clone(),
                    ScopedHandlerAdapter::wrap(subscription.handler.clone(), ctx.clone()),
                    subscription.priority,
                    id,
                )
                .await;
        }

        let record = match self.commit(&record, PluginStatus::Active, None).await {
            Ok(record) => record,
            Err(e) => {
                self.rollback(id).await;
                return Err(e);
            }
        };

        info!(
            plugin_id = %id,
            contributions = descriptor.contributions().len(),
            hooks = descriptor.hooks().len(),
            "Plugin activated"
        );
        Ok((record, true))
    }

    async fn rollback(&self, id: &str) {
        let points = self.registry.remove_all(id).await;
        let hooks = self.hooks.unregister_all(id).await;
        warn!(plugin_id = %id, points, hooks, "Rolled back partial activation");
    }

    // ── deactivate ──

    /// Deactivates an active plugin. A no-op if already inactive.
    ///
    /// A failing deactivate callback is logged; removal proceeds anyway.
    pub async fn deactivate(&self, id: &str) -> Result<PluginRecord, PluginError> {
        let (record, changed) = {
            let _guard = self.lock(id).await;
            self.deactivate_locked(id).await?
        };

        if changed {
            self.hooks
                .execute(
                    HookPoint::PluginDeactivated,
                    serde_json::json!({ "plugin_id": id }),
                )
                .await;
        }
        Ok(record)
    }

    async fn deactivate_locked(&self, id: &str) -> Result<(PluginRecord, bool), PluginError> {
        let record = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;

        if record.status == PluginStatus::Inactive {
            return Ok((record, false));
        }
        if !can_transition(record.status, PluginStatus::Inactive) {
            return Err(LifecycleError::NotActive(id.to_string()).into());
        }

        let dependents: Vec<String> = self
            .registry
            .list()
            .await
            .into_iter()
            .filter(|r| r.status == PluginStatus::Active)
            .filter(|r| r.descriptor.dependency_ids().any(|d| d == id))
            .map(|r| r.id().to_string())
            .collect();
        if !dependents.is_empty() {
            warn!(plugin_id = %id, ?dependents, "Deactivating a plugin that active plugins depend on");
        }

        let callback_error = self
            .run_callback(&record.descriptor, LifecyclePhase::Deactivate, self.context(&record))
            .await
            .err();
        if let Some(e) = &callback_error {
            warn!(plugin_id = %id, error = %e, "Deactivate callback failed, continuing");
        }

        let record = self
            .commit(&record, PluginStatus::Inactive, callback_error.map(|e| e.to_string()))
            .await?;
        self.registry.remove_all(id).await;
        self.hooks.unregister_all(id).await;

        info!(plugin_id = %id, "Plugin deactivated");
        Ok((record, true))
    }

    // ── uninstall ──

    /// Uninstalls an inactive plugin, leaving a tombstone record.
    pub async fn uninstall(&self, id: &str) -> Result<PluginRecord, PluginError> {
        let guard = self.lock(id).await;
        let record = self.uninstall_locked(id).await?;
        drop(guard);

        // Drop the lock entry unless another caller is waiting on it.
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);

        info!(plugin_id = %id, "Plugin uninstalled");
        Ok(record)
    }

    async fn uninstall_locked(&self, id: &str) -> Result<PluginRecord, PluginError> {
        let record = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;

        if !can_transition(record.status, PluginStatus::Uninstalled) {
            return Err(LifecycleError::NotInactive(id.to_string()).into());
        }

        if let Err(e) = self
            .run_callback(&record.descriptor, LifecyclePhase::Uninstall, self.context(&record))
            .await
        {
            return Err(self.fail(&record, e).await);
        }

        let record = self.commit(&record, PluginStatus::Uninstalled, None).await?;

        // Nothing should be mounted for an inactive plugin; purge regardless.
        self.registry.remove_all(id).await;
        self.hooks.unregister_all(id).await;
        Ok(record)
    }

    // ── queries ──

    /// Gets a plugin record.
    pub async fn get(&self, id: &str) -> Option<PluginRecord> {
        self.registry.get(id).await
    }

    /// Lists all plugin records, sorted by id.
    pub async fn list(&self) -> Vec<PluginRecord> {
        self.registry.list().await
    }

    /// Lists serializable summaries of all plugin records.
    pub async fn summaries(&self) -> Vec<PluginSummary> {
        self.list().await.iter().map(PluginRecord::summary).collect()
    }

    /// Returns the plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Returns the hook system.
    pub fn hooks(&self) -> &HookSystem {
        &self.hooks
    }

    /// Returns the validator.
    pub fn validator(&self) -> &PluginValidator {
        &self.validator
    }

    /// Returns the state store.
    pub fn store(&self) -> &Arc<dyn PluginStateStore> {
        &self.store
    }

    /// Returns the capability facades.
    pub fn services(&self) -> &PluginServices {
        &self.services
    }
}
