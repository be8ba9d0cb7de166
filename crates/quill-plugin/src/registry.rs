//! Plugin registry: plugin records and the extension points they contribute.
//!
//! One lock guards the whole state: reads take it shared, mutations take it
//! exclusively, so `remove_all` never interleaves with `get_components`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use quill_core::types::{PluginState, PluginStatus};

use crate::descriptor::{PluginDescriptor, PluginInfo};
use crate::error::RegistryError;
use crate::extension::{Contribution, ExtensionKind, ExtensionPoint, ExtensionPointRecord};

/// A plugin descriptor plus its mutable lifecycle state.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    /// The immutable descriptor.
    pub descriptor: Arc<PluginDescriptor>,
    /// Current lifecycle status.
    pub status: PluginStatus,
    /// Configuration passed to `install`.
    pub config: serde_json::Value,
    /// When the plugin last reached Installed.
    pub installed_at: Option<DateTime<Utc>>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
    /// Last validation or lifecycle error.
    pub last_error: Option<String>,
}

impl PluginRecord {
    /// Creates a record in `status` for `descriptor`.
    pub fn new(
        descriptor: Arc<PluginDescriptor>,
        status: PluginStatus,
        config: serde_json::Value,
    ) -> Self {
        Self {
            descriptor,
            status,
            config,
            installed_at: None,
            updated_at: Utc::now(),
            last_error: None,
        }
    }

    /// Plugin id.
    pub fn id(&self) -> &str {
        self.descriptor.id()
    }

    /// The persisted form of this record.
    pub fn to_state(&self) -> PluginState {
        PluginState {
            plugin_id: self.id().to_string(),
            version: self.descriptor.version().to_string(),
            status: self.status,
            config: self.config.clone(),
            last_error: self.last_error.clone(),
            installed_at: self.installed_at,
            updated_at: self.updated_at,
        }
    }

    /// Serializable summary for listings.
    pub fn summary(&self) -> PluginSummary {
        PluginSummary {
            info: self.descriptor.info(),
            status: self.status,
            installed_at: self.installed_at,
            updated_at: self.updated_at,
            last_error: self.last_error.clone(),
        }
    }
}

/// Serializable view of a plugin record.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSummary {
    /// Descriptor metadata.
    #[serde(flatten)]
    pub info: PluginInfo,
    /// Current status.
    pub status: PluginStatus,
    /// When the plugin last reached Installed.
    pub installed_at: Option<DateTime<Utc>>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
    /// Last error.
    pub last_error: Option<String>,
}

/// What the validator needs to know about one registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Declared version.
    pub version: String,
    /// Current status.
    pub status: PluginStatus,
    /// Declared dependency ids.
    pub dependencies: Vec<String>,
    /// Declared route prefixes.
    pub route_prefixes: Vec<String>,
}

/// Point-in-time copy of the registry, consumed by the validator.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// Plugin id → entry.
    pub plugins: BTreeMap<String, SnapshotEntry>,
}

impl RegistrySnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor at `status`.
    pub fn with(mut self, descriptor: &PluginDescriptor, status: PluginStatus) -> Self {
        self.insert(descriptor, status);
        self
    }

    /// Adds a descriptor at `status`.
    pub fn insert(&mut self, descriptor: &PluginDescriptor, status: PluginStatus) {
        self.plugins.insert(
            descriptor.id().to_string(),
            SnapshotEntry {
                version: descriptor.version().to_string(),
                status,
                dependencies: descriptor.dependency_ids().map(str::to_string).collect(),
                route_prefixes: descriptor.route_prefixes().map(str::to_string).collect(),
            },
        );
    }

    /// The entry for `id` if it is installed (Installed, Active or Inactive).
    pub fn installed(&self, id: &str) -> Option<&SnapshotEntry> {
        self.plugins.get(id).filter(|e| e.status.is_installed())
    }

    /// Installed entries.
    pub fn installed_entries(&self) -> impl Iterator<Item = (&String, &SnapshotEntry)> {
        self.plugins.iter().filter(|(_, e)| e.status.is_installed())
    }

    /// Route prefixes mounted by Active plugins, other than `except`.
    pub fn claimed_prefixes<'a>(&'a self, except: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.plugins
            .iter()
            .filter(move |(id, e)| e.status == PluginStatus::Active && id.as_str() != except)
            .flat_map(|(id, e)| e.route_prefixes.iter().map(move |p| (p.as_str(), id.as_str())))
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Plugin id → record.
    plugins: HashMap<String, PluginRecord>,
    /// Owner id → extension points.
    by_owner: HashMap<String, Vec<ExtensionPointRecord>>,
    /// Kind → extension points sorted by (priority, sequence).
    by_kind: HashMap<ExtensionKind, Vec<ExtensionPointRecord>>,
    /// Next extension point sequence number.
    sequence: u64,
}

impl RegistryState {
    fn is_active(&self, owner: &str) -> bool {
        self.plugins
            .get(owner)
            .is_some_and(|r| r.status == PluginStatus::Active)
    }
}

/// Registry of plugin records and their extension points.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    state: RwLock<RegistryState>,
}

impl PluginRegistry {
    /// Creates a new empty plugin registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new record. Fails if the id already exists.
    pub async fn add_plugin(&self, record: PluginRecord) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        let id = record.id().to_string();

        if state.plugins.contains_key(&id) {
            return Err(RegistryError::DuplicatePlugin(id));
        }

        info!(
            plugin_id = %id,
            version = %record.descriptor.version(),
            status = %record.status,
            "Registering plugin"
        );
        state.plugins.insert(id, record);
        Ok(())
    }

    /// Inserts a record, replacing any existing one with the same id.
    pub async fn replace_plugin(&self, record: PluginRecord) -> Option<PluginRecord> {
        let mut state = self.state.write().await;
        let id = record.id().to_string();
        debug!(plugin_id = %id, status = %record.status, "Replacing plugin record");
        state.plugins.insert(id, record)
    }

    /// Removes a record and every extension point it owns.
    pub async fn remove_plugin(&self, id: &str) -> Result<PluginRecord, RegistryError> {
        let mut state = self.state.write().await;
        let record = state
            .plugins
            .remove(id)
            .ok_or_else(|| RegistryError::PluginNotFound(id.to_string()))?;
        Self::purge(&mut state, id);
        info!(plugin_id = %id, "Plugin record removed");
        Ok(record)
    }

    /// Gets a record by id.
    pub async fn get(&self, id: &str) -> Option<PluginRecord> {
        self.state.read().await.plugins.get(id).cloned()
    }

    /// Whether a record exists.
    pub async fn contains(&self, id: &str) -> bool {
        self.state.read().await.plugins.contains_key(id)
    }

    /// Lists all records, sorted by id.
    pub async fn list(&self) -> Vec<PluginRecord> {
        let state = self.state.read().await;
        let mut records: Vec<PluginRecord> = state.plugins.values().cloned().collect();
        records.sort_by(|a, b| a.id().cmp(b.id()));
        records
    }

    /// Returns plugin count.
    pub async fn count(&self) -> usize {
        self.state.read().await.plugins.len()
    }

    /// Adds extension points for `owner`, all or nothing.
    ///
    /// Fails if any contributed route prefix is already mounted by another
    /// plugin or is contributed twice in the same batch.
    pub async fn add_extension_points(
        &self,
        owner: &str,
        contributions: &[Contribution],
    ) -> Result<usize, RegistryError> {
        let mut state = self.state.write().await;

        let mut batch: HashSet<&str> = HashSet::new();
        for prefix in contributions.iter().filter_map(|c| c.point.route_prefix()) {
            let mounted = state
                .by_kind
                .get(&ExtensionKind::Route)
                .into_iter()
                .flatten()
                .find(|r| r.owner != owner && r.point.route_prefix() == Some(prefix));

            if let Some(existing) = mounted {
                return Err(RegistryError::PrefixConflict {
                    prefix: prefix.to_string(),
                    owner: existing.owner.clone(),
                });
            }
            if !batch.insert(prefix) {
                return Err(RegistryError::PrefixConflict {
                    prefix: prefix.to_string(),
                    owner: owner.to_string(),
                });
            }
        }

        for contribution in contributions {
            state.sequence += 1;
            let record = ExtensionPointRecord {
                owner: owner.to_string(),
                priority: contribution.priority,
                sequence: state.sequence,
                point: contribution.point.clone(),
            };

            let by_kind = state.by_kind.entry(record.kind()).or_default();
            by_kind.push(record.clone());
            by_kind.sort_by_key(|r| (r.priority, r.sequence));

            state
                .by_owner
                .entry(owner.to_string())
                .or_default()
                .push(record);
        }

        debug!(plugin_id = %owner, count = contributions.len(), "Extension points added");
        Ok(contributions.len())
    }

    /// Removes every extension point owned by `owner`. Returns the count removed.
    pub async fn remove_all(&self, owner: &str) -> usize {
        let mut state = self.state.write().await;
        let removed = Self::purge(&mut state, owner);
        if removed > 0 {
            info!(plugin_id = %owner, removed, "Extension points removed");
        }
        removed
    }

    fn purge(state: &mut RegistryState, owner: &str) -> usize {
        let removed = state.by_owner.remove(owner).map(|v| v.len()).unwrap_or(0);
        for records in state.by_kind.values_mut() {
            records.retain(|r| r.owner != owner);
        }
        state.by_kind.retain(|_, records| !records.is_empty());
        removed
    }

    /// Live extension points of `kind` across all Active plugins, in
    /// (priority, sequence) order.
    pub async fn get_components(&self, kind: ExtensionKind) -> Vec<ExtensionPointRecord> {
        let state = self.state.read().await;
        state
            .by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .filter(|r| state.is_active(&r.owner))
            .cloned()
            .collect()
    }

    /// Extension points owned by `owner`, regardless of status.
    pub async fn components_of(&self, owner: &str) -> Vec<ExtensionPointRecord> {
        let state = self.state.read().await;
        state.by_owner.get(owner).cloned().unwrap_or_default()
    }

    /// Looks up a service contributed by an Active plugin and downcasts it.
    pub async fn service<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get_components(ExtensionKind::Service)
            .await
            .into_iter()
            .find_map(|record| match record.point {
                ExtensionPoint::Service(service) if service.name == name => {
                    service.instance.downcast::<T>().ok()
                }
                _ => None,
            })
    }

    /// Takes a point-in-time snapshot for validation.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read().await;
        let mut snapshot = RegistrySnapshot::new();
        for record in state.plugins.values() {
            snapshot.insert(&record.descriptor, record.status);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PluginBuilder;
    use crate::extension::MenuItem;
    use axum::Router;

    fn record(descriptor: PluginDescriptor, status: PluginStatus) -> PluginRecord {
        PluginRecord::new(Arc::new(descriptor), status, serde_json::json!({}))
    }

    fn menu(label: &str) -> MenuItem {
        MenuItem {
            label: label.into(),
            path: format!("/admin/{label}"),
            parent: None,
            icon: None,
        }
    }

    #[tokio::test]
    async fn test_add_plugin_rejects_duplicate_id() {
        let registry = PluginRegistry::new();
        let d = PluginBuilder::new("seo", "1.0.0").build();
        registry.add_plugin(record(d.clone(), PluginStatus::Validated)).await.unwrap();

        let err = registry
            .add_plugin(record(d, PluginStatus::Validated))
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicatePlugin("seo".into()));
    }

    #[tokio::test]
    async fn test_remove_plugin_purges_its_components() {
        let registry = PluginRegistry::new();
        let d = PluginBuilder::new("seo", "1.0.0").menu_item(menu("seo"), 0).build();
        registry.add_plugin(record(d.clone(), PluginStatus::Active)).await.unwrap();
        registry.add_extension_points("seo", d.contributions()).await.unwrap();

        let removed = registry.remove_plugin("seo").await.unwrap();
        assert_eq!(removed.id(), "seo");
        assert!(!registry.contains("seo").await);
        assert!(registry.components_of("seo").await.is_empty());
        assert_eq!(
            registry.remove_plugin("seo").await.unwrap_err(),
            RegistryError::PluginNotFound("seo".into())
        );
    }

    #[tokio::test]
    async fn test_components_sorted_and_filtered_to_active() {
        let registry = PluginRegistry::new();
        let a = PluginBuilder::new("a", "1.0.0")
            .menu_item(menu("late"), 50)
            .menu_item(menu("early"), 1)
            .build();
        let b = PluginBuilder::new("b", "1.0.0").menu_item(menu("mid"), 10).build();

        registry.add_plugin(record(a.clone(), PluginStatus::Active)).await.unwrap();
        registry.add_plugin(record(b.clone(), PluginStatus::Installed)).await.unwrap();
        registry.add_extension_points("a", a.contributions()).await.unwrap();
        registry.add_extension_points("b", b.contributions()).await.unwrap();

        let labels = |records: Vec<ExtensionPointRecord>| -> Vec<String> {
            records
                .into_iter()
                .filter_map(|r| match r.point {
                    ExtensionPoint::MenuItem(m) => Some(m.label),
                    _ => None,
                })
                .collect()
        };

        assert_eq!(
            labels(registry.get_components(ExtensionKind::MenuItem).await),
            vec!["early", "late"]
        );

        registry.replace_plugin(record(b, PluginStatus::Active)).await;
        assert_eq!(
            labels(registry.get_components(ExtensionKind::MenuItem).await),
            vec!["early", "mid", "late"]
        );
    }

    #[tokio::test]
    async fn test_prefix_collision_is_all_or_nothing() {
        let registry = PluginRegistry::new();
        let a = PluginBuilder::new("a", "1.0.0").route("/shop", Router::new(), 0).build();
        let b = PluginBuilder::new("b", "1.0.0")
            .menu_item(menu("b"), 0)
            .route("/shop", Router::new(), 0)
            .build();

        registry.add_plugin(record(a.clone(), PluginStatus::Active)).await.unwrap();
        registry.add_plugin(record(b.clone(), PluginStatus::Active)).await.unwrap();
        registry.add_extension_points("a", a.contributions()).await.unwrap();

        let err = registry
            .add_extension_points("b", b.contributions())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::PrefixConflict {
                prefix: "/shop".into(),
                owner: "a".into()
            }
        );
        assert!(registry.components_of("b").await.is_empty());
        assert!(registry.get_components(ExtensionKind::MenuItem).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_all_clears_both_indices() {
        let registry = PluginRegistry::new();
        let a = PluginBuilder::new("a", "1.0.0")
            .route("/a", Router::new(), 0)
            .menu_item(menu("a"), 0)
            .build();
        registry.add_plugin(record(a.clone(), PluginStatus::Active)).await.unwrap();
        registry.add_extension_points("a", a.contributions()).await.unwrap();

        assert_eq!(registry.remove_all("a").await, 2);
        assert!(registry.components_of("a").await.is_empty());
        assert!(registry.get_components(ExtensionKind::Route).await.is_empty());
        assert!(registry.get("a").await.is_some());
    }

    #[tokio::test]
    async fn test_service_lookup_downcasts() {
        #[derive(Debug, PartialEq)]
        struct Slugger(&'static str);

        let registry = PluginRegistry::new();
        let a = PluginBuilder::new("a", "1.0.0")
            .service("slugger", Arc::new(Slugger("-")), 0)
            .build();
        registry.add_plugin(record(a.clone(), PluginStatus::Active)).await.unwrap();
        registry.add_extension_points("a", a.contributions()).await.unwrap();

        let found = registry.service::<Slugger>("slugger").await.unwrap();
        assert_eq!(*found, Slugger("-"));
        assert!(registry.service::<String>("slugger").await.is_none());
        assert!(registry.service::<Slugger>("other").await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_reports_claimed_prefixes_of_active_plugins() {
        let registry = PluginRegistry::new();
        let a = PluginBuilder::new("a", "1.0.0").route("/a", Router::new(), 0).build();
        let b = PluginBuilder::new("b", "1.0.0").route("/b", Router::new(), 0).build();
        registry.add_plugin(record(a, PluginStatus::Active)).await.unwrap();
        registry.add_plugin(record(b, PluginStatus::Inactive)).await.unwrap();

        let snapshot = registry.snapshot().await;
        let claimed: Vec<_> = snapshot.claimed_prefixes("").collect();
        assert_eq!(claimed, vec![("/a", "a")]);
        assert!(snapshot.installed("b").is_some());
    }
}
