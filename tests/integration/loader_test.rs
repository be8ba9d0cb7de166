//! Loader integration tests: ordering, cycles, persisted state, directory scans.

mod helpers;

use std::sync::Arc;

use serde_json::json;

use quill_core::config::PluginConfig;
use quill_core::traits::PluginStateStore;
use quill_core::types::PluginStatus;
use quill_plugin::error::{LifecycleError, ValidationError};
use quill_plugin::loader::{DirectorySource, StaticSource, resolve_order};
use quill_plugin::store::MemoryStateStore;
use quill_plugin::{PluginCatalog, PluginError, PluginLoader, PluginManager};

use helpers::{TestApp, bare_plugin, routed_plugin};

fn loader() -> PluginLoader {
    PluginLoader::new(Arc::new(PluginManager::in_memory()), &PluginConfig::default())
}

#[tokio::test]
async fn test_cycle_is_rejected_before_any_install() {
    let loader = loader();
    let descriptors = vec![
        bare_plugin("a").depends_on("b").build(),
        bare_plugin("b").depends_on("a").build(),
        bare_plugin("standalone").build(),
    ];

    let err = resolve_order(&descriptors).unwrap_err();
    assert!(matches!(
        err.validation_errors(),
        [ValidationError::CyclicDependency(_)]
    ));

    let err = loader.load_all(descriptors).await.unwrap_err();
    assert!(matches!(
        err.validation_errors(),
        [ValidationError::CyclicDependency(_)]
    ));
    assert!(loader.manager().list().await.is_empty());
}

#[tokio::test]
async fn test_dependencies_load_first_and_unload_last() {
    let loader = loader();
    let descriptors = vec![
        bare_plugin("comments").depends_on("users").build(),
        bare_plugin("users").build(),
        bare_plugin("moderation").depends_on("comments").build(),
    ];

    let report = loader.load_all(descriptors).await.unwrap();
    assert_eq!(report.activated, vec!["users", "comments", "moderation"]);

    let unloaded = loader.unload_all().await;
    assert_eq!(unloaded, vec!["moderation", "comments", "users"]);
    for record in loader.manager().list().await {
        assert_eq!(record.status, PluginStatus::Inactive);
    }
}

#[tokio::test]
async fn test_load_stops_at_first_failure() {
    let loader = loader();
    let descriptors = vec![
        routed_plugin("first", "/shared").build(),
        routed_plugin("second", "/shared").depends_on("first").build(),
        bare_plugin("third").depends_on("second").build(),
    ];

    let err = loader.load_all(descriptors).await.unwrap_err();

    let PluginError::LoadFailed {
        plugin_id, loaded, ..
    } = &err
    else {
        panic!("expected LoadFailed, got {err:?}");
    };
    assert_eq!(plugin_id, "second");
    assert_eq!(loaded, &vec!["first".to_string()]);
    assert!(matches!(
        err.validation_errors(),
        [ValidationError::PrefixConflict { .. }]
    ));
    assert!(loader.manager().get("second").await.is_none());
    assert!(loader.manager().get("third").await.is_none());
}

#[tokio::test]
async fn test_restart_honors_persisted_statuses() {
    let store: Arc<dyn PluginStateStore> = Arc::new(MemoryStateStore::new());
    let offered = || {
        vec![
            bare_plugin("kept").build(),
            bare_plugin("paused").build(),
            bare_plugin("removed").build(),
        ]
    };

    let first = TestApp::with_store(offered(), store.clone());
    first.load().await;
    first.manager().deactivate("paused").await.unwrap();
    first.manager().deactivate("removed").await.unwrap();
    first.manager().uninstall("removed").await.unwrap();

    let second = TestApp::with_store(offered(), store.clone());
    let report = second.load().await;

    assert_eq!(report.activated, vec!["kept"]);
    assert_eq!(report.installed, vec!["paused"]);
    assert_eq!(report.skipped, vec!["removed"]);

    let paused = second.manager().get("paused").await.unwrap();
    assert_eq!(paused.status, PluginStatus::Inactive);
    assert_eq!(
        store.get("paused").await.unwrap().unwrap().status,
        PluginStatus::Inactive
    );
    assert!(second.manager().get("removed").await.is_none());

    second.manager().activate("paused").await.unwrap();
    assert_eq!(
        store.get("paused").await.unwrap().unwrap().status,
        PluginStatus::Active
    );
}

#[tokio::test]
async fn test_plugin_deactivated_before_restart_can_be_uninstalled() {
    let store: Arc<dyn PluginStateStore> = Arc::new(MemoryStateStore::new());

    let first = TestApp::with_store(vec![bare_plugin("paused").build()], store.clone());
    first.load().await;
    first.manager().deactivate("paused").await.unwrap();

    let second = TestApp::with_store(vec![bare_plugin("paused").build()], store.clone());
    second.load().await;

    let listed: Vec<(String, PluginStatus)> = second
        .manager()
        .list()
        .await
        .iter()
        .map(|r| (r.id().to_string(), r.status))
        .collect();
    assert_eq!(listed, vec![("paused".to_string(), PluginStatus::Inactive)]);

    let record = second.manager().uninstall("paused").await.unwrap();
    assert_eq!(record.status, PluginStatus::Uninstalled);
    assert_eq!(
        store.get("paused").await.unwrap().unwrap().status,
        PluginStatus::Uninstalled
    );
}

#[tokio::test]
async fn test_second_load_skips_active_plugins() {
    let app = TestApp::new(vec![bare_plugin("once").build()]);

    let first = app.load().await;
    let second = app.load().await;

    assert_eq!(first.activated, vec!["once"]);
    assert!(second.activated.is_empty());
    assert_eq!(second.skipped, vec!["once"]);
}

#[tokio::test]
async fn test_reload_reactivates() {
    let app = TestApp::new(vec![routed_plugin("gallery", "/gallery").build()]);
    app.load().await;

    let record = app.state.loader.reload("gallery").await.unwrap();

    assert_eq!(record.status, PluginStatus::Active);
    assert_eq!(app.manager().registry().components_of("gallery").await.len(), 1);

    let err = app.state.loader.reload("ghost").await.unwrap_err();
    assert_eq!(
        err.lifecycle(),
        Some(&LifecycleError::NotFound("ghost".into()))
    );
}

#[tokio::test]
async fn test_sync_deactivates_plugins_no_longer_offered() {
    let app = TestApp::new(vec![bare_plugin("old").build()]);
    app.load().await;

    let source = StaticSource::new(vec![bare_plugin("new").build()]);
    let report = app.state.loader.sync(&source).await.unwrap();

    assert_eq!(report.deactivated, vec!["old"]);
    assert_eq!(report.load.activated, vec!["new"]);
    assert_eq!(app.manager().get("old").await.unwrap().status, PluginStatus::Inactive);
    assert_eq!(app.manager().get("new").await.unwrap().status, PluginStatus::Active);
}

#[tokio::test]
async fn test_directory_source_binds_manifests_to_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str, content: &str| {
        let package = dir.path().join(name);
        std::fs::create_dir_all(&package).unwrap();
        std::fs::write(package.join("plugin.toml"), content).unwrap();
    };
    write("seo", "[plugin]\nid = \"seo\"\nversion = \"1.0.0\"\n");
    write("notes", "[plugin]\nid = \"notes\"\nversion = \"1.0.0\"\nenabled = false\n");
    write("stale", "[plugin]\nid = \"stale\"\nversion = \"0.9.0\"\n");
    write("unknown", "[plugin]\nid = \"unknown\"\nversion = \"1.0.0\"\n");
    write("broken", "this is not toml = = =");

    let catalog = PluginCatalog::new()
        .with("seo", plugin_seo::descriptor)
        .with("notes", || bare_plugin("notes").build())
        .with("stale", || bare_plugin("stale").build());
    let source = DirectorySource::new(dir.path(), catalog);

    let loader = loader();
    let discovered = loader.discover(&source).await.unwrap();
    let ids: Vec<&str> = discovered.iter().map(|d| d.id()).collect();
    assert_eq!(ids, vec!["seo"]);

    let report = loader.load_all(discovered).await.unwrap();
    assert_eq!(report.activated, vec!["seo"]);
    assert_eq!(loader.known_ids().await, vec!["seo"]);
}

#[tokio::test]
async fn test_missing_directory_discovers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = DirectorySource::new(dir.path().join("absent"), PluginCatalog::new());

    let discovered = loader().discover(&source).await.unwrap();

    assert!(discovered.is_empty());
}

#[tokio::test]
async fn test_configured_settings_reach_install() {
    let mut config = PluginConfig::default();
    config
        .settings
        .insert("notes".to_string(), json!({ "limit": 3 }));
    let loader = PluginLoader::new(Arc::new(PluginManager::in_memory()), &config);
    loader
        .discover(&StaticSource::new(vec![bare_plugin("notes").build()]))
        .await
        .unwrap();

    let record = loader.install_known("notes", None).await.unwrap();
    assert_eq!(record.config, json!({ "limit": 3 }));

    let err = loader.install_known("ghost", None).await.unwrap_err();
    assert!(matches!(err, PluginError::Source(_)));
}
