//! Lifecycle integration tests: install, activate, deactivate, uninstall.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use quill_core::types::PluginStatus;
use quill_plugin::error::{LifecycleError, ValidationError};
use quill_plugin::{BoxError, ExtensionKind, HookPoint, PluginError, PluginManager};

use helpers::{bare_plugin, routed_plugin};

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[tokio::test]
async fn test_activate_never_installed_is_rejected() {
    let manager = PluginManager::in_memory();

    let err = manager.activate("ghost").await.unwrap_err();

    assert_eq!(
        err.lifecycle(),
        Some(&LifecycleError::NotInstalled("ghost".into()))
    );
    assert!(manager.get("ghost").await.is_none());
    assert!(manager.list().await.is_empty());
}

#[tokio::test]
async fn test_deactivate_removes_everything_the_plugin_owned() {
    let manager = PluginManager::in_memory();
    let descriptor = routed_plugin("gallery", "/gallery")
        .on(HookPoint::AdminMenu, 10, |_hook, _ctx, data: Value| async move {
            Ok::<Value, BoxError>(data)
        })
        .on(HookPoint::BeforeContentSave, 10, |_hook, _ctx, data: Value| async move {
            Ok::<Value, BoxError>(data)
        })
        .build();

    manager.install(descriptor, json!({})).await.unwrap();
    manager.activate("gallery").await.unwrap();

    assert_eq!(manager.registry().components_of("gallery").await.len(), 1);
    assert_eq!(manager.hooks().registry().count_for_owner("gallery").await, 2);

    let record = manager.deactivate("gallery").await.unwrap();

    assert_eq!(record.status, PluginStatus::Inactive);
    assert!(manager.registry().components_of("gallery").await.is_empty());
    assert!(manager.registry().get_components(ExtensionKind::Route).await.is_empty());
    assert_eq!(manager.hooks().registry().count_for_owner("gallery").await, 0);
}

#[tokio::test]
async fn test_missing_dependency_leaves_no_record() {
    let manager = PluginManager::in_memory();
    let descriptor = bare_plugin("b").depends_on("a").build();

    let err = manager.install(descriptor, json!({})).await.unwrap_err();

    assert_eq!(
        err.validation_errors(),
        &[ValidationError::MissingDependency("a".into())]
    );
    assert!(manager.get("b").await.is_none());
    assert!(manager.store().get("b").await.unwrap().is_none());
}

#[tokio::test]
async fn test_double_activation_does_not_duplicate_hooks() {
    let manager = PluginManager::in_memory();
    let activations = counter();
    let seen = activations.clone();
    let descriptor = bare_plugin("audit")
        .on(HookPoint::AfterContentSave, 10, |_hook, _ctx, data: Value| async move {
            Ok::<Value, BoxError>(data)
        })
        .on_activate(move |_ctx| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok::<(), BoxError>(())
            }
        })
        .build();

    manager.install(descriptor, json!({})).await.unwrap();
    manager.activate("audit").await.unwrap();
    let record = manager.activate("audit").await.unwrap();

    assert_eq!(record.status, PluginStatus::Active);
    assert_eq!(activations.load(Ordering::SeqCst), 1);
    assert_eq!(
        manager
            .hooks()
            .registry()
            .handler_count(&HookPoint::AfterContentSave)
            .await,
        1
    );
}

#[tokio::test]
async fn test_concurrent_activation_runs_callback_once() {
    let manager = Arc::new(PluginManager::in_memory());
    let activations = counter();
    let seen = activations.clone();
    let descriptor = bare_plugin("race")
        .on(HookPoint::AdminMenu, 0, |_hook, _ctx, data: Value| async move {
            Ok::<Value, BoxError>(data)
        })
        .on_activate(move |_ctx| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<(), BoxError>(())
            }
        })
        .build();
    manager.install(descriptor, json!({})).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.activate("race").await })
        })
        .collect();
    for task in tasks {
        let record = task.await.unwrap().unwrap();
        assert_eq!(record.status, PluginStatus::Active);
    }

    assert_eq!(activations.load(Ordering::SeqCst), 1);
    assert_eq!(manager.hooks().registry().count_for_owner("race").await, 1);
}

#[tokio::test]
async fn test_full_lifecycle_persists_each_status() {
    let manager = PluginManager::in_memory();
    manager
        .install(bare_plugin("notes").build(), json!({ "limit": 5 }))
        .await
        .unwrap();

    let stored = manager.store().get("notes").await.unwrap().unwrap();
    assert_eq!(stored.status, PluginStatus::Installed);
    assert_eq!(stored.config, json!({ "limit": 5 }));

    manager.activate("notes").await.unwrap();
    assert_eq!(
        manager.store().get("notes").await.unwrap().unwrap().status,
        PluginStatus::Active
    );

    manager.deactivate("notes").await.unwrap();
    manager.uninstall("notes").await.unwrap();

    let record = manager.get("notes").await.unwrap();
    assert_eq!(record.status, PluginStatus::Uninstalled);
    assert_eq!(
        manager.store().get("notes").await.unwrap().unwrap().status,
        PluginStatus::Uninstalled
    );
}

#[tokio::test]
async fn test_uninstall_requires_inactive() {
    let manager = PluginManager::in_memory();
    manager.install(bare_plugin("notes").build(), json!({})).await.unwrap();

    let err = manager.uninstall("notes").await.unwrap_err();
    assert_eq!(
        err.lifecycle(),
        Some(&LifecycleError::NotInactive("notes".into()))
    );

    manager.activate("notes").await.unwrap();
    let err = manager.uninstall("notes").await.unwrap_err();
    assert_eq!(
        err.lifecycle(),
        Some(&LifecycleError::NotInactive("notes".into()))
    );
    assert_eq!(manager.get("notes").await.unwrap().status, PluginStatus::Active);
}

#[tokio::test]
async fn test_reinstall_after_uninstall_replaces_tombstone() {
    let manager = PluginManager::in_memory();
    manager.install(bare_plugin("notes").build(), json!({})).await.unwrap();
    manager.activate("notes").await.unwrap();
    manager.deactivate("notes").await.unwrap();
    manager.uninstall("notes").await.unwrap();

    let record = manager
        .install(bare_plugin("notes").build(), json!({ "again": true }))
        .await
        .unwrap();

    assert_eq!(record.status, PluginStatus::Installed);
    assert_eq!(record.config, json!({ "again": true }));
}

#[tokio::test]
async fn test_install_twice_is_rejected() {
    let manager = PluginManager::in_memory();
    manager.install(bare_plugin("notes").build(), json!({})).await.unwrap();

    let err = manager
        .install(bare_plugin("notes").build(), json!({}))
        .await
        .unwrap_err();

    assert_eq!(
        err.lifecycle(),
        Some(&LifecycleError::AlreadyInstalled("notes".into()))
    );
}

#[tokio::test]
async fn test_failing_activate_callback_leaves_error_and_nothing_mounted() {
    let manager = PluginManager::in_memory();
    let descriptor = routed_plugin("flaky", "/flaky")
        .on(HookPoint::AdminMenu, 0, |_hook, _ctx, data: Value| async move {
            Ok::<Value, BoxError>(data)
        })
        .on_activate(|_ctx| async move { Err::<(), BoxError>(BoxError::from("no upstream")) })
        .build();
    manager.install(descriptor, json!({})).await.unwrap();

    let err = manager.activate("flaky").await.unwrap_err();

    assert!(matches!(
        err,
        PluginError::Lifecycle(LifecycleError::CallbackFailed { .. })
    ));
    let record = manager.get("flaky").await.unwrap();
    assert_eq!(record.status, PluginStatus::Error);
    assert!(record.last_error.unwrap().contains("no upstream"));
    assert!(manager.registry().components_of("flaky").await.is_empty());
    assert_eq!(manager.hooks().registry().count_for_owner("flaky").await, 0);
}

#[tokio::test]
async fn test_failing_deactivate_callback_still_deactivates() {
    let manager = PluginManager::in_memory();
    let descriptor = routed_plugin("sticky", "/sticky")
        .on_deactivate(|_ctx| async move { Err::<(), BoxError>(BoxError::from("cleanup failed")) })
        .build();
    manager.install(descriptor, json!({})).await.unwrap();
    manager.activate("sticky").await.unwrap();

    let record = manager.deactivate("sticky").await.unwrap();

    assert_eq!(record.status, PluginStatus::Inactive);
    assert!(record.last_error.unwrap().contains("cleanup failed"));
    assert!(manager.registry().components_of("sticky").await.is_empty());
}

#[tokio::test]
async fn test_dependency_must_be_active_before_dependent() {
    let manager = PluginManager::in_memory();
    manager.install(bare_plugin("base").build(), json!({})).await.unwrap();
    manager
        .install(bare_plugin("addon").depends_on("base").build(), json!({}))
        .await
        .unwrap();

    let err = manager.activate("addon").await.unwrap_err();
    assert_eq!(
        err.lifecycle(),
        Some(&LifecycleError::DependencyNotActive {
            id: "addon".into(),
            dependency: "base".into(),
        })
    );

    manager.activate("base").await.unwrap();
    let record = manager.activate("addon").await.unwrap();
    assert_eq!(record.status, PluginStatus::Active);
}

#[tokio::test]
async fn test_lifecycle_events_reach_other_plugins() {
    let manager = PluginManager::in_memory();
    let seen = Arc::new(tokio::sync::Mutex::new(Vec::<String>::new()));
    let log = seen.clone();
    let watcher = bare_plugin("watcher")
        .on(HookPoint::PluginActivated, 0, move |_hook, _ctx, data: Value| {
            let log = log.clone();
            async move {
                if let Some(id) = data["plugin_id"].as_str() {
                    log.lock().await.push(id.to_string());
                }
                Ok::<Value, BoxError>(data)
            }
        })
        .build();

    manager.install(watcher, json!({})).await.unwrap();
    manager.activate("watcher").await.unwrap();
    manager.install(bare_plugin("notes").build(), json!({})).await.unwrap();
    manager.activate("notes").await.unwrap();

    // The watcher's own subscription is live by the time its activation fires.
    assert_eq!(*seen.lock().await, vec!["watcher".to_string(), "notes".to_string()]);
}
