//! Hook pipeline integration tests: ordering, cancellation, failure isolation.

mod helpers;

use serde_json::{Value, json};

use quill_plugin::{BoxError, HookContext, HookPoint, PluginBuilder, PluginManager};

use helpers::bare_plugin;

const TRAIL: &str = "test.trail";

/// A plugin appending `tag` to the `trail` array of the custom test event.
fn appender(id: &str, priority: i32) -> PluginBuilder {
    let tag = id.to_string();
    bare_plugin(id).on(TRAIL, priority, move |_hook, _ctx, mut data: Value| {
        let tag = tag.clone();
        async move {
            data["trail"]
                .as_array_mut()
                .ok_or("trail missing")?
                .push(json!(tag));
            Ok::<Value, BoxError>(data)
        }
    })
}

async fn activate_all(manager: &PluginManager, builders: Vec<PluginBuilder>) {
    for builder in builders {
        let descriptor = builder.build();
        let id = descriptor.id().to_string();
        manager.install(descriptor, json!({})).await.unwrap();
        manager.activate(&id).await.unwrap();
    }
}

fn trail(data: &Value) -> Vec<&str> {
    data["trail"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_handlers_run_in_ascending_priority() {
    let manager = PluginManager::in_memory();
    activate_all(
        &manager,
        vec![appender("ten", 10), appender("one", 1), appender("five", 5)],
    )
    .await;

    let out = manager.hooks().execute(TRAIL, json!({ "trail": [] })).await;

    assert_eq!(trail(&out), vec!["one", "five", "ten"]);
}

#[tokio::test]
async fn test_equal_priorities_run_in_activation_order() {
    let manager = PluginManager::in_memory();
    activate_all(
        &manager,
        vec![appender("first", 5), appender("second", 5), appender("third", 5)],
    )
    .await;

    let out = manager.hooks().execute(TRAIL, json!({ "trail": [] })).await;

    assert_eq!(trail(&out), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_cancel_stops_later_handlers() {
    let manager = PluginManager::in_memory();
    let stopper = bare_plugin("stopper").on(TRAIL, 5, |hook: HookContext, _ctx, mut data: Value| async move {
        data["stopped"] = json!(true);
        hook.cancel();
        Ok::<Value, BoxError>(data)
    });
    activate_all(
        &manager,
        vec![appender("early", 1), stopper, appender("late", 10)],
    )
    .await;

    let ctx = HookContext::new(TRAIL);
    let outcome = manager.hooks().run(&ctx, json!({ "trail": [] })).await;

    assert_eq!(trail(&outcome.data), vec!["early"]);
    assert_eq!(outcome.data["stopped"], json!(true));
    assert_eq!(outcome.invoked, 2);
    assert_eq!(outcome.cancelled_by.as_deref(), Some("stopper"));
}

#[tokio::test]
async fn test_failing_handler_does_not_break_pipeline() {
    let manager = PluginManager::in_memory();
    let broken = bare_plugin("broken").on(TRAIL, 5, |_hook, _ctx, _data: Value| async move {
        Err::<Value, BoxError>(BoxError::from("handler exploded"))
    });
    activate_all(
        &manager,
        vec![appender("before", 1), broken, appender("after", 10)],
    )
    .await;

    let ctx = HookContext::new(TRAIL);
    let outcome = manager.hooks().run(&ctx, json!({ "trail": [] })).await;

    assert_eq!(trail(&outcome.data), vec!["before", "after"]);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].to_string().contains("handler exploded"));
}

#[tokio::test]
async fn test_deactivated_plugin_leaves_pipeline() {
    let manager = PluginManager::in_memory();
    activate_all(&manager, vec![appender("stays", 1), appender("leaves", 2)]).await;

    manager.deactivate("leaves").await.unwrap();
    let out = manager.hooks().execute(TRAIL, json!({ "trail": [] })).await;
    assert_eq!(trail(&out), vec!["stays"]);

    manager.activate("leaves").await.unwrap();
    let out = manager.hooks().execute(TRAIL, json!({ "trail": [] })).await;
    assert_eq!(trail(&out), vec!["stays", "leaves"]);
}

#[tokio::test]
async fn test_handlers_receive_owning_plugin_context() {
    let manager = PluginManager::in_memory();
    let stamper = bare_plugin("stamper").on(TRAIL, 0, |_hook, ctx: quill_plugin::PluginContext, mut data: Value| async move {
        data["owner"] = json!(ctx.plugin_id());
        data["greeting"] = ctx.setting("greeting").cloned().unwrap_or(Value::Null);
        Ok::<Value, BoxError>(data)
    });
    manager
        .install(stamper.build(), json!({ "greeting": "hi" }))
        .await
        .unwrap();
    manager.activate("stamper").await.unwrap();

    let out = manager.hooks().execute(TRAIL, json!({})).await;

    assert_eq!(out["owner"], "stamper");
    assert_eq!(out["greeting"], "hi");
}

#[tokio::test]
async fn test_content_save_runs_seo_slug_hook() {
    let manager = PluginManager::in_memory();
    manager
        .install(
            plugin_seo::descriptor(),
            json!({ "default_description": "A Quill site" }),
        )
        .await
        .unwrap();
    manager.activate(plugin_seo::PLUGIN_ID).await.unwrap();

    let saved = manager
        .services()
        .content
        .save("posts", "42", json!({ "title": "Hello, Plugin World!" }))
        .await
        .unwrap();

    assert_eq!(saved["slug"], "hello-plugin-world");
    assert_eq!(saved["meta_description"], "A Quill site");

    manager.deactivate(plugin_seo::PLUGIN_ID).await.unwrap();
    let saved = manager
        .services()
        .content
        .save("posts", "43", json!({ "title": "Untouched" }))
        .await
        .unwrap();
    assert!(saved.get("slug").is_none());
}

#[tokio::test]
async fn test_before_delete_cancel_vetoes_deletion() {
    let manager = PluginManager::in_memory();
    let guard = bare_plugin("guard").on(
        HookPoint::BeforeContentDelete,
        0,
        |hook: HookContext, _ctx, data: Value| async move {
            if data["locked"] == json!(true) {
                hook.cancel();
            }
            Ok::<Value, BoxError>(data)
        },
    );
    activate_all(&manager, vec![guard]).await;

    let content = &manager.services().content;
    content
        .save("pages", "home", json!({ "title": "Home", "locked": true }))
        .await
        .unwrap();
    content
        .save("pages", "draft", json!({ "title": "Draft" }))
        .await
        .unwrap();

    assert!(!content.delete("pages", "home").await.unwrap());
    assert!(content.find("pages", "home").await.unwrap().is_some());
    assert!(content.delete("pages", "draft").await.unwrap());
    assert!(content.find("pages", "draft").await.unwrap().is_none());
}
