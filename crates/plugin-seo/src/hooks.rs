//! Hook handlers for the SEO plugin.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use quill_plugin::prelude::*;

use crate::service::SlugService;

/// `content.before_save`: derives `slug` from `title` when missing, and
/// defaults `meta_description` from the plugin's `default_description` setting.
#[derive(Debug)]
pub struct FillSlugHook {
    slugs: Arc<SlugService>,
}

impl FillSlugHook {
    /// Create a new hook handler using `slugs`.
    pub fn new(slugs: Arc<SlugService>) -> Self {
        Self { slugs }
    }
}

#[async_trait]
impl PluginHookHandler for FillSlugHook {
    async fn handle(
        &self,
        _ctx: &HookContext,
        plugin: &PluginContext,
        mut data: Value,
    ) -> Result<Value, BoxError> {
        let Some(entry) = data.as_object_mut() else {
            return Ok(data);
        };

        let has_slug = entry
            .get("slug")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());

        if !has_slug {
            if let Some(title) = entry.get("title").and_then(Value::as_str) {
                let slug = self.slugs.slugify(title);
                plugin.logger.debug(&format!("Derived slug '{slug}'"));
                entry.insert("slug".to_string(), Value::String(slug));
            }
        }

        if !entry.contains_key("meta_description") {
            if let Some(default) = plugin.setting("default_description") {
                entry.insert("meta_description".to_string(), default.clone());
            }
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(config: Value) -> PluginContext {
        let hooks = quill_plugin::HookSystem::new();
        PluginContext::new(
            "seo",
            config,
            quill_plugin::PluginServices::in_memory(hooks),
        )
    }

    #[tokio::test]
    async fn test_fills_missing_slug_and_description() {
        let hook = FillSlugHook::new(Arc::new(SlugService::default()));
        let ctx = HookContext::new(HookPoint::BeforeContentSave);
        let plugin = context(json!({ "default_description": "A Quill site" }));

        let out = hook
            .handle(&ctx, &plugin, json!({ "title": "Hello World" }))
            .await
            .unwrap();
        assert_eq!(out["slug"], "hello-world");
        assert_eq!(out["meta_description"], "A Quill site");
    }

    #[tokio::test]
    async fn test_keeps_existing_slug() {
        let hook = FillSlugHook::new(Arc::new(SlugService::default()));
        let ctx = HookContext::new(HookPoint::BeforeContentSave);
        let plugin = context(json!({}));

        let out = hook
            .handle(&ctx, &plugin, json!({ "title": "Hello", "slug": "custom" }))
            .await
            .unwrap();
        assert_eq!(out["slug"], "custom");
        assert!(out.get("meta_description").is_none());
    }
}
