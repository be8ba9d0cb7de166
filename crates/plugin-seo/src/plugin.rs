//! SEO plugin descriptor.

use std::sync::Arc;

use serde_json::json;

use quill_plugin::prelude::*;

use crate::hooks::FillSlugHook;
use crate::middleware::RobotsHeader;
use crate::routes;
use crate::service::SlugService;

/// Plugin identifier.
pub const PLUGIN_ID: &str = "seo";

/// Plugin version.
pub const PLUGIN_VERSION: &str = "1.0.0";

/// Storage key written on install and removed on uninstall.
const SETTINGS_KEY: &str = "settings";

/// Builds the SEO plugin descriptor.
pub fn descriptor() -> PluginDescriptor {
    let slugs = Arc::new(SlugService::default());

    PluginBuilder::new(PLUGIN_ID, PLUGIN_VERSION)
        .description("Slugs, robots directives, and search metadata for content")
        .author("Quill Team")
        .route("/seo", routes::router(slugs.clone()), 100)
        .middleware(RobotsHeader::new("index, follow"), 100)
        .model(
            ModelDefinition {
                name: "seo_meta".to_string(),
                fields: vec![
                    ModelField::new("entry_id", "string").required(),
                    ModelField::new("title", "string"),
                    ModelField::new("meta_description", "text"),
                    ModelField::new("canonical_url", "string"),
                ],
            },
            100,
        )
        .service("seo.slugs", slugs.clone(), 100)
        .admin_page(
            AdminPage {
                path: "/admin/seo".to_string(),
                title: "SEO".to_string(),
                required_permission: Some("seo.manage".to_string()),
            },
            100,
        )
        .menu_item(
            MenuItem {
                label: "SEO".to_string(),
                path: "/admin/seo".to_string(),
                parent: Some("Settings".to_string()),
                icon: Some("search".to_string()),
            },
            100,
        )
        .hook(HookPoint::BeforeContentSave, 50, FillSlugHook::new(slugs))
        .on_install(|ctx: PluginContext| async move {
            let settings = json!({
                "robots": "index, follow",
                "default_description": ctx.setting("default_description").cloned(),
            });
            ctx.storage.set(SETTINGS_KEY, settings).await?;
            ctx.logger.info("SEO settings initialised");
            Ok(())
        })
        .on_activate(|ctx: PluginContext| async move {
            ctx.logger.info("SEO routes and hooks mounted");
            Ok(())
        })
        .on_deactivate(|ctx: PluginContext| async move {
            ctx.logger.info("SEO routes and hooks unmounted");
            Ok(())
        })
        .on_uninstall(|ctx: PluginContext| async move {
            ctx.storage.delete(SETTINGS_KEY).await?;
            ctx.logger.info("SEO settings removed");
            Ok(())
        })
        .build()
}
