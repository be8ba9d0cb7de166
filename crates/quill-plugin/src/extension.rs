//! Extension points: what a plugin contributes to the host while Active.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::extract::Request;
use axum::response::Response;
use serde::{Deserialize, Serialize};

/// Kind of an extension point, used to index contributions for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionKind {
    /// HTTP routes mounted under a prefix.
    Route,
    /// Request/response middleware.
    Middleware,
    /// Content model definition.
    Model,
    /// Named service object.
    Service,
    /// Admin UI page.
    AdminPage,
    /// Admin menu entry.
    MenuItem,
}

impl ExtensionKind {
    /// All kinds, in display order.
    pub const ALL: [ExtensionKind; 6] = [
        Self::Route,
        Self::Middleware,
        Self::Model,
        Self::Service,
        Self::AdminPage,
        Self::MenuItem,
    ];

    /// Returns the snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Middleware => "middleware",
            Self::Model => "model",
            Self::Service => "service",
            Self::AdminPage => "admin_page",
            Self::MenuItem => "menu_item",
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtensionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown extension kind '{s}'"))
    }
}

/// Middleware contributed by a plugin.
///
/// Active middleware run around every host request in priority order:
/// `before` hooks in ascending order, `after` hooks in reverse.
#[async_trait]
pub trait PluginMiddleware: Send + Sync + fmt::Debug {
    /// Inspects or rewrites the request. Returning a response short-circuits
    /// the request; later middleware and the handler do not run.
    async fn before(&self, _request: &mut Request) -> Option<Response> {
        None
    }

    /// Inspects or rewrites the response.
    async fn after(&self, _response: &mut Response) {}
}

/// Routes mounted under a prefix.
#[derive(Debug, Clone)]
pub struct RouteExtension {
    /// Mount prefix, e.g. `/seo`. Requests have it stripped before dispatch.
    pub prefix: String,
    /// Routes relative to the prefix.
    pub router: Router,
}

/// One field of a model definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    /// Field name.
    pub name: String,
    /// Field type name (`string`, `text`, `integer`, `boolean`, `json`, ...).
    pub field_type: String,
    /// Whether the field is required.
    #[serde(default)]
    pub required: bool,
}

impl ModelField {
    /// Creates an optional field.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            required: false,
        }
    }

    /// Marks the field required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A content model contributed by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Model (collection) name.
    pub name: String,
    /// Fields.
    pub fields: Vec<ModelField>,
}

/// A named service object other plugins and the host may look up.
#[derive(Clone)]
pub struct ServiceExtension {
    /// Lookup name.
    pub name: String,
    /// The service; recovered with a downcast.
    pub instance: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for ServiceExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceExtension")
            .field("name", &self.name)
            .finish()
    }
}

/// An admin page contributed by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPage {
    /// Page path inside the admin UI.
    pub path: String,
    /// Page title.
    pub title: String,
    /// Permission required to view the page.
    pub required_permission: Option<String>,
}

/// An admin menu entry contributed by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Visible label.
    pub label: String,
    /// Target path.
    pub path: String,
    /// Label of the parent entry, if nested.
    pub parent: Option<String>,
    /// Icon name.
    pub icon: Option<String>,
}

/// Payload of one extension point.
#[derive(Debug, Clone)]
pub enum ExtensionPoint {
    /// HTTP routes.
    Route(RouteExtension),
    /// Middleware.
    Middleware(Arc<dyn PluginMiddleware>),
    /// Content model.
    Model(ModelDefinition),
    /// Named service.
    Service(ServiceExtension),
    /// Admin page.
    AdminPage(AdminPage),
    /// Admin menu item.
    MenuItem(MenuItem),
}

impl ExtensionPoint {
    /// The kind of this extension point.
    pub fn kind(&self) -> ExtensionKind {
        match self {
            Self::Route(_) => ExtensionKind::Route,
            Self::Middleware(_) => ExtensionKind::Middleware,
            Self::Model(_) => ExtensionKind::Model,
            Self::Service(_) => ExtensionKind::Service,
            Self::AdminPage(_) => ExtensionKind::AdminPage,
            Self::MenuItem(_) => ExtensionKind::MenuItem,
        }
    }

    /// The route prefix, for route contributions.
    pub fn route_prefix(&self) -> Option<&str> {
        match self {
            Self::Route(route) => Some(&route.prefix),
            _ => None,
        }
    }

    /// A serializable description of the payload.
    pub fn describe(&self) -> serde_json::Value {
        match self {
            Self::Route(route) => serde_json::json!({ "prefix": route.prefix }),
            Self::Middleware(mw) => serde_json::json!({ "middleware": format!("{mw:?}") }),
            Self::Model(model) => serde_json::to_value(model).unwrap_or_default(),
            Self::Service(service) => serde_json::json!({ "name": service.name }),
            Self::AdminPage(page) => serde_json::to_value(page).unwrap_or_default(),
            Self::MenuItem(item) => serde_json::to_value(item).unwrap_or_default(),
        }
    }
}

/// A contribution as declared on a descriptor.
#[derive(Debug, Clone)]
pub struct Contribution {
    /// Mount/render priority (lower = earlier).
    pub priority: i32,
    /// The payload.
    pub point: ExtensionPoint,
}

/// A live extension point owned by an Active plugin.
#[derive(Debug, Clone)]
pub struct ExtensionPointRecord {
    /// Owning plugin id.
    pub owner: String,
    /// Mount/render priority (lower = earlier).
    pub priority: i32,
    /// Registry-wide insertion sequence (tie-break for equal priorities).
    pub sequence: u64,
    /// The payload.
    pub point: ExtensionPoint,
}

impl ExtensionPointRecord {
    /// The kind of this record.
    pub fn kind(&self) -> ExtensionKind {
        self.point.kind()
    }
}

/// Serializable view of an extension point record.
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionSummary {
    /// Kind.
    pub kind: ExtensionKind,
    /// Owning plugin id.
    pub owner: String,
    /// Priority.
    pub priority: i32,
    /// Payload description.
    pub detail: serde_json::Value,
}

impl From<&ExtensionPointRecord> for ExtensionSummary {
    fn from(record: &ExtensionPointRecord) -> Self {
        Self {
            kind: record.kind(),
            owner: record.owner.clone(),
            priority: record.priority,
            detail: record.point.describe(),
        }
    }
}
