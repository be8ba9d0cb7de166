//! Plugin sources: where the loader discovers candidate packages.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::catalog::PluginCatalog;
use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;

/// File name of a package manifest inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Something that can enumerate candidate plugin packages.
#[async_trait]
pub trait PluginSource: Send + Sync + std::fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Enumerates candidate descriptors.
    async fn discover(&self) -> Result<Vec<PluginDescriptor>, PluginError>;
}

/// A fixed set of compiled-in descriptors.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    descriptors: Vec<PluginDescriptor>,
}

impl StaticSource {
    /// Creates a source over `descriptors`.
    pub fn new(descriptors: Vec<PluginDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Creates a source offering every catalog entry.
    pub fn from_catalog(catalog: &PluginCatalog) -> Self {
        Self::new(catalog.descriptors())
    }
}

#[async_trait]
impl PluginSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn discover(&self) -> Result<Vec<PluginDescriptor>, PluginError> {
        Ok(self.descriptors.clone())
    }
}

/// Parsed `plugin.toml` package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginManifest {
    /// Plugin id; selects the catalog entry.
    pub id: String,
    /// Expected version; must equal the compiled-in descriptor's version.
    pub version: String,
    /// Disabled packages are skipped.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    plugin: PluginManifest,
}

/// Parses a package manifest from TOML content.
pub fn parse_manifest(content: &str) -> Result<PluginManifest, PluginError> {
    let file: ManifestFile = toml::from_str(content)
        .map_err(|e| PluginError::Source(format!("invalid plugin manifest: {e}")))?;

    if file.plugin.id.is_empty() {
        return Err(PluginError::Source(
            "plugin manifest: id must not be empty".to_string(),
        ));
    }
    if file.plugin.version.is_empty() {
        return Err(PluginError::Source(
            "plugin manifest: version must not be empty".to_string(),
        ));
    }

    Ok(file.plugin)
}

/// Scans `<root>/*/plugin.toml` and binds each manifest to a catalog entry.
///
/// Packages are skipped with a warning when the manifest is unreadable, has
/// no catalog entry, or names a different version than the compiled code.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    catalog: PluginCatalog,
}

impl DirectorySource {
    /// Creates a source scanning `root`.
    pub fn new(root: impl Into<PathBuf>, catalog: PluginCatalog) -> Self {
        Self {
            root: root.into(),
            catalog,
        }
    }

    /// The scanned directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_manifest(path: &Path) -> Result<PluginManifest, PluginError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PluginError::Source(format!("{}: {e}", path.display())))?;
        parse_manifest(&content)
    }

    fn bind(&self, manifest: &PluginManifest, path: &Path) -> Option<PluginDescriptor> {
        if !manifest.enabled {
            info!(plugin_id = %manifest.id, path = %path.display(), "Plugin package disabled, skipping");
            return None;
        }

        let Some(descriptor) = self.catalog.get(&manifest.id) else {
            warn!(plugin_id = %manifest.id, path = %path.display(), "No compiled-in plugin for package, skipping");
            return None;
        };

        if descriptor.id() != manifest.id || descriptor.version() != manifest.version {
            warn!(
                plugin_id = %manifest.id,
                manifest_version = %manifest.version,
                compiled_version = %descriptor.version(),
                "Plugin package does not match compiled-in plugin, skipping"
            );
            return None;
        }

        Some(descriptor)
    }
}

#[async_trait]
impl PluginSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    async fn discover(&self) -> Result<Vec<PluginDescriptor>, PluginError> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            warn!(path = %self.root.display(), "Plugin directory does not exist");
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| PluginError::Source(format!("{}: {e}", self.root.display())))?;

        let mut manifests = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PluginError::Source(format!("{}: {e}", self.root.display())))?
        {
            let path = entry.path().join(MANIFEST_FILE);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                manifests.push(path);
            }
        }
        manifests.sort();

        let mut descriptors = Vec::new();
        for path in manifests {
            match Self::read_manifest(&path).await {
                Ok(manifest) => {
                    if let Some(d) = self.bind(&manifest, &path) {
                        debug!(plugin_id = %d.id(), path = %path.display(), "Discovered plugin package");
                        descriptors.push(d);
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable plugin manifest, skipping");
                }
            }
        }

        info!(path = %self.root.display(), count = descriptors.len(), "Plugin directory scanned");
        Ok(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PluginBuilder;

    fn catalog() -> PluginCatalog {
        PluginCatalog::new()
            .with("seo", || PluginBuilder::new("seo", "1.0.0").build())
            .with("forms", || PluginBuilder::new("forms", "0.3.0").build())
    }

    fn write(root: &Path, dir: &str, content: &str) {
        let dir = root.join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), content).unwrap();
    }

    #[test]
    fn test_parse_manifest_defaults_enabled() {
        let m = parse_manifest("[plugin]\nid = \"seo\"\nversion = \"1.0.0\"\n").unwrap();
        assert_eq!(
            m,
            PluginManifest {
                id: "seo".into(),
                version: "1.0.0".into(),
                enabled: true
            }
        );
        assert!(parse_manifest("[plugin]\nid = \"\"\nversion = \"1\"").is_err());
        assert!(parse_manifest("not toml at all [").is_err());
    }

    #[tokio::test]
    async fn test_directory_source_binds_and_skips() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "seo", "[plugin]\nid = \"seo\"\nversion = \"1.0.0\"\n");
        write(tmp.path(), "forms", "[plugin]\nid = \"forms\"\nversion = \"9.9.9\"\n");
        write(tmp.path(), "ghost", "[plugin]\nid = \"ghost\"\nversion = \"1.0.0\"\n");
        write(tmp.path(), "off", "[plugin]\nid = \"seo\"\nversion = \"1.0.0\"\nenabled = false\n");
        write(tmp.path(), "junk", "]]]");
        std::fs::create_dir_all(tmp.path().join("empty")).unwrap();

        let source = DirectorySource::new(tmp.path(), catalog());
        let found = source.discover().await.unwrap();
        let ids: Vec<&str> = found.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["seo"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(tmp.path().join("nope"), catalog());
        assert!(source.discover().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_source_from_catalog() {
        let found = StaticSource::from_catalog(&catalog()).discover().await.unwrap();
        let ids: Vec<&str> = found.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["forms", "seo"]);
    }
}
