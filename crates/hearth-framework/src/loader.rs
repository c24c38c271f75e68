//! Discovering and importing plugin source units.
//!
//! The registry never touches files itself; it goes through a
//! [`ModuleLoader`]. A loader answers two questions:
//!
//! 1. Which plugin source units exist in a directory ([`ModuleLoader::discover`]).
//! 2. What a given unit currently contains ([`ModuleLoader::import`]): the
//!    descriptor it exposes and the configuration it carries.
//!
//! `import` is called again on every reload, so a loader must always return
//! the unit's *current* contents.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::BoxError;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;

use crate::plugin::PluginDescriptor;

// ============================================================================
// Source units and modules
// ============================================================================

/// One discovered plugin source unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSource {
    /// Plugin name: the file stem of `path`.
    pub name: String,
    /// Location of the unit.
    pub path: PathBuf,
}

impl PluginSource {
    /// Creates a source entry.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// The result of importing a source unit.
#[derive(Debug, Clone)]
pub struct PluginModule {
    /// The descriptor the unit exposes, if any.
    pub descriptor: Option<PluginDescriptor>,
    /// Plugin configuration carried by the unit.
    pub config: Value,
    /// Set when the unit itself switches the plugin off.
    pub disabled: Option<String>,
}

impl PluginModule {
    /// A module exposing `descriptor` with `config`.
    pub fn new(descriptor: PluginDescriptor, config: Value) -> Self {
        Self {
            descriptor: Some(descriptor),
            config,
            disabled: None,
        }
    }

    /// A module that imported fine but has no descriptor.
    pub fn without_descriptor(config: Value) -> Self {
        Self {
            descriptor: None,
            config,
            disabled: None,
        }
    }

    /// Marks the module as switched off; the registry will not construct it.
    pub fn disable(mut self, reason: impl Into<String>) -> Self {
        self.disabled = Some(reason.into());
        self
    }
}

// ============================================================================
// ModuleLoader
// ============================================================================

/// Finds and imports plugin source units.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Returns `true` if `path` looks like a unit this loader can import.
    fn accepts(&self, path: &Path) -> bool;

    /// Lists the plugin units in `dir`, sorted by file name.
    ///
    /// The scan is not recursive. Files whose name starts with `.` or `_`
    /// are skipped, as are files [`accepts`](Self::accepts) rejects. When two
    /// files share a stem only the first (by file name) is kept.
    async fn discover(&self, dir: &Path) -> std::io::Result<Vec<PluginSource>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.') || stem.starts_with('_') || !self.accepts(&path) {
                continue;
            }
            if !seen.insert(stem.to_string()) {
                warn!(path = %path.display(), "Ignoring plugin unit with a duplicate name");
                continue;
            }
            sources.push(PluginSource::new(stem, path.clone()));
        }
        Ok(sources)
    }

    /// Imports the current contents of `source`.
    async fn import(&self, source: &PluginSource) -> Result<PluginModule, BoxError>;
}

#[async_trait]
impl<L: ModuleLoader + ?Sized> ModuleLoader for Arc<L> {
    fn accepts(&self, path: &Path) -> bool {
        (**self).accepts(path)
    }

    async fn discover(&self, dir: &Path) -> std::io::Result<Vec<PluginSource>> {
        (**self).discover(dir).await
    }

    async fn import(&self, source: &PluginSource) -> Result<PluginModule, BoxError> {
        (**self).import(source).await
    }
}

// ============================================================================
// StaticLoader
// ============================================================================

enum StaticUnit {
    Module(PluginModule),
    Broken(String),
}

/// A [`ModuleLoader`] over an in-memory set of units.
///
/// Useful for embedding the host without a plugin directory. Units can be
/// replaced at runtime, which a subsequent reload picks up the same way it
/// would pick up an edited file.
#[derive(Default)]
pub struct StaticLoader {
    units: RwLock<Vec<(String, StaticUnit)>>,
}

impl StaticLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit exposing `descriptor`, named after it.
    pub fn with(self, descriptor: PluginDescriptor, config: Value) -> Self {
        self.set_module(descriptor.name, PluginModule::new(descriptor, config));
        self
    }

    /// Adds or replaces the unit `name`.
    pub fn set_module(&self, name: &str, module: PluginModule) {
        self.set(name, StaticUnit::Module(module));
    }

    /// Makes the unit `name` fail to import with `reason`.
    pub fn set_broken(&self, name: &str, reason: impl Into<String>) {
        self.set(name, StaticUnit::Broken(reason.into()));
    }

    /// Removes the unit `name`.
    pub fn remove(&self, name: &str) -> bool {
        let mut units = self.units.write();
        let before = units.len();
        units.retain(|(n, _)| n != name);
        units.len() != before
    }

    fn set(&self, name: &str, unit: StaticUnit) {
        let mut units = self.units.write();
        match units.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = unit,
            None => units.push((name.to_string(), unit)),
        }
    }
}

#[async_trait]
impl ModuleLoader for StaticLoader {
    fn accepts(&self, _path: &Path) -> bool {
        true
    }

    /// Lists the units in insertion order; `dir` only prefixes the paths.
    async fn discover(&self, dir: &Path) -> std::io::Result<Vec<PluginSource>> {
        Ok(self
            .units
            .read()
            .iter()
            .map(|(name, _)| PluginSource::new(name.clone(), dir.join(name)))
            .collect())
    }

    async fn import(&self, source: &PluginSource) -> Result<PluginModule, BoxError> {
        match self.units.read().iter().find(|(n, _)| *n == source.name) {
            Some((_, StaticUnit::Module(module))) => Ok(module.clone()),
            Some((_, StaticUnit::Broken(reason))) => Err(reason.clone().into()),
            None => Err(format!("no unit named '{}'", source.name).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::probe_descriptor;
    use serde_json::json;

    struct TomlOnly;

    #[async_trait]
    impl ModuleLoader for TomlOnly {
        fn accepts(&self, path: &Path) -> bool {
            path.extension().is_some_and(|ext| ext == "toml")
        }

        async fn import(&self, _source: &PluginSource) -> Result<PluginModule, BoxError> {
            Err("unused".into())
        }
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["b.toml", "a.toml", "_private.toml", ".hidden.toml", "notes.txt", "a.yaml"] {
            std::fs::write(dir.path().join(file), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.toml")).unwrap();

        let sources = TomlOnly.discover(dir.path()).await.unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(sources[0].path, dir.path().join("a.toml"));
    }

    #[tokio::test]
    async fn test_discover_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TomlOnly.discover(&dir.path().join("absent")).await.is_err());
    }

    #[tokio::test]
    async fn test_static_loader_units_can_change() {
        let loader = StaticLoader::new().with(probe_descriptor(), json!({"n": 1}));
        let source = &loader.discover(Path::new("plugins")).await.unwrap()[0];
        assert_eq!(source.name, "probe");

        let module = loader.import(source).await.unwrap();
        assert_eq!(module.config, json!({"n": 1}));

        loader.set_broken("probe", "syntax error");
        let err = loader.import(source).await.unwrap_err();
        assert_eq!(err.to_string(), "syntax error");

        assert!(loader.remove("probe"));
        assert!(loader.import(source).await.is_err());
    }
}
