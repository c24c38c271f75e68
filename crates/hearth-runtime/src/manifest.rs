//! Plugin manifests: the file-backed [`ModuleLoader`].
//!
//! Each plugin unit in the plugin directory is a small manifest named after
//! the plugin. The file stem selects the compiled-in implementation from the
//! [`PLUGIN_CATALOG`](hearth_framework::PLUGIN_CATALOG); the file body holds
//! its settings:
//!
//! ```toml
//! # plugins/weather.toml
//! enabled = true
//!
//! [config]
//! api_key = "..."
//! units = "metric"
//! ```
//!
//! Manifests are re-read on every import, so editing one and reloading the
//! plugin applies the new settings.

use std::path::Path;

use async_trait::async_trait;
use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Format, Json};
use hearth_core::BoxError;
use hearth_framework::{ModuleLoader, PluginModule, PluginSource, find_in_catalog};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Manifest extensions understood with the current feature set.
pub fn supported_extensions() -> &'static [&'static str] {
    &[
        #[cfg(feature = "toml-config")]
        "toml",
        #[cfg(feature = "yaml-config")]
        "yaml",
        #[cfg(feature = "yaml-config")]
        "yml",
        "json",
    ]
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default = "empty_config")]
    config: Value,
}

fn enabled_by_default() -> bool {
    true
}

fn empty_config() -> Value {
    Value::Object(Default::default())
}

/// Loads plugin units from manifest files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

impl ManifestLoader {
    pub fn new() -> Self {
        Self
    }

    fn parse(path: &Path, text: &str) -> Result<Manifest, BoxError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let figment = match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Figment::from(Toml::string(text)),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Figment::from(Yaml::string(text)),
            "json" => Figment::from(Json::string(text)),
            _ => return Err(format!("unsupported manifest format: .{ext}").into()),
        };
        Ok(figment.extract()?)
    }
}

#[async_trait]
impl ModuleLoader for ManifestLoader {
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| supported_extensions().contains(&ext))
    }

    async fn import(&self, source: &PluginSource) -> Result<PluginModule, BoxError> {
        let text = tokio::fs::read_to_string(&source.path).await?;
        let manifest = Self::parse(&source.path, &text)?;
        debug!(
            plugin = %source.name,
            path = %source.path.display(),
            enabled = manifest.enabled,
            "Read plugin manifest"
        );

        let module = match find_in_catalog(&source.name) {
            Some(descriptor) => PluginModule::new(*descriptor, manifest.config),
            None => PluginModule::without_descriptor(manifest.config),
        };
        Ok(if manifest.enabled {
            module
        } else {
            module.disable("disabled in manifest")
        })
    }
}
