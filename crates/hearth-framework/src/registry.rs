//! The authoritative table of live plugin instances.
//!
//! [`PluginRegistry`] discovers plugin source units through a
//! [`ModuleLoader`], constructs them and keeps one [`PluginInstance`] per
//! name in registration order. It is the only component that adds, replaces
//! or removes instances.
//!
//! # Load states
//!
//! ```text
//! load_all() ──► Loaded                 (constructed, in the table)
//!            ──► Disabled(reason)       (constructor opted out)
//!            ──► Failed(reason)         (import / descriptor / constructor error)
//!
//! a later load_all() retries Disabled and Failed units and skips Loaded ones
//! ```

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use hearth_core::{InitError, PluginError, PluginResult, Services};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::context::{HostHandle, PluginContext};
use crate::loader::{ModuleLoader, PluginSource};
use crate::plugin::{PluginInstance, panic_message};

// =============================================================================
// Load state and report
// =============================================================================

/// Outcome of the most recent load attempt for a plugin name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginState {
    /// Constructed and participating in dispatch.
    Loaded,
    /// The constructor opted out; not an error.
    Disabled(String),
    /// Loading failed; the plugin is excluded from dispatch.
    Failed(String),
}

impl PluginState {
    /// Returns `true` for [`PluginState::Loaded`].
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => f.write_str("loaded"),
            Self::Disabled(reason) => write!(f, "disabled ({reason})"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Summary of one [`PluginRegistry::load_all`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Newly loaded plugins, in registration order.
    pub loaded: Vec<String>,
    /// Plugins that were already loaded and left untouched.
    pub skipped: Vec<String>,
    /// Plugins that opted out, with their reasons.
    pub disabled: Vec<(String, String)>,
    /// Plugins that failed to load, with the error.
    pub failed: Vec<(String, String)>,
}

impl LoadReport {
    /// Returns `true` if at least one plugin was newly loaded.
    pub fn has_new(&self) -> bool {
        !self.loaded.is_empty()
    }
}

// =============================================================================
// PluginRegistry
// =============================================================================

/// Owns every live plugin instance.
pub struct PluginRegistry {
    dir: PathBuf,
    loader: Arc<dyn ModuleLoader>,
    services: Services,
    host: HostHandle,
    instances: RwLock<Vec<Arc<PluginInstance>>>,
    states: RwLock<BTreeMap<String, PluginState>>,
    generation: AtomicU64,
    load_lock: tokio::sync::Mutex<()>,
}

impl PluginRegistry {
    /// Creates an empty registry over `dir`.
    pub fn new(
        dir: impl Into<PathBuf>,
        loader: Arc<dyn ModuleLoader>,
        services: Services,
        host: HostHandle,
    ) -> Self {
        Self {
            dir: dir.into(),
            loader,
            services,
            host,
            instances: RwLock::new(Vec::new()),
            states: RwLock::new(BTreeMap::new()),
            generation: AtomicU64::new(0),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The plugin directory.
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Discovers and loads every unit in the plugin directory.
    ///
    /// Already-loaded plugins are skipped, so calling this again only picks
    /// up new units and retries previously disabled or failed ones. One
    /// failing plugin never prevents the others from loading.
    pub async fn load_all(&self) -> LoadReport {
        let _guard = self.load_lock.lock().await;
        let mut report = LoadReport::default();

        let sources = match self.loader.discover(&self.dir).await {
            Ok(sources) => sources,
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "Failed to scan plugin directory");
                return report;
            }
        };
        debug!(count = sources.len(), dir = %self.dir.display(), "Discovered plugin units");

        for source in sources {
            if self.contains(&source.name) {
                report.skipped.push(source.name);
                continue;
            }

            match self.build(&source).await {
                Ok(instance) => {
                    info!(
                        plugin = instance.name(),
                        version = instance.version(),
                        handlers = instance.handlers().len(),
                        "Plugin loaded"
                    );
                    self.instances.write().push(Arc::new(instance));
                    self.set_state(&source.name, PluginState::Loaded);
                    report.loaded.push(source.name);
                }
                Err(PluginError::ExplicitDisable { reason, .. }) => {
                    warn!(plugin = %source.name, reason = %reason, "Plugin disabled itself");
                    self.set_state(&source.name, PluginState::Disabled(reason.clone()));
                    report.disabled.push((source.name, reason));
                }
                Err(e) => {
                    error!(plugin = %source.name, error = %e, "Failed to load plugin");
                    self.set_state(&source.name, PluginState::Failed(e.to_string()));
                    report.failed.push((source.name, e.to_string()));
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            disabled = report.disabled.len(),
            failed = report.failed.len(),
            "Plugin load pass complete"
        );
        report
    }

    /// Imports `source` and constructs a fresh instance from it.
    ///
    /// Does not touch the table.
    pub(crate) async fn build(&self, source: &PluginSource) -> PluginResult<PluginInstance> {
        let module = self
            .loader
            .import(source)
            .await
            .map_err(|e| PluginError::import(&source.name, e))?;

        if let Some(reason) = module.disabled {
            return Err(PluginError::ExplicitDisable {
                name: source.name.clone(),
                reason,
            });
        }

        let descriptor = module
            .descriptor
            .ok_or_else(|| PluginError::MissingDescriptor {
                name: source.name.clone(),
            })?;
        descriptor
            .validate(&source.name)
            .map_err(|reason| PluginError::instantiation(&source.name, format!("invalid descriptor: {reason}")))?;

        let config = Arc::new(module.config);
        let ctx = PluginContext::new(
            &source.name,
            Arc::clone(&config),
            self.services.clone(),
            self.host.clone(),
        );

        let parts = match AssertUnwindSafe(descriptor.instantiate(ctx)).catch_unwind().await {
            Ok(Ok(parts)) => parts,
            Ok(Err(InitError::Disable(reason))) => {
                return Err(PluginError::ExplicitDisable {
                    name: source.name.clone(),
                    reason,
                });
            }
            Ok(Err(InitError::Failed(e))) => return Err(PluginError::instantiation(&source.name, e)),
            Err(payload) => {
                return Err(PluginError::instantiation(
                    &source.name,
                    format!("constructor panicked: {}", panic_message(&payload)),
                ));
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        PluginInstance::assemble(descriptor, source.clone(), config, parts, generation)
    }

    /// Returns `true` if a plugin named `name` is loaded.
    pub fn contains(&self, name: &str) -> bool {
        self.instances.read().iter().any(|i| i.name() == name)
    }

    /// Looks up a loaded plugin.
    pub fn get(&self, name: &str) -> PluginResult<Arc<PluginInstance>> {
        self.instances
            .read()
            .iter()
            .find(|i| i.name() == name)
            .cloned()
            .ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    /// Snapshot of all loaded instances in registration order.
    pub fn instances(&self) -> Vec<Arc<PluginInstance>> {
        self.instances.read().clone()
    }

    /// Names of all loaded plugins in registration order.
    pub fn names(&self) -> Vec<String> {
        self.instances.read().iter().map(|i| i.name().to_string()).collect()
    }

    /// Number of loaded plugins.
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Returns `true` if no plugin is loaded.
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// State of the most recent load attempt for `name`.
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.states.read().get(name).cloned()
    }

    /// States of every unit seen so far, sorted by name.
    pub fn states(&self) -> Vec<(String, PluginState)> {
        self.states
            .read()
            .iter()
            .map(|(name, state)| (name.clone(), state.clone()))
            .collect()
    }

    /// Swaps in `instance` for the loaded plugin of the same name, keeping
    /// its registration slot. Returns the previous instance.
    pub(crate) fn replace(&self, instance: Arc<PluginInstance>) -> PluginResult<Arc<PluginInstance>> {
        let mut instances = self.instances.write();
        let slot = instances
            .iter_mut()
            .find(|i| i.name() == instance.name())
            .ok_or_else(|| PluginError::NotFound(instance.name().to_string()))?;
        Ok(std::mem::replace(slot, instance))
    }

    /// Removes a loaded plugin from the table.
    pub(crate) fn remove(&self, name: &str) -> Option<Arc<PluginInstance>> {
        let mut instances = self.instances.write();
        let index = instances.iter().position(|i| i.name() == name)?;
        self.states.write().remove(name);
        Some(instances.remove(index))
    }

    fn set_state(&self, name: &str, state: PluginState) {
        self.states.write().insert(name.to_string(), state);
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("dir", &self.dir)
            .field("plugins", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{PluginModule, StaticLoader};
    use crate::testing::{
        DISABLED, EXPLODING, FAILING, PROBE_EVENTS, Probe, probe_descriptor, probe_named,
    };
    use serde_json::{Value, json};

    fn registry(loader: Arc<StaticLoader>) -> PluginRegistry {
        PluginRegistry::new("plugins", loader, Services::in_memory(), HostHandle::detached())
    }

    async fn build(registry: &PluginRegistry, name: &str) -> PluginResult<PluginInstance> {
        registry.build(&PluginSource::new(name, name)).await
    }

    #[tokio::test]
    async fn test_load_all_isolates_failures() {
        let loader = Arc::new(
            StaticLoader::new()
                .with(probe_named("alpha"), Value::Null)
                .with(DISABLED, Value::Null)
                .with(FAILING, Value::Null)
                .with(EXPLODING, Value::Null)
                .with(probe_named("omega"), Value::Null),
        );
        loader.set_module("bare", PluginModule::without_descriptor(Value::Null));
        loader.set_broken("broken", "unexpected token");

        let registry = registry(Arc::clone(&loader));
        let report = registry.load_all().await;

        assert_eq!(report.loaded, ["alpha", "omega"]);
        assert_eq!(report.disabled.len(), 1);
        assert_eq!(report.failed.len(), 4);
        assert_eq!(registry.names(), ["alpha", "omega"]);

        assert_eq!(registry.state("alpha"), Some(PluginState::Loaded));
        assert!(matches!(registry.state("disabled"), Some(PluginState::Disabled(r)) if r == "no api key"));
        for name in ["failing", "exploding", "bare", "broken"] {
            assert!(
                matches!(registry.state(name), Some(PluginState::Failed(_))),
                "{name} should have failed"
            );
        }
    }

    #[tokio::test]
    async fn test_failure_kinds() {
        let loader = Arc::new(StaticLoader::new());
        loader.set_module("bare", PluginModule::without_descriptor(Value::Null));
        loader.set_broken("broken", "unexpected token");
        loader.set_module("mismatch", PluginModule::new(probe_descriptor(), Value::Null));
        let registry = registry(Arc::clone(&loader));

        assert!(matches!(build(&registry, "bare").await, Err(PluginError::MissingDescriptor { .. })));
        assert!(matches!(build(&registry, "broken").await, Err(PluginError::ImportFailure { .. })));
        assert!(matches!(
            build(&registry, "mismatch").await,
            Err(PluginError::InstantiationFailure { reason, .. }) if reason.starts_with("invalid descriptor")
        ));
        assert!(matches!(build(&registry, "nothing").await, Err(PluginError::ImportFailure { .. })));

        loader.set_module("off", PluginModule::new(probe_named("off"), Value::Null).disable("switched off"));
        assert!(matches!(
            build(&registry, "off").await,
            Err(PluginError::ExplicitDisable { reason, .. }) if reason == "switched off"
        ));

        loader.set_module("exploding", PluginModule::new(EXPLODING, Value::Null));
        let err = build(&registry, "exploding").await.unwrap_err();
        assert!(err.to_string().contains("constructor panicked"));
    }

    #[tokio::test]
    async fn test_load_all_is_idempotent_and_retries() {
        let loader = Arc::new(StaticLoader::new().with(probe_named("alpha"), Value::Null));
        loader.set_broken("beta", "not yet");
        let registry = registry(Arc::clone(&loader));

        registry.load_all().await;
        let first = registry.get("alpha").unwrap();

        loader.set_module("beta", PluginModule::new(probe_named("beta"), Value::Null));
        let report = registry.load_all().await;
        assert_eq!(report.skipped, ["alpha"]);
        assert_eq!(report.loaded, ["beta"]);
        assert!(Arc::ptr_eq(&first, &registry.get("alpha").unwrap()));
        assert_eq!(registry.names(), ["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_instance_receives_config() {
        let loader = Arc::new(StaticLoader::new().with(probe_descriptor(), json!({"greeting": "hey"})));
        let registry = registry(loader);
        registry.load_all().await;

        let probe = registry.get("probe").unwrap().downcast::<Probe>().unwrap();
        assert_eq!(probe.greeting, "hey");
        assert!(matches!(registry.get("ghost"), Err(PluginError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_replace_keeps_slot_and_remove() {
        let loader = Arc::new(
            StaticLoader::new()
                .with(probe_named("alpha"), Value::Null)
                .with(probe_named("beta"), Value::Null),
        );
        let registry = registry(loader);
        registry.load_all().await;

        let fresh = build(&registry, "alpha").await.unwrap();
        let generation = fresh.generation();
        let old = registry.replace(Arc::new(fresh)).unwrap();
        assert!(old.generation() < generation);
        assert_eq!(registry.names(), ["alpha", "beta"]);
        assert_eq!(registry.get("alpha").unwrap().generation(), generation);

        assert!(registry.remove("alpha").is_some());
        assert!(registry.remove("alpha").is_none());
        assert_eq!(registry.names(), ["beta"]);
        assert_eq!(registry.state("alpha"), None);
        assert_eq!(PROBE_EVENTS.len(), registry.get("beta").unwrap().handlers().len());
    }
}
