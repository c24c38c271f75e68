//! Runtime replacement and removal of single plugins.
//!
//! A reload re-imports the plugin's source unit, builds a fresh instance and
//! swaps it in. The old instance keeps serving until the swap: if anything
//! before it fails, the registry is left exactly as it was.
//!
//! ```text
//! reload(name)
//!   1. lock(name)                      one reload per plugin at a time
//!   2. old.shutdown hooks              best-effort, failures logged
//!   3. import + construct              failure ─▶ ReloadFailure, old stays
//!   4. swap in registry slot           registration order preserved
//!   5. rebuild event table
//!   6. new.plugins_loaded hooks
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use hearth_core::{EventKind, PluginError, PluginResult};
use parking_lot::Mutex;
use tracing::{error, info};

use crate::plugin::PluginInstance;
use crate::registry::PluginRegistry;
use crate::router::EventRouter;

/// Serialises and performs plugin reloads and unloads.
pub struct ReloadManager {
    registry: Arc<PluginRegistry>,
    router: Arc<EventRouter>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ReloadManager {
    /// Creates a manager over `registry` and `router`.
    pub fn new(registry: Arc<PluginRegistry>, router: Arc<EventRouter>) -> Self {
        Self {
            registry,
            router,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(name.to_string()).or_default())
    }

    /// Drops the lock entry for `name` unless another caller is holding or
    /// waiting on it.
    fn release(&self, name: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        let idle = locks
            .get(name)
            .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(lock) <= 2);
        if idle {
            locks.remove(name);
        }
    }

    /// Replaces the loaded plugin `name` with a freshly imported instance.
    ///
    /// Returns [`PluginError::NotFound`] if `name` is not loaded and
    /// [`PluginError::ReloadFailure`] if the new instance cannot be built; in
    /// both cases the registry is unchanged.
    pub async fn reload(&self, name: &str) -> PluginResult<Arc<PluginInstance>> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        let current = match self.registry.get(name) {
            Ok(current) => current,
            Err(e) => {
                self.release(name, &lock);
                return Err(e);
            }
        };
        info!(
            plugin = name,
            version = current.version(),
            generation = current.generation(),
            "Reloading plugin"
        );

        current.run_lifecycle(EventKind::Shutdown).await;

        let fresh = match self.registry.build(current.source()).await {
            Ok(instance) => Arc::new(instance),
            Err(e) => {
                error!(plugin = name, error = %e, "Reload failed, keeping the running instance");
                return Err(PluginError::reload(name, e));
            }
        };

        self.registry
            .replace(Arc::clone(&fresh))
            .map_err(|e| PluginError::reload(name, e))?;
        self.router.rebuild(&self.registry);

        fresh.run_lifecycle(EventKind::PluginsLoaded).await;
        info!(
            plugin = name,
            version = fresh.version(),
            generation = fresh.generation(),
            "Plugin reloaded"
        );
        Ok(fresh)
    }

    /// Removes the loaded plugin `name` after running its shutdown hooks.
    pub async fn unload(&self, name: &str) -> PluginResult<()> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        let current = match self.registry.get(name) {
            Ok(current) => current,
            Err(e) => {
                self.release(name, &lock);
                return Err(e);
            }
        };
        current.run_lifecycle(EventKind::Shutdown).await;
        self.registry.remove(name);
        self.router.rebuild(&self.registry);
        self.release(name, &lock);
        info!(plugin = name, "Plugin unloaded");
        Ok(())
    }
}

impl std::fmt::Debug for ReloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadManager").finish_non_exhaustive()
    }
}
