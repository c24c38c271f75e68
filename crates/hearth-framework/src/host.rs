//! The plugin host: one object owning every engine component.
//!
//! [`Host`] ties together the [`PluginRegistry`], [`EventRouter`],
//! [`Dispatcher`] and [`ReloadManager`] and is the only way plugins and the
//! runtime reach them. Plugins hold a weak [`HostHandle`] to it.
//!
//! # Example
//!
//! ```rust,ignore
//! let host = Host::builder(ManifestLoader::new())
//!     .plugin_dir("plugins")
//!     .services(Services::in_memory())
//!     .build();
//!
//! host.load_all().await;
//! host.dispatch_event("message_received", vec![json!("hi")], Kwargs::new()).await;
//! host.reload_plugin("echo").await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use hearth_core::{EventKind, Kwargs, PluginResult, Services};
use serde_json::Value;
use tracing::info;

use crate::context::HostHandle;
use crate::dispatcher::{DispatchOutcome, Dispatcher, ShutdownSignal};
use crate::loader::ModuleLoader;
use crate::plugin::PluginInstance;
use crate::registry::{LoadReport, PluginRegistry, PluginState};
use crate::reload::ReloadManager;
use crate::router::EventRouter;

/// Default plugin directory, relative to the working directory.
pub const DEFAULT_PLUGIN_DIR: &str = "plugins";

// =============================================================================
// Host
// =============================================================================

/// The plugin host.
pub struct Host {
    registry: Arc<PluginRegistry>,
    router: Arc<EventRouter>,
    dispatcher: Dispatcher,
    reloader: ReloadManager,
    services: Services,
}

impl Host {
    /// Starts building a host that imports plugins through `loader`.
    pub fn builder(loader: impl ModuleLoader + 'static) -> HostBuilder {
        HostBuilder::new(Arc::new(loader))
    }

    /// A weak handle to this host.
    pub fn handle(self: &Arc<Self>) -> HostHandle {
        HostHandle::new(Arc::downgrade(self))
    }

    /// Loads every plugin unit not loaded yet and rebuilds the event table.
    ///
    /// Raises `plugins_loaded` if at least one plugin was newly loaded.
    pub async fn load_all(&self) -> LoadReport {
        let report = self.registry.load_all().await;
        self.router.rebuild(&self.registry);
        if report.has_new() {
            self.dispatcher
                .dispatch(EventKind::PluginsLoaded, Vec::new(), Kwargs::new())
                .await;
        }
        report
    }

    /// Looks up a loaded plugin.
    pub fn get_plugin(&self, name: &str) -> PluginResult<Arc<PluginInstance>> {
        self.registry.get(name)
    }

    /// All loaded plugins in registration order.
    pub fn plugins(&self) -> Vec<Arc<PluginInstance>> {
        self.registry.instances()
    }

    /// Load state of every plugin unit seen so far.
    pub fn plugin_states(&self) -> Vec<(String, PluginState)> {
        self.registry.states()
    }

    /// Hot-reloads `name`. See [`ReloadManager::reload`].
    pub async fn reload_plugin(&self, name: &str) -> PluginResult<Arc<PluginInstance>> {
        self.reloader.reload(name).await
    }

    /// Runs `name`'s shutdown hooks and removes it.
    pub async fn unload_plugin(&self, name: &str) -> PluginResult<()> {
        self.reloader.unload(name).await
    }

    /// Raises an event by wire name; unrecognised names are logged and
    /// ignored.
    pub async fn dispatch_event(&self, name: &str, args: Vec<Value>, kwargs: Kwargs) -> DispatchOutcome {
        self.dispatcher.dispatch_named(name, args, kwargs).await
    }

    /// Raises `event`.
    pub async fn dispatch(&self, event: EventKind, args: Vec<Value>, kwargs: Kwargs) -> DispatchOutcome {
        self.dispatcher.dispatch(event, args, kwargs).await
    }

    /// Begins shutdown: raises `shutdown` once and completes the signal.
    ///
    /// Returns `false` if shutdown had already begun.
    pub async fn shutdown(&self) -> bool {
        self.dispatcher.shutdown().await
    }

    /// Signal completed once the host has shut down.
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        self.dispatcher.signal()
    }

    /// The shared service bundle.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The plugin registry.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// The event router.
    pub fn router(&self) -> &EventRouter {
        &self.router
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("registry", &self.registry)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// HostBuilder
// =============================================================================

/// Builder for [`Host`].
pub struct HostBuilder {
    loader: Arc<dyn ModuleLoader>,
    dir: PathBuf,
    services: Option<Services>,
}

impl HostBuilder {
    fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            dir: PathBuf::from(DEFAULT_PLUGIN_DIR),
            services: None,
        }
    }

    /// Sets the plugin directory.
    pub fn plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Sets the service bundle (defaults to [`Services::in_memory`]).
    pub fn services(mut self, services: Services) -> Self {
        self.services = Some(services);
        self
    }

    /// Builds the host. No plugin is loaded until [`Host::load_all`].
    pub fn build(self) -> Arc<Host> {
        let services = self.services.unwrap_or_default();
        let signal = ShutdownSignal::new();
        info!(dir = %self.dir.display(), "Creating plugin host");

        Arc::new_cyclic(|weak| {
            let registry = Arc::new(PluginRegistry::new(
                self.dir,
                self.loader,
                services.clone(),
                HostHandle::new(weak.clone()),
            ));
            let router = Arc::new(EventRouter::new());
            let dispatcher = Dispatcher::new(
                Arc::clone(&router),
                Arc::clone(&services.metrics),
                signal,
            );
            let reloader = ReloadManager::new(Arc::clone(&registry), Arc::clone(&router));
            Host {
                registry,
                router,
                dispatcher,
                reloader,
                services,
            }
        })
    }
}
