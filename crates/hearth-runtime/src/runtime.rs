//! Process-level orchestration of a [`Host`].
//!
//! ```rust,ignore
//! use hearth_runtime::HearthRuntime;
//!
//! let runtime = HearthRuntime::builder()
//!     .config_file("hearth.toml")
//!     .build()?;
//!
//! // Feed platform events in from the transport:
//! runtime.inbound("message_received", vec![json!("hello")], Kwargs::new());
//!
//! // Load plugins, raise `ready`, run until Ctrl+C or a `Shutdown` command.
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use hearth_core::{CatalogTranslator, EventKind, Kwargs, Services};
use hearth_framework::{DispatchOutcome, Host, HostHandle, LoadReport};
use serde_json::Value;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{ConfigLoader, HearthConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::manifest::ManifestLoader;

/// A configured plugin host plus its process lifecycle.
pub struct HearthRuntime {
    config: HearthConfig,
    host: Arc<Host>,
}

impl HearthRuntime {
    /// Creates a runtime from the configuration found in the default
    /// locations, falling back to defaults if none can be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new().load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config ({e}), using defaults");
            HearthConfig::default()
        });
        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime with in-memory services.
    pub fn from_config(config: &HearthConfig) -> Self {
        Self::with_services(config, Services::in_memory())
    }

    /// Creates a runtime around caller-supplied services.
    ///
    /// Initialises logging and replaces the translator with one built from
    /// the `[i18n]` section.
    pub fn with_services(config: &HearthConfig, services: Services) -> Self {
        logging::init_from_config(&config.logging);

        let translator = CatalogTranslator::new(
            config.i18n.default_locale.clone(),
            config.i18n.catalog.clone(),
        );
        let services = services.with_translator(Arc::new(translator));

        let host = Host::builder(ManifestLoader::new())
            .plugin_dir(&config.plugins.dir)
            .services(services)
            .build();

        info!(
            log_level = %config.logging.level,
            plugin_dir = %config.plugins.dir.display(),
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            host,
        }
    }

    pub fn config(&self) -> &HearthConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    /// Weak handle for transports and other long-lived tasks.
    pub fn handle(&self) -> HostHandle {
        self.host.handle()
    }

    /// Loads every plugin in the plugin directory and raises `ready`.
    ///
    /// `plugins_loaded` is raised by the load itself when something new
    /// came up.
    pub async fn start(&self) -> LoadReport {
        let report = self.host.load_all().await;
        info!(
            loaded = report.loaded.len(),
            disabled = report.disabled.len(),
            failed = report.failed.len(),
            "Plugins loaded"
        );
        self.host.dispatch(EventKind::Ready, Vec::new(), Kwargs::new()).await;
        report
    }

    /// Raises an inbound platform event on its own task.
    ///
    /// Each call is an independent dispatch; chains for different calls may
    /// interleave.
    pub fn inbound(
        &self,
        event: impl Into<String>,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> JoinHandle<DispatchOutcome> {
        let host = Arc::clone(&self.host);
        let event = event.into();
        tokio::spawn(async move { host.dispatch_event(&event, args, kwargs).await })
    }

    /// Starts, then runs until Ctrl+C, SIGTERM or an in-band shutdown.
    pub async fn run(&self) -> RuntimeResult<()> {
        let signals = ShutdownSignals::install()?;
        self.start().await;
        info!("Hearth is running. Press Ctrl+C to stop.");
        self.serve(signals.recv()).await;
        Ok(())
    }

    /// Starts, then runs until `shutdown` resolves or a handler requests
    /// shutdown.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await;
        self.serve(shutdown).await;
        Ok(())
    }

    async fn serve<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            () = shutdown => {
                debug!("External shutdown requested");
            }
            () = self.host.shutdown_signal().cancelled() => {
                debug!("Shutdown requested by a plugin");
            }
        }
        self.stop().await;
    }

    /// Raises `shutdown` (at most once per host) and drains background tasks.
    pub async fn stop(&self) {
        self.host.shutdown().await;
        // a concurrent shutdown may still be running its handlers
        self.host.shutdown_signal().cancelled().await;
        self.host.services().scheduler.shutdown().await;
        info!("Runtime stopped");
    }
}

impl Default for HearthRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// OS termination signals, registered up front so a registration failure
/// surfaces before any plugin is loaded.
struct ShutdownSignals {
    #[cfg(unix)]
    sigterm: signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> RuntimeResult<Self> {
        Ok(Self {
            #[cfg(unix)]
            sigterm: signal::unix::signal(signal::unix::SignalKind::terminate())
                .map_err(RuntimeError::Signal)?,
        })
    }

    #[cfg(unix)]
    async fn recv(mut self) {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = self.sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    async fn recv(self) {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return std::future::pending().await;
        }
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`HearthRuntime`] with custom configuration sources.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    services: Option<Services>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            services: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: HearthConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Supplies the service bundle (session, store, metrics, ...).
    pub fn services(mut self, services: Services) -> Self {
        self.services = Some(services);
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> RuntimeResult<HearthRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        let services = self.services.unwrap_or_default();
        Ok(HearthRuntime::with_services(&config, services))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
