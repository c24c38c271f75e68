//! # Hearth Framework
//!
//! The plugin engine of the Hearth host.
//!
//! This layer provides:
//! - The plugin model: [`Plugin`], [`PluginDescriptor`], handler binding and
//!   the compiled-in plugin catalog ([`define_plugin!`])
//! - [`PluginRegistry`]: discovery, construction and the instance table
//! - [`EventRouter`]: per-event handler tables ordered by priority
//! - [`Dispatcher`]: sequential dispatch with the control-command protocol
//! - [`ReloadManager`]: atomic hot reload of single plugins
//! - [`Host`]: the object tying all of the above together
//!
//! ```text
//!             ┌──────────── Host ─────────────┐
//!  loader ──▶ │ PluginRegistry ──▶ EventRouter│
//!             │        ▲                ▼     │
//!             │ ReloadManager     Dispatcher  │ ◀── dispatch_event(name, args, kwargs)
//!             └───────────────────────────────┘
//! ```

pub mod context;
pub mod dispatcher;
pub mod host;
pub mod loader;
pub mod plugin;
pub mod registry;
pub mod reload;
pub mod router;

#[cfg(test)]
mod testing;

pub use context::{HostHandle, PluginContext};
pub use dispatcher::{DispatchOutcome, Dispatcher, HANDLER_ERRORS_METRIC, ShutdownSignal};
pub use host::{DEFAULT_PLUGIN_DIR, Host, HostBuilder};
pub use loader::{ModuleLoader, PluginModule, PluginSource, StaticLoader};
pub use plugin::{
    BoundHandler, HandlerSet, PLUGIN_CATALOG, Plugin, PluginDescriptor, PluginInstance,
    find_in_catalog,
};
pub use registry::{LoadReport, PluginRegistry, PluginState};
pub use reload::ReloadManager;
pub use router::{EventRouter, EventTable};

#[doc(hidden)]
pub use hearth_core as __core;
#[doc(hidden)]
pub use linkme as __linkme;
