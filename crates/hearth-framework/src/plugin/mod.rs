//! Plugin model.
//!
//! A plugin is a type implementing [`Plugin`] plus a static
//! [`PluginDescriptor`] naming it, its version and the events it subscribes
//! to (each with a priority). The descriptor's factory constructs the type and
//! collects its handler bindings into a [`PluginInstance`].
//!
//! # Lifecycle
//!
//! ```text
//! import ─▶ descriptor ─▶ init(ctx) ─▶ register(handlers) ─▶ PluginInstance
//!                              │
//!                              └─ InitError::Disable ─▶ skipped, not an error
//! ```
//!
//! Lifecycle hooks are ordinary handlers for [`EventKind::Shutdown`] and
//! [`EventKind::PluginsLoaded`]: during a reload the host runs them on the
//! old and new instance respectively.
//!
//! [`EventKind::Shutdown`]: hearth_core::EventKind::Shutdown
//! [`EventKind::PluginsLoaded`]: hearth_core::EventKind::PluginsLoaded

mod core;
mod descriptor;
mod handler;
mod instance;
mod macros;

pub use self::core::{Plugin, create_plugin};
pub use descriptor::{
    CreateFn, HEARTH_PLUGIN_API_VERSION, PLUGIN_CATALOG, PluginDescriptor, find_in_catalog,
};
pub use handler::{BoundHandler, BoxedHandler, HandlerMethod, HandlerSet, MethodService};
pub(crate) use handler::panic_message;
pub use instance::{PluginInstance, PluginParts};
