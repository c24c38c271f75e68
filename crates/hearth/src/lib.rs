//! # Hearth
//!
//! A plugin host and event dispatch engine for chat bots.
//!
//! ## Overview
//!
//! Plugins are compiled into the binary and registered with
//! [`define_plugin!`]. A manifest file per plugin in the plugin directory
//! switches it on and carries its settings. The host loads every manifest,
//! builds a priority-ordered handler table per event, and runs each inbound
//! event through its handler chain.
//!
//! ```text
//! ┌───────────┐  inbound   ┌────────────┐  lookup  ┌──────────────┐
//! │ Transport │──────────▶│ Dispatcher │────────▶│ Event Router │
//! └───────────┘            └────────────┘          └──────────────┘
//!                               │ handler chain (priority order)
//!                               ▼
//!                 guard ──▶ echo ──▶ admin ──▶ ...
//!                   Return / AddVar / Shutdown steer the chain
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hearth::prelude::*;
//!
//! struct Echo {
//!     services: Services,
//! }
//!
//! impl Echo {
//!     async fn on_message(self: Arc<Self>, inv: Invocation) -> HandlerResult {
//!         let channel = inv.kwarg_str("channel").unwrap_or("general");
//!         self.services.session.send(channel, inv.arg_str(0).unwrap_or("")).await?;
//!         Ok(Reply::none())
//!     }
//! }
//!
//! #[async_trait]
//! impl Plugin for Echo {
//!     async fn init(ctx: PluginContext) -> Result<Self, InitError> {
//!         Ok(Self { services: ctx.services().clone() })
//!     }
//!
//!     fn register(handlers: &mut HandlerSet<Self>) {
//!         handlers.on(EventKind::MessageReceived, Self::on_message);
//!     }
//! }
//!
//! define_plugin! {
//!     name: "echo",
//!     plugin: Echo,
//!     events: { MessageReceived => 0 },
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // plugins/echo.toml must exist for the plugin to load
//!     HearthRuntime::builder().build()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML config and manifests
//! - `yaml-config`: YAML config and manifests
//! - `json-log`: JSON log output

pub use hearth_core as core;
pub use hearth_framework as framework;
pub use hearth_runtime as runtime;

pub use hearth_framework::{define_plugin, plugin_descriptor};

/// Commonly used types for writing plugins and hosts.
///
/// ```rust,ignore
/// use hearth::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    pub use async_trait::async_trait;

    // Runtime - main entry point
    pub use hearth_runtime::{HearthRuntime, RuntimeBuilder};

    // Plugin model
    pub use hearth_framework::{
        HandlerSet, Host, HostHandle, Plugin, PluginContext, PluginDescriptor, define_plugin,
    };

    // Events, control protocol, errors and services
    pub use hearth_core::prelude::*;
}
