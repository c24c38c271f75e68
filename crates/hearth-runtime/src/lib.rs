//! Hearth Runtime - process layer for the Hearth plugin host.
//!
//! This crate provides:
//! - Layered configuration (`config`): defaults, files, `HEARTH_*` env vars
//! - Logging setup on `tracing-subscriber` (`logging`)
//! - The manifest-file [`ModuleLoader`](hearth_framework::ModuleLoader) (`manifest`)
//! - [`HearthRuntime`], which wires a [`Host`](hearth_framework::Host) to the
//!   configuration and runs it until shutdown
//!
//! ```ignore
//! use hearth_runtime::HearthRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HearthRuntime::builder().build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, HearthConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use manifest::ManifestLoader;
pub use runtime::{HearthRuntime, RuntimeBuilder};

// Re-export tracing for use by plugin crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for plugin code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
