//! # Hearth Core
//!
//! Fundamental building blocks shared by every layer of the Hearth plugin
//! host.
//!
//! ## Contents
//!
//! - **Events**: the closed set of recognised event kinds ([`EventKind`]) and
//!   the per-handler call payload ([`Invocation`]).
//! - **Control protocol**: the commands a handler may hand back to the
//!   dispatcher ([`ControlCommand`], [`Reply`]).
//! - **Errors**: the plugin error taxonomy ([`PluginError`]), the constructor
//!   signal ([`InitError`]) and service errors.
//! - **Services**: the collaborator interfaces injected into every plugin
//!   (session, store, metrics, translations, scheduler) together with
//!   in-memory defaults.
//!
//! ```text
//! ┌───────────┐   Invocation   ┌─────────┐   Reply    ┌────────────┐
//! │ Dispatcher│───────────────▶│ Handler │───────────▶│ Dispatcher │
//! └───────────┘                └─────────┘ (commands) └────────────┘
//! ```

pub mod command;
pub mod error;
pub mod event;
pub mod report;
pub mod services;

pub use command::{ControlCommand, HandlerResult, Reply};
pub use error::{BoxError, InitError, PluginError, PluginResult, ServiceError, ServiceResult};
pub use event::{EventKind, Invocation, Kwargs, UnknownEvent};
pub use report::ErrorReport;
pub use services::{
    CatalogTranslator, CounterMetrics, MemoryStore, Metrics, NullSession, Scheduler, Services,
    Session, Store, StoreExt, Translator,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::command::{ControlCommand, HandlerResult, Reply};
    pub use super::error::{BoxError, InitError, PluginError};
    pub use super::event::{EventKind, Invocation, Kwargs};
    pub use super::report::ErrorReport;
    pub use super::services::{Metrics, Services, Session, Store, StoreExt, Translator};
}
